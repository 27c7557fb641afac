// src/extractors/mod.rs
pub mod document;
pub mod files;
pub mod linked_rows;
pub mod table;

// Re-export key extraction types for convenience
pub use document::Document;
pub use linked_rows::{extract_linked_rows, LinkedRowOptions};
pub use table::{
    extract_table,
    market_cap_column,
    normalize_numeric_column,
    project,
    MC_USD_BILLION,
};
