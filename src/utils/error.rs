// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Could not read source file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Error, Debug, PartialEq)]
pub enum ExtractError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Malformed table: {0}")]
    MalformedTable(String),

    #[error("More than one column matches: {}", .0.join(", "))]
    AmbiguousColumn(Vec<String>),

    #[error("Invalid numeric value {value:?} in column '{column}' (row {row})")]
    InvalidNumericValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON on line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },

    #[error("Invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Unsupported record shape: {0}")]
    Shape(String),

    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),
}

#[derive(Error, Debug, PartialEq)]
pub enum TransformError {
    #[error("No exchange rate for currency {0}")]
    MissingRate(String),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Value {value:?} in column '{column}' (row {row}) is not numeric")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV writer error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Document {id} not found in collection {collection}")]
    DocumentNotFound { collection: String, id: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Fetching source failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Reading source failed: {0}")]
    Source(#[from] SourceError),

    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
