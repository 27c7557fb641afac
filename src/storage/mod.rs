// src/storage/mod.rs
pub mod documents;
pub mod sql;

use std::fs;
use std::path::Path;

use crate::records::RecordSet;
use crate::utils::error::StorageError;

pub use documents::DocumentStore;
pub use sql::{QueryOutput, SqlDatabase};

/// Writes `records` as UTF-8 CSV with a header row, replacing any existing file.
/// Parent directories are created when missing.
pub fn write_csv<P: AsRef<Path>>(path: P, records: &RecordSet) -> Result<(), StorageError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(StorageError::IoError)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&records.columns)?;
    for record in &records.records {
        writer.write_record(
            records
                .columns
                .iter()
                .map(|column| record.get(column).map(|v| v.to_string()).unwrap_or_default()),
        )?;
    }
    writer.flush().map_err(StorageError::IoError)?;

    tracing::info!("Saved {} records to {}", records.len(), path.display());
    Ok(())
}
