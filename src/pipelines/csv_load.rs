// src/pipelines/csv_load.rs
//! Loading a local CSV file into SQLite or into a document collection.

use std::path::{Path, PathBuf};

use crate::config::{JobConfig, Source};
use crate::extractors::files::read_csv;
use crate::extractors::project;
use crate::records::RecordSet;
use crate::storage::{DocumentStore, QueryOutput, SqlDatabase};
use crate::transform::infer_numeric_columns;
use crate::utils::error::StorageError;
use crate::utils::AppError;

#[derive(Debug, Clone, Default)]
pub struct CsvLoadOptions {
    /// Column names for a headerless file. `None` reads the header row.
    pub headers: Option<Vec<String>>,
    /// Insert into the existing table instead of replacing it.
    pub append: bool,
    pub queries: Vec<String>,
}

fn source_path(config: &JobConfig) -> Result<&Path, AppError> {
    match &config.source {
        Source::Path(path) => Ok(path),
        Source::Url(url) => Err(AppError::Config(format!("{} is not a local CSV file", url))),
    }
}

fn read_typed(config: &JobConfig, headers: Option<&[String]>) -> Result<RecordSet, AppError> {
    let path = source_path(config)?;
    let records = infer_numeric_columns(read_csv(path, headers)?);
    let records = project(records, &config.columns)?;
    tracing::info!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Reads the CSV source into the configured SQL table and runs the queries.
pub fn csv_to_db(config: &JobConfig, options: &CsvLoadOptions) -> Result<Vec<QueryOutput>, AppError> {
    let target = config
        .sql
        .as_ref()
        .ok_or_else(|| AppError::Config("csv-to-db needs a database target".to_string()))?;

    let records = read_typed(config, options.headers.as_deref())?;
    config.log.log("Data extraction complete. Initiating loading process")?;

    let mut db = SqlDatabase::open(&target.path)?;
    if options.append {
        db.append_rows(&target.table, &records)?;
    } else {
        db.replace_table(&target.table, &records)?;
    }
    config.log.log(&format!("Table {} is ready", target.table))?;

    let outputs = super::run_queries(&db, &options.queries)?;
    db.close()?;
    config.log.log("Process Complete")?;
    Ok(outputs)
}

/// Document collection inside a document-store file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionTarget {
    pub path: PathBuf,
    pub collection: String,
}

/// Outcome of a bulk document load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentLoad {
    pub records_read: usize,
    pub collection_size: u64,
}

/// Inserts one document per CSV record into `target`.
pub fn csv_to_docs(config: &JobConfig, target: &CollectionTarget) -> Result<DocumentLoad, AppError> {
    let records = read_typed(config, None)?;
    config.log.log(&format!("Read {} records", records.len()))?;

    let documents = records
        .to_documents()
        .map_err(|e| StorageError::SerializationError(e.to_string()))?;

    let store = DocumentStore::open(&target.path)?;
    store.insert_many(&target.collection, &documents)?;
    let collection_size = store.count_documents(&target.collection)?;
    store.close()?;

    config.log.log(&format!(
        "Inserted {} documents into {} ({} total)",
        documents.len(),
        target.collection,
        collection_size
    ))?;
    Ok(DocumentLoad {
        records_read: records.len(),
        collection_size,
    })
}
