// src/pipelines/gdp.rs
//! Countries by nominal GDP, in billions of USD.

use crate::config::JobConfig;
use crate::extractors::{extract_linked_rows, project, Document, LinkedRowOptions};
use crate::fetch::load_source;
use crate::records::RecordSet;
use crate::transform::{scale_column, MILLIONS_TO_BILLIONS};
use crate::utils::AppError;

pub const GDP_USD_BILLIONS: &str = "GDP_USD_billions";

#[derive(Debug, Clone, Default)]
pub struct GdpOptions {
    pub rows: LinkedRowOptions,
    pub queries: Vec<String>,
}

pub async fn run(config: &JobConfig, options: &GdpOptions) -> Result<RecordSet, AppError> {
    config.log.log("Preliminaries complete. Initiating ETL process")?;

    let html = load_source(&config.source).await?;
    let document = Document::parse(&html);
    let records = extract_linked_rows(&document, &options.rows)?;
    tracing::info!("Extracted {} countries from {}", records.len(), config.source);
    config.log.log("Data extraction complete. Initiating Transformation process")?;

    let records = scale_column(
        records,
        &options.rows.value_column,
        MILLIONS_TO_BILLIONS,
        Some(GDP_USD_BILLIONS),
    )?;
    let records = project(records, &config.columns)?;
    config.log.log("Data transformation complete. Initiating loading process")?;

    super::load(&records, config, &options.queries)?;
    Ok(records)
}
