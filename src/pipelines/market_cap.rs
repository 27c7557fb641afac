// src/pipelines/market_cap.rs
//! Largest banks by market capitalization, converted into several currencies.

use std::path::PathBuf;

use crate::config::JobConfig;
use crate::extractors::{extract_table, market_cap_column, normalize_numeric_column, project, MC_USD_BILLION};
use crate::fetch::load_source;
use crate::records::RecordSet;
use crate::transform::{add_currency_columns, ExchangeRates};
use crate::utils::AppError;

#[derive(Debug, Clone)]
pub struct MarketCapOptions {
    /// `id` of the element inside the heading that precedes the table.
    pub heading_id: String,
    /// `Currency,Rate` CSV with rates relative to USD.
    pub rates_path: PathBuf,
    pub currencies: Vec<String>,
    /// Statements run against the loaded table.
    pub queries: Vec<String>,
}

pub async fn run(config: &JobConfig, options: &MarketCapOptions) -> Result<RecordSet, AppError> {
    config.log.log("Preliminaries complete. Initiating ETL process")?;

    let html = load_source(&config.source).await?;
    let records = extract_table(&html, &options.heading_id)?;
    let records = normalize_numeric_column(records, market_cap_column, MC_USD_BILLION)?;
    let records = project(records, &config.columns)?;
    tracing::info!("Extracted {} banks from {}", records.len(), config.source);
    config.log.log("Data extraction complete. Initiating Transformation process")?;

    let rates = ExchangeRates::from_csv(&options.rates_path)?;
    let records = add_currency_columns(records, MC_USD_BILLION, &rates, &options.currencies)?;
    config.log.log("Data transformation complete. Initiating Loading process")?;

    super::load(&records, config, &options.queries)?;
    Ok(records)
}
