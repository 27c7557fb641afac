// src/transform.rs
use std::collections::HashMap;
use std::path::Path;

use crate::extractors::table::parse_localized_number;
use crate::records::{RecordSet, Value};
use crate::utils::error::{SourceError, TransformError};

/// Inches → metres.
pub const INCHES_TO_METRES: f64 = 0.0254;
/// Pounds → kilograms.
pub const POUNDS_TO_KILOGRAMS: f64 = 0.45359237;
/// Millions → billions.
pub const MILLIONS_TO_BILLIONS: f64 = 0.001;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Exchange rates relative to USD, keyed by currency code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeRates(HashMap<String, f64>);

impl ExchangeRates {
    /// Reads a `Currency,Rate` CSV file.
    pub fn from_csv(path: &Path) -> Result<Self, SourceError> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let currency_idx = column_index(&headers, "Currency")?;
        let rate_idx = column_index(&headers, "Rate")?;

        let mut rates = HashMap::new();
        for (index, row) in reader.records().enumerate() {
            let row = row?;
            let currency = row.get(currency_idx).unwrap_or_default().trim().to_string();
            let raw_rate = row.get(rate_idx).unwrap_or_default();
            let rate = parse_localized_number(raw_rate).ok_or_else(|| {
                SourceError::Shape(format!("rate {:?} on row {} is not numeric", raw_rate, index + 1))
            })?;
            rates.insert(currency, rate);
        }

        tracing::debug!("Loaded {} exchange rates from {}", rates.len(), path.display());
        Ok(Self(rates))
    }

    pub fn get(&self, currency: &str) -> Option<f64> {
        self.0.get(currency).copied()
    }
}

impl FromIterator<(String, f64)> for ExchangeRates {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize, SourceError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| SourceError::Shape(format!("rates file lacks a '{}' column", name)))
}

fn numeric_cell(value: &Value, column: &str, row: usize) -> Result<f64, TransformError> {
    match value {
        Value::Text(raw) => parse_localized_number(raw).ok_or_else(|| TransformError::NotNumeric {
            column: column.to_string(),
            row,
            value: raw.clone(),
        }),
        other => Ok(other.as_f64().unwrap_or(f64::NAN)),
    }
}

/// Appends one `MC_<CUR>_Billion` column per currency, converted from `source` and rounded to cents.
pub fn add_currency_columns(
    mut records: RecordSet,
    source: &str,
    rates: &ExchangeRates,
    currencies: &[String],
) -> Result<RecordSet, TransformError> {
    if !records.has_column(source) {
        return Err(TransformError::MissingColumn(source.to_string()));
    }

    let mut conversions = Vec::with_capacity(currencies.len());
    for currency in currencies {
        let rate = rates
            .get(currency)
            .ok_or_else(|| TransformError::MissingRate(currency.clone()))?;
        conversions.push((format!("MC_{}_Billion", currency), rate));
    }

    for (index, record) in records.records.iter_mut().enumerate() {
        let usd = match record.get(source) {
            Some(value) => numeric_cell(value, source, index + 1)?,
            None => return Err(TransformError::MissingColumn(source.to_string())),
        };
        for (column, rate) in &conversions {
            record.insert(column.clone(), Value::Number(round2(usd * rate)));
        }
    }

    for (column, _) in conversions {
        if !records.has_column(&column) {
            records.columns.push(column);
        }
    }
    Ok(records)
}

/// Multiplies a numeric column by `factor`, rounds to two decimals and optionally renames it.
pub fn scale_column(
    mut records: RecordSet,
    column: &str,
    factor: f64,
    rename: Option<&str>,
) -> Result<RecordSet, TransformError> {
    if !records.has_column(column) {
        return Err(TransformError::MissingColumn(column.to_string()));
    }

    for (index, record) in records.records.iter_mut().enumerate() {
        let value = record
            .get_mut(column)
            .ok_or_else(|| TransformError::MissingColumn(column.to_string()))?;
        let scaled = round2(numeric_cell(value, column, index + 1)? * factor);
        *value = Value::Number(scaled);
    }

    if let Some(new_name) = rename {
        records.rename_column(column, new_name);
    }
    Ok(records)
}

/// Converts every text column whose cells all parse as numbers: integers
/// when every cell is integral, floats otherwise. Empty sets are left alone.
pub fn infer_numeric_columns(mut records: RecordSet) -> RecordSet {
    if records.is_empty() {
        return records;
    }

    for column in records.columns.clone() {
        let cells: Vec<Option<&str>> = records
            .records
            .iter()
            .map(|r| r.get(&column).and_then(Value::as_text).map(str::trim))
            .collect();

        if cells.iter().any(|c| c.map_or(true, str::is_empty)) {
            continue;
        }

        let integers: Option<Vec<i64>> = cells.iter().map(|c| c.and_then(|s| s.parse().ok())).collect();
        let converted: Vec<Value> = match integers {
            Some(values) => values.into_iter().map(Value::Integer).collect(),
            None => {
                let floats: Option<Vec<f64>> = cells.iter().map(|c| c.and_then(|s| s.parse().ok())).collect();
                match floats {
                    Some(values) => values.into_iter().map(Value::Number).collect(),
                    None => continue,
                }
            }
        };

        for (record, value) in records.records.iter_mut().zip(converted) {
            record.insert(column.clone(), value);
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banks() -> RecordSet {
        let mut set = RecordSet::new(vec!["Bank name".into(), "MC_USD_Billion".into()]);
        set.push_row(vec!["JPMorgan Chase".into(), Value::Number(432.92)]).unwrap();
        set.push_row(vec!["Bank of America".into(), Value::Number(231.52)]).unwrap();
        set
    }

    fn rates() -> ExchangeRates {
        [("EUR", 0.93), ("GBP", 0.8), ("INR", 82.95)]
            .into_iter()
            .map(|(c, r)| (c.to_string(), r))
            .collect()
    }

    #[test]
    fn test_rates_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exchange_rate.csv");
        std::fs::write(&path, "Currency,Rate\nEUR,0.93\nGBP,0.8\nINR,82.95\n").unwrap();

        let rates = ExchangeRates::from_csv(&path).unwrap();
        assert_eq!(rates, self::rates());
    }

    #[test]
    fn test_currency_columns_are_rounded() {
        let currencies = vec!["GBP".to_string(), "EUR".to_string(), "INR".to_string()];
        let records = add_currency_columns(banks(), "MC_USD_Billion", &rates(), &currencies).unwrap();

        assert_eq!(
            records.columns,
            vec!["Bank name", "MC_USD_Billion", "MC_GBP_Billion", "MC_EUR_Billion", "MC_INR_Billion"]
        );
        let first = &records.records[0];
        assert_eq!(first["MC_GBP_Billion"], Value::Number(346.34));
        assert_eq!(first["MC_EUR_Billion"], Value::Number(402.62));
        assert_eq!(first["MC_INR_Billion"], Value::Number(35910.71));
    }

    #[test]
    fn test_missing_rate() {
        let err = add_currency_columns(banks(), "MC_USD_Billion", &rates(), &["JPY".to_string()]).unwrap_err();
        assert_eq!(err, TransformError::MissingRate("JPY".to_string()));
    }

    #[test]
    fn test_scale_gdp_to_billions() {
        let mut set = RecordSet::new(vec!["Country".into(), "GDP_USD_millions".into()]);
        set.push_row(vec!["United States".into(), "26,854,599".into()]).unwrap();

        let set = scale_column(set, "GDP_USD_millions", MILLIONS_TO_BILLIONS, Some("GDP_USD_billions")).unwrap();
        assert_eq!(set.columns, vec!["Country", "GDP_USD_billions"]);
        assert_eq!(set.records[0]["GDP_USD_billions"], Value::Number(26854.6));
    }

    #[test]
    fn test_scale_units() {
        let mut set = RecordSet::new(vec!["name".into(), "height".into(), "weight".into()]);
        set.push_row(vec!["alex".into(), "65.78".into(), Value::Number(112.99)]).unwrap();

        let set = scale_column(set, "height", INCHES_TO_METRES, None).unwrap();
        let set = scale_column(set, "weight", POUNDS_TO_KILOGRAMS, None).unwrap();
        assert_eq!(set.records[0]["height"], Value::Number(1.67));
        assert_eq!(set.records[0]["weight"], Value::Number(51.25));
    }

    #[test]
    fn test_scale_rejects_text() {
        let mut set = RecordSet::new(vec!["height".into()]);
        set.push_row(vec!["tall".into()]).unwrap();
        let err = scale_column(set, "height", INCHES_TO_METRES, None).unwrap_err();
        assert!(matches!(err, TransformError::NotNumeric { row: 1, .. }));
    }

    #[test]
    fn test_infer_numeric_columns() {
        let mut set = RecordSet::new(vec!["ID".into(), "Total".into(), "City".into()]);
        set.push_row(vec!["1".into(), "10.5".into(), "Lima".into()]).unwrap();
        set.push_row(vec!["2".into(), "3".into(), "Quito".into()]).unwrap();

        let set = infer_numeric_columns(set);
        assert_eq!(set.records[0]["ID"], Value::Integer(1));
        assert_eq!(set.records[1]["Total"], Value::Number(3.0));
        assert_eq!(set.records[1]["City"], Value::from("Quito"));
    }
}
