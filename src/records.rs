// src/records.rs
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Serialize;

use crate::utils::error::ExtractError;

/// A single cell value.
///
/// Scraped cells start out as `Text`; normalization and transforms turn the
/// columns they own into `Number` (and type inference into `Integer`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Integer(i64),
    Number(f64),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Text(_) => None,
            Value::Integer(i) => Some(*i as f64),
            Value::Number(n) => Some(*n),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            // Whole floats keep a trailing ".0" so float columns stay recognisable in CSV output
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 => {
                write!(f, "{:.1}", n)
            }
            Value::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

/// One output row: column name → value, in column order.
pub type Record = IndexMap<String, Value>;

/// Ordered columns plus the records that carry them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Appends a row given positionally in column order.
    pub fn push_row(&mut self, values: Vec<Value>) -> Result<(), ExtractError> {
        if values.len() != self.columns.len() {
            return Err(ExtractError::MalformedTable(format!(
                "row {} has {} cells, expected {}",
                self.records.len() + 1,
                values.len(),
                self.columns.len()
            )));
        }
        let record: Record = self.columns.iter().cloned().zip(values).collect();
        if record.len() != self.columns.len() {
            return Err(ExtractError::MalformedTable(format!(
                "duplicate column names in [{}]",
                self.columns.join(", ")
            )));
        }
        self.records.push(record);
        Ok(())
    }

    /// Moves all records of `other` onto the end of this set.
    ///
    /// Both sets must share the same columns in the same order, except that
    /// an empty, column-less set adopts the columns of the first set appended.
    pub fn append(&mut self, other: RecordSet) -> Result<(), ExtractError> {
        if self.columns.is_empty() && self.records.is_empty() {
            self.columns = other.columns;
        } else if self.columns != other.columns {
            return Err(ExtractError::MalformedTable(format!(
                "cannot append columns [{}] to [{}]",
                other.columns.join(", "),
                self.columns.join(", ")
            )));
        }
        self.records.extend(other.records);
        Ok(())
    }

    /// Renames `from` to `to` in the column list and in every record, keeping its position.
    pub fn rename_column(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        for column in self.columns.iter_mut().filter(|c| c.as_str() == from) {
            *column = to.to_string();
        }
        for record in &mut self.records {
            if let Some(index) = record.get_index_of(from) {
                if let Some((_, value)) = record.shift_remove_index(index) {
                    record.shift_insert(index, to.to_string(), value);
                }
            }
        }
    }

    /// Records as JSON objects, ready for the document store.
    pub fn to_documents(&self) -> Result<Vec<serde_json::Value>, serde_json::Error> {
        self.records.iter().map(serde_json::to_value).collect()
    }
}

/// Caller-chosen subset and order of output columns. Empty keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSpec(Vec<String>);

impl ColumnSpec {
    /// Builds a spec from names; repeated names keep their first position.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut columns: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !columns.contains(&name) {
                columns.push(name);
            }
        }
        Self(columns)
    }

    pub fn all() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl FromStr for ColumnSpec {
    type Err = std::convert::Infallible;

    /// Parses a comma-separated list, e.g. `"Bank Name,MC_USD_Billion"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ColumnSpec::new(
            s.split(',').map(str::trim).filter(|name| !name.is_empty()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordSet {
        let mut set = RecordSet::new(vec!["Rank".into(), "Bank Name".into()]);
        set.push_row(vec!["1".into(), "Bank X".into()]).unwrap();
        set.push_row(vec!["2".into(), "Bank Y".into()]).unwrap();
        set
    }

    #[test]
    fn test_push_row_rejects_wrong_width() {
        let mut set = sample();
        let err = set.push_row(vec!["3".into()]).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedTable(_)));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_push_row_rejects_duplicate_columns() {
        let mut set = RecordSet::new(vec!["Name".into(), "Name".into()]);
        let err = set.push_row(vec!["Alpha".into(), "Beta".into()]).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedTable(_)));
        assert!(set.is_empty());
    }

    #[test]
    fn test_rename_keeps_position() {
        let mut set = sample();
        set.rename_column("Rank", "Position");
        assert_eq!(set.columns, vec!["Position", "Bank Name"]);
        let keys: Vec<&String> = set.records[0].keys().collect();
        assert_eq!(keys, vec!["Position", "Bank Name"]);
        assert_eq!(set.records[1]["Position"], Value::from("2"));
    }

    #[test]
    fn test_append_requires_matching_columns() {
        let mut target = RecordSet::default();
        target.append(sample()).unwrap();
        target.append(sample()).unwrap();
        assert_eq!(target.len(), 4);

        let other = RecordSet::new(vec!["name".into()]);
        assert!(target.append(other).is_err());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Number(1234.56).to_string(), "1234.56");
        assert_eq!(Value::Number(5.0).to_string(), "5.0");
        assert_eq!(Value::Integer(100).to_string(), "100");
        assert_eq!(Value::from("Bank X").to_string(), "Bank X");
    }

    #[test]
    fn test_documents_keep_column_order() {
        let mut set = RecordSet::new(vec!["name".into(), "height".into()]);
        set.push_row(vec!["alex".into(), Value::Number(1.67)]).unwrap();
        let docs = set.to_documents().unwrap();
        assert_eq!(docs[0].to_string(), r#"{"name":"alex","height":1.67}"#);
    }

    #[test]
    fn test_column_spec_parsing() {
        let spec: ColumnSpec = " Rank, Bank Name ,,Rank".parse().unwrap();
        assert_eq!(spec.names(), ["Rank", "Bank Name"]);
        assert!("".parse::<ColumnSpec>().unwrap().is_empty());
    }
}
