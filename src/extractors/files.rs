// src/extractors/files.rs
use std::fs;
use std::path::{Path, PathBuf};

use crate::extractors::table::project;
use crate::records::{ColumnSpec, RecordSet, Value};
use crate::utils::error::SourceError;

/// Input file formats understood by the directory loader, in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    JsonLines,
    Xml,
}

impl FileKind {
    pub const LOAD_ORDER: [FileKind; 3] = [FileKind::Csv, FileKind::JsonLines, FileKind::Xml];

    fn extension(self) -> &'static str {
        match self {
            FileKind::Csv => "csv",
            FileKind::JsonLines => "json",
            FileKind::Xml => "xml",
        }
    }

    pub fn read(self, path: &Path) -> Result<RecordSet, SourceError> {
        match self {
            FileKind::Csv => read_csv(path, None),
            FileKind::JsonLines => read_json_lines(path),
            FileKind::Xml => read_xml(path),
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SourceError + '_ {
    move |source| SourceError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Reads a CSV file. With `headers` the file is taken as headerless and the
/// given names label its columns; otherwise the first line is the header.
pub fn read_csv(path: &Path, headers: Option<&[String]>) -> Result<RecordSet, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(headers.is_none())
        .from_path(path)?;

    let columns = match headers {
        Some(names) => names.to_vec(),
        None => reader.headers()?.iter().map(|h| h.trim().to_string()).collect(),
    };

    let mut records = RecordSet::new(columns);
    for row in reader.records() {
        let row = row?;
        records.push_row(row.iter().map(|cell| Value::Text(cell.to_string())).collect())?;
    }

    tracing::debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Reads one JSON object per line; blank lines are skipped.
pub fn read_json_lines(path: &Path) -> Result<RecordSet, SourceError> {
    let content = fs::read_to_string(path).map_err(io_error(path))?;

    let mut records = RecordSet::default();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(line)
            .map_err(|source| SourceError::Json {
                line: index + 1,
                source,
            })?;
        let fields = object
            .into_iter()
            .map(|(key, value)| (key, json_to_value(value)))
            .collect();
        push_fields(&mut records, fields, &format!("line {}", index + 1))?;
    }

    tracing::debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Reads an XML file where each child of the root is a record and each of
/// its child elements is a field.
pub fn read_xml(path: &Path) -> Result<RecordSet, SourceError> {
    let content = fs::read_to_string(path).map_err(io_error(path))?;
    let document = roxmltree::Document::parse(&content)?;

    let mut records = RecordSet::default();
    for (index, node) in document.root_element().children().filter(|n| n.is_element()).enumerate() {
        let fields = node
            .children()
            .filter(|n| n.is_element())
            .map(|field| {
                let text = field.text().unwrap_or_default().trim().to_string();
                (field.tag_name().name().to_string(), Value::Text(text))
            })
            .collect();
        push_fields(&mut records, fields, &format!("<{}> #{}", node.tag_name().name(), index + 1))?;
    }

    tracing::debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

fn json_to_value(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::String(s) => Value::Text(s),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::Null => Value::Text(String::new()),
        other => Value::Text(other.to_string()),
    }
}

/// Adds a keyed record; the first record fixes the columns, later ones must carry the same keys.
fn push_fields(records: &mut RecordSet, fields: Vec<(String, Value)>, origin: &str) -> Result<(), SourceError> {
    if records.columns.is_empty() && records.is_empty() {
        records.columns = fields.iter().map(|(k, _)| k.clone()).collect();
    }

    if fields.len() != records.columns.len() {
        return Err(SourceError::Shape(format!(
            "{} has {} fields, expected [{}]",
            origin,
            fields.len(),
            records.columns.join(", ")
        )));
    }

    let mut fields = fields;
    let mut row = Vec::with_capacity(records.columns.len());
    for column in &records.columns {
        let position = fields.iter().position(|(k, _)| k == column).ok_or_else(|| {
            SourceError::Shape(format!("{} lacks field '{}'", origin, column))
        })?;
        row.push(fields.swap_remove(position).1);
    }
    records.push_row(row)?;
    Ok(())
}

/// Loads every CSV, then JSON-lines, then XML file directly inside `dir`,
/// projects each onto `columns` and concatenates them. `exclude` (typically
/// the job's own output file) is never read back in.
pub fn collect_directory(dir: &Path, exclude: &Path, columns: &ColumnSpec) -> Result<RecordSet, SourceError> {
    let excluded = fs::canonicalize(exclude).ok();

    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_error(dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    entries.sort();

    let mut combined = RecordSet::new(columns.names().to_vec());
    for kind in FileKind::LOAD_ORDER {
        for path in entries.iter().filter(|p| has_extension(p, kind.extension())) {
            if excluded.is_some() && fs::canonicalize(path).ok() == excluded {
                tracing::debug!("Skipping output file {}", path.display());
                continue;
            }

            let records = project(kind.read(path)?, columns)?;
            tracing::info!("Loaded {} records from {}", records.len(), path.display());
            combined.append(records)?;
        }
    }
    Ok(combined)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case(extension))
}
