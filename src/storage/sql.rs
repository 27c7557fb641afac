// src/storage/sql.rs
use std::fmt;
use std::path::Path;

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};

use crate::records::{RecordSet, Value};
use crate::utils::error::StorageError;

/// SQLite database used as the relational sink of a job.
///
/// The connection is owned by this value, so it is released on every exit
/// path once the value goes out of scope.
pub struct SqlDatabase {
    conn: Connection,
    label: String,
}

impl SqlDatabase {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        tracing::info!("Opened SQLite database {}", path.display());
        Ok(Self {
            conn,
            label: path.display().to_string(),
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            label: ":memory:".to_string(),
        })
    }

    /// Drops `table` if present, recreates it from the record columns and loads every record.
    pub fn replace_table(&mut self, table: &str, records: &RecordSet) -> Result<usize, StorageError> {
        let quoted = quote_identifier(table)?;
        let tx = self.conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {}", quoted), [])?;
        tx.execute(&create_table_sql(&quoted, records, false)?, [])?;
        let inserted = insert_records(&tx, &quoted, records)?;
        tx.commit()?;

        tracing::info!("Replaced table {} in {} with {} rows", table, self.label, inserted);
        Ok(inserted)
    }

    /// Inserts records into `table`, creating it first when it does not exist.
    pub fn append_rows(&mut self, table: &str, records: &RecordSet) -> Result<usize, StorageError> {
        let quoted = quote_identifier(table)?;
        let tx = self.conn.transaction()?;
        tx.execute(&create_table_sql(&quoted, records, true)?, [])?;
        let inserted = insert_records(&tx, &quoted, records)?;
        tx.commit()?;

        tracing::info!("Appended {} rows to table {} in {}", inserted, table, self.label);
        Ok(inserted)
    }

    /// Runs a read query and collects every row as display text.
    pub fn run_query(&self, sql: &str) -> Result<QueryOutput, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query([])?;
        let mut output = QueryOutput {
            columns,
            rows: Vec::new(),
        };
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(output.columns.len());
            for index in 0..output.columns.len() {
                cells.push(display_cell(row.get_ref(index)?));
            }
            output.rows.push(cells);
        }

        tracing::debug!("Query returned {} rows: {}", output.rows.len(), sql);
        Ok(output)
    }

    /// Closes the connection, surfacing any error SQLite reports on close.
    pub fn close(self) -> Result<(), StorageError> {
        let label = self.label;
        self.conn.close().map_err(|(_, e)| StorageError::Sqlite(e))?;
        tracing::info!("Closed SQLite database {}", label);
        Ok(())
    }
}

/// Result of `run_query`: column names and text cells.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl fmt::Display for QueryOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        writeln!(f, "{}", line(&self.columns))?;
        for row in &self.rows {
            writeln!(f, "{}", line(row))?;
        }
        write!(f, "({} rows)", self.rows.len())
    }
}

/// Double-quotes an SQL identifier, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> Result<String, StorageError> {
    if name.trim().is_empty() || name.contains('\0') {
        return Err(StorageError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

fn column_type(records: &RecordSet, column: &str) -> &'static str {
    let mut values = records.records.iter().filter_map(|r| r.get(column)).peekable();
    if values.peek().is_none() {
        return "TEXT";
    }

    let mut all_integer = true;
    for value in values {
        match value {
            Value::Integer(_) => {}
            Value::Number(_) => all_integer = false,
            Value::Text(_) => return "TEXT",
        }
    }
    if all_integer {
        "INTEGER"
    } else {
        "REAL"
    }
}

fn create_table_sql(quoted_table: &str, records: &RecordSet, if_not_exists: bool) -> Result<String, StorageError> {
    if records.columns.is_empty() {
        return Err(StorageError::InvalidIdentifier(format!("{} has no columns", quoted_table)));
    }

    let definitions = records
        .columns
        .iter()
        .map(|column| -> Result<String, StorageError> {
            Ok(format!("{} {}", quote_identifier(column)?, column_type(records, column)))
        })
        .collect::<Result<Vec<String>, StorageError>>()?;

    Ok(format!(
        "CREATE TABLE {}{} ({})",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        quoted_table,
        definitions.join(", ")
    ))
}

fn insert_records(conn: &Connection, quoted_table: &str, records: &RecordSet) -> Result<usize, StorageError> {
    let column_list = records
        .columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Result<Vec<String>, StorageError>>()?
        .join(", ");
    let placeholders = (1..=records.columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");

    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quoted_table, column_list, placeholders
    ))?;

    for record in &records.records {
        let params = records.columns.iter().map(|column| match record.get(column) {
            Some(Value::Text(s)) => SqlValue::Text(s.clone()),
            Some(Value::Integer(i)) => SqlValue::Integer(*i),
            Some(Value::Number(n)) => SqlValue::Real(*n),
            None => SqlValue::Null,
        });
        stmt.execute(params_from_iter(params))?;
    }
    Ok(records.len())
}

fn display_cell(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(r) => Value::Number(r).to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}
