// src/pipelines/mod.rs
//! End-to-end jobs. Each one wires a source, the extract and transform steps
//! and the configured sinks, writing progress-log lines at phase boundaries.

pub mod csv_load;
pub mod gdp;
pub mod market_cap;
pub mod measurements;

use crate::config::JobConfig;
use crate::records::RecordSet;
use crate::storage::{write_csv, QueryOutput, SqlDatabase};
use crate::utils::AppError;

/// Writes the CSV output, replaces the SQL table and runs `queries` against it.
///
/// The database handle is closed before returning on success and dropped on
/// any error path.
pub fn load(records: &RecordSet, config: &JobConfig, queries: &[String]) -> Result<Vec<QueryOutput>, AppError> {
    if let Some(csv_path) = &config.csv_output {
        write_csv(csv_path, records)?;
        config.log.log("Data saved to CSV file")?;
    }

    let Some(target) = &config.sql else {
        return Ok(Vec::new());
    };

    let mut db = SqlDatabase::open(&target.path)?;
    config.log.log("SQL Connection initiated")?;

    db.replace_table(&target.table, records)?;
    config.log.log("Data loaded to Database as a table, Executing queries")?;

    let outputs = run_queries(&db, queries)?;
    config.log.log("Process Complete")?;

    db.close()?;
    config.log.log("Server Connection closed")?;
    Ok(outputs)
}

/// Runs each query in order, printing the statement and its result table.
pub fn run_queries(db: &SqlDatabase, queries: &[String]) -> Result<Vec<QueryOutput>, AppError> {
    let mut outputs = Vec::with_capacity(queries.len());
    for query in queries {
        let output = db.run_query(query)?;
        println!("{}\n{}\n", query, output);
        outputs.push(output);
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Source, SqlTarget};
    use crate::records::{ColumnSpec, Value};
    use crate::utils::{LogSeparator, ProgressLog};

    #[test]
    fn test_load_writes_both_sinks_and_logs_phases() {
        let dir = tempfile::tempdir().unwrap();
        let config = JobConfig {
            source: Source::Path(dir.path().join("page.html")),
            csv_output: Some(dir.path().join("out/banks.csv")),
            sql: Some(SqlTarget {
                path: dir.path().join("Banks.db"),
                table: "Largest_banks".to_string(),
            }),
            columns: ColumnSpec::all(),
            log: ProgressLog::new(dir.path().join("code_log.txt"), LogSeparator::Colon),
        };

        let mut records = RecordSet::new(vec!["Name".into(), "MC_USD_Billion".into()]);
        records.push_row(vec!["Bank X".into(), Value::Number(10.5)]).unwrap();

        let outputs = load(&records, &config, &["SELECT * FROM Largest_banks".to_string()]).unwrap();
        assert_eq!(outputs[0].rows, vec![vec!["Bank X".to_string(), "10.5".to_string()]]);

        let csv = std::fs::read_to_string(dir.path().join("out/banks.csv")).unwrap();
        assert_eq!(csv, "Name,MC_USD_Billion\nBank X,10.5\n");

        let log = std::fs::read_to_string(dir.path().join("code_log.txt")).unwrap();
        assert_eq!(log.lines().count(), 5);
        assert!(log.lines().last().unwrap().ends_with(" : Server Connection closed"));
    }

    #[test]
    fn test_load_without_sinks_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let config = JobConfig {
            source: Source::Path(dir.path().join("page.html")),
            csv_output: None,
            sql: None,
            columns: ColumnSpec::all(),
            log: ProgressLog::new(dir.path().join("log.txt"), LogSeparator::Colon),
        };

        let outputs = load(&RecordSet::new(vec!["A".into()]), &config, &[]).unwrap();
        assert!(outputs.is_empty());
        assert!(!dir.path().join("log.txt").exists());
    }
}
