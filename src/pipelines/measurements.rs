// src/pipelines/measurements.rs
//! Height/weight records gathered from a directory of CSV, JSON-lines and XML
//! files, converted to metric units.

use crate::config::{JobConfig, Source};
use crate::extractors::files::collect_directory;
use crate::records::RecordSet;
use crate::storage::write_csv;
use crate::transform::{scale_column, INCHES_TO_METRES, POUNDS_TO_KILOGRAMS};
use crate::utils::AppError;

pub const HEIGHT: &str = "height";
pub const WEIGHT: &str = "weight";

/// Reads every data file in the source directory and writes one metric CSV.
pub fn run(config: &JobConfig) -> Result<RecordSet, AppError> {
    let Source::Path(dir) = &config.source else {
        return Err(AppError::Config(format!("{} is not a local directory", config.source)));
    };
    let output = config
        .csv_output
        .as_ref()
        .ok_or_else(|| AppError::Config("measurements job needs a CSV output path".to_string()))?;

    config.log.log("ETL Job Started")?;

    config.log.log("Extract phase Started")?;
    let records = collect_directory(dir, output, &config.columns)?;
    config.log.log("Extract phase Ended")?;

    config.log.log("Transform phase Started")?;
    let records = scale_column(records, HEIGHT, INCHES_TO_METRES, None)?;
    let records = scale_column(records, WEIGHT, POUNDS_TO_KILOGRAMS, None)?;
    config.log.log("Transform phase Ended")?;

    config.log.log("Load phase Started")?;
    write_csv(output, &records)?;
    config.log.log("Load phase Ended")?;

    config.log.log("ETL Job Ended")?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ColumnSpec, Value};
    use crate::utils::{LogSeparator, ProgressLog};
    use std::fs;
    use std::path::Path;

    fn config(dir: &Path) -> JobConfig {
        JobConfig {
            source: Source::Path(dir.to_path_buf()),
            csv_output: Some(dir.join("transformed_data.csv")),
            sql: None,
            columns: ColumnSpec::new(["name", "height", "weight"]),
            log: ProgressLog::new(dir.join("log_file.txt"), LogSeparator::Comma),
        }
    }

    #[test]
    fn test_measurements_job_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("source1.csv"), "name,height,weight\nalex,65.78,112.99\n").unwrap();
        fs::write(
            dir.path().join("source1.json"),
            "{\"name\": \"ajay\", \"height\": 71.52, \"weight\": 136.49}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("source1.xml"),
            "<data><person><name>simon</name><height>69.4</height><weight>153.03</weight></person></data>",
        )
        .unwrap();

        let records = run(&config(dir.path())).unwrap();
        let names: Vec<String> = records.records.iter().map(|r| r["name"].to_string()).collect();
        assert_eq!(names, vec!["alex", "ajay", "simon"]);
        assert_eq!(records.records[0][HEIGHT], Value::Number(1.67));
        assert_eq!(records.records[0][WEIGHT], Value::Number(51.25));

        let log = fs::read_to_string(dir.path().join("log_file.txt")).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 8);
        assert!(lines[0].ends_with(",ETL Job Started"));
        assert!(lines[7].ends_with(",ETL Job Ended"));
    }

    #[test]
    fn test_rerun_does_not_read_its_own_output() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("source1.csv"), "name,height,weight\nalex,65.78,112.99\n").unwrap();

        run(&config(dir.path())).unwrap();
        let records = run(&config(dir.path())).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_url_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = JobConfig {
            source: Source::Url("https://example.com".to_string()),
            ..config(dir.path())
        };
        assert!(matches!(run(&config), Err(AppError::Config(_))));
    }
}
