// src/config.rs
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::records::ColumnSpec;
use crate::utils::ProgressLog;

/// Where a job reads its input from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    Path(PathBuf),
}

impl FromStr for Source {
    type Err = String;

    /// `http://` and `https://` strings are URLs; anything else is a local path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("source must not be empty".to_string());
        }
        let lower = s.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(Source::Url(s.to_string()))
        } else {
            Ok(Source::Path(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => f.write_str(url),
            Source::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A table inside a SQLite database file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlTarget {
    pub path: PathBuf,
    pub table: String,
}

/// Everything a scrape-and-load job needs: input, sinks, column selection and progress log.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub source: Source,
    pub csv_output: Option<PathBuf>,
    pub sql: Option<SqlTarget>,
    pub columns: ColumnSpec,
    pub log: ProgressLog,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_detection() {
        assert_eq!(
            "https://en.wikipedia.org/wiki/List_of_largest_banks".parse::<Source>().unwrap(),
            Source::Url("https://en.wikipedia.org/wiki/List_of_largest_banks".to_string())
        );
        assert_eq!(
            "HTTP://example.com".parse::<Source>().unwrap(),
            Source::Url("HTTP://example.com".to_string())
        );
        assert_eq!(
            "./pages/banks.html".parse::<Source>().unwrap(),
            Source::Path(PathBuf::from("./pages/banks.html"))
        );
        assert!("  ".parse::<Source>().is_err());
    }
}
