// src/utils/progress.rs
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";

/// Separator between the timestamp and the message of a progress line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSeparator {
    /// `2025-11-03-10:15:00 : message`
    Colon,
    /// `2025-11-03-10:15:00,message`
    Comma,
}

impl LogSeparator {
    fn as_str(self) -> &'static str {
        match self {
            LogSeparator::Colon => " : ",
            LogSeparator::Comma => ",",
        }
    }
}

/// Append-only progress log: one timestamped line per job phase.
///
/// Every line is also emitted as a `tracing` event so it shows up in the
/// console log alongside diagnostics.
#[derive(Debug, Clone)]
pub struct ProgressLog {
    path: PathBuf,
    separator: LogSeparator,
}

impl ProgressLog {
    pub fn new<P: AsRef<Path>>(path: P, separator: LogSeparator) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            separator,
        }
    }

    /// Appends `message` with the current local timestamp.
    pub fn log(&self, message: &str) -> std::io::Result<()> {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT);
        let line = format!("{}{}{}\n", timestamp, self.separator.as_str(), message);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;

        tracing::info!("{}", message);
        Ok(())
    }
}
