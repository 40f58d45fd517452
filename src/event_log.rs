use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::error::ShellError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Append-only text log of lifecycle and geometry events
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `[YYYY-MM-DD HH:MM:SS] <message>` to the log file.
    ///
    /// The file is opened and closed on every call. Callers are free to drop
    /// the error; a log that cannot be written is not a reason to stop.
    pub fn log(&self, message: &str) -> Result<(), ShellError> {
        info!(message, "event");
        let line = format_entry(Local::now(), message);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ShellError::storage(&self.path, e))?;
        writeln!(file, "{line}").map_err(|e| ShellError::storage(&self.path, e))
    }
}

fn format_entry(timestamp: DateTime<Local>, message: &str) -> String {
    format!("[{}] {message}", timestamp.format(TIMESTAMP_FORMAT))
}
