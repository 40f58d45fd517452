use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The two failure kinds the shell distinguishes.
///
/// `StorageUnavailable` is always absorbed by the caller (defaults are used,
/// the write is skipped). `WindowCreationFailed` aborts startup.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("storage unavailable at '{}': {source}", .path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create main window: {reason}")]
    WindowCreationFailed { reason: String },
}

impl ShellError {
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::StorageUnavailable {
            path: path.into(),
            source,
        }
    }
}
