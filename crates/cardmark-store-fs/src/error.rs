//! Error types for file storage operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading, writing or watching project files.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The path leaves the project root.
    #[error("Path escapes the project root: {}", .0.display())]
    PathEscape(PathBuf),

    /// The path exists but is not a regular file.
    #[error("Not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    /// The file does not exist.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// I/O operation failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// Path the operation touched.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// File-system watcher failure.
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    /// An exclude pattern is not a valid regular expression.
    #[error("Invalid exclude pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Other unclassified error.
    #[error("Other error: {0}")]
    Other(String),
}

impl StoreError {
    /// Wrap an I/O error, mapping `NotFound` to [`StoreError::NotFound`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }

    /// Whether the error means the file is simply gone.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
