use cardmark_core::TaskId;
use cardmark_plugins::PluginError;
use cardmark_store_fs::StoreError;
use std::path::PathBuf;

use crate::Lifecycle;

/// Errors raised by the index.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Another lifecycle operation is running.
    #[error("repository is busy ({0})")]
    Busy(Lifecycle),
    /// The repository has not finished its first scan.
    #[error("repository is not ready ({0})")]
    NotReady(Lifecycle),
    /// The repository was destroyed.
    #[error("repository was destroyed")]
    Destroyed,
    /// The list is not configured or cannot own tasks.
    #[error("list '{0}' is not configured")]
    UnknownList(String),
    /// Target task could not be found.
    #[error("task {0} not found")]
    MissingTask(TaskId),
    /// The file changed since the task was read.
    #[error("task at {}:{line} is out of date", .path.display())]
    StaleTask {
        /// File the task was read from
        path: PathBuf,
        /// Title line the task was read at
        line: usize,
    },
    /// The file is not indexed.
    #[error("file {} is not indexed", .0.display())]
    MissingFile(PathBuf),
    /// Backing store returned an error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// A plugin rejected the operation.
    #[error(transparent)]
    Plugin(#[from] PluginError),
    /// Other unclassified error.
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for RepoError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{err:#}"))
    }
}
