use cardmark_core::{Task, TaskId};
use serde::Serialize;
use std::path::PathBuf;

/// Notifications published by the repository.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum RepoEvent {
    /// The repository wrote a file.
    #[serde(rename = "file.saved")]
    FileSaved(PathBuf),
    /// A file changed on disk and was re-read.
    #[serde(rename = "file.update")]
    FileUpdate(PathBuf),
    /// A task was read during a scan or re-read.
    #[serde(rename = "task.found")]
    TaskFound {
        /// Task identifier
        id: TaskId,
        /// Owning list
        list: String,
        /// File the task was read from
        path: PathBuf,
    },
    /// A list was populated by a scan.
    #[serde(rename = "list.found")]
    ListFound {
        /// List name
        list: String,
        /// Number of tasks in the list
        count: usize,
    },
}

impl RepoEvent {
    /// Wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FileSaved(_) => "file.saved",
            Self::FileUpdate(_) => "file.update",
            Self::TaskFound { .. } => "task.found",
            Self::ListFound { .. } => "list.found",
        }
    }

    pub(crate) fn task_found(task: &Task) -> Self {
        Self::TaskFound {
            id: task.id,
            list: task.list.clone(),
            path: task.path().to_path_buf(),
        }
    }
}
