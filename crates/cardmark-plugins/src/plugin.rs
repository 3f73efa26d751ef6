//! The plugin capability interface

use crate::Result;
use cardmark_core::{ListConfig, Task};
use serde::Serialize;
use std::path::PathBuf;

/// Points in the index lifecycle where plugins are called.
///
/// `OnBeforeAddTask` may reject the operation by returning an error; errors
/// from every other hook are logged and do not affect the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// A task was read from a file
    OnTaskFound,
    /// A task is about to be added
    OnBeforeAddTask,
    /// A task was deleted from its file
    OnAfterTaskDeleted,
    /// A list was populated during a scan
    OnListFound,
}

impl HookKind {
    /// Hook name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnTaskFound => "task-found",
            Self::OnBeforeAddTask => "before-add-task",
            Self::OnAfterTaskDeleted => "after-task-deleted",
            Self::OnListFound => "list-found",
        }
    }

    /// Whether a failure aborts the operation.
    #[must_use]
    pub const fn can_reject(self) -> bool {
        matches!(self, Self::OnBeforeAddTask)
    }
}

/// A task about to be written, open to plugin edits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDraft {
    /// Target list
    pub list: String,
    /// Title text
    pub text: String,
    /// Extra body lines
    pub description: Vec<String>,
    /// File the task goes into, relative to the project root
    pub path: PathBuf,
    /// Explicit order, if the caller asked for one
    pub order: Option<f64>,
}

/// Optional hooks a plugin can implement. Every hook defaults to a no-op.
pub trait Plugin: Send + Sync {
    /// Registry key of the plugin.
    fn name(&self) -> &str;

    /// Inspect or enrich a task right after it was read.
    ///
    /// # Errors
    /// Errors are logged; the task is still indexed.
    fn on_task_found(&self, _task: &mut Task) -> Result<()> {
        Ok(())
    }

    /// Adjust or reject a task before it is written.
    ///
    /// # Errors
    /// Returning an error aborts the add.
    fn on_before_add_task(&self, _draft: &mut TaskDraft) -> Result<()> {
        Ok(())
    }

    /// React to a task removed from its file.
    ///
    /// # Errors
    /// Errors are logged only.
    fn on_after_task_deleted(&self, _task: &Task) -> Result<()> {
        Ok(())
    }

    /// React to a list populated by a scan.
    ///
    /// # Errors
    /// Errors are logged only.
    fn on_list_found(&self, _list: &ListConfig, _tasks: &[Task]) -> Result<()> {
        Ok(())
    }
}
