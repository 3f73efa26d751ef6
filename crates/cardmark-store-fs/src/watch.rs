//! Adapter from `notify` callbacks to a tokio channel of storage events.

use crate::StoreError;
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A change observed on disk, with a project-relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEvent {
    /// A file appeared.
    Added(PathBuf),
    /// A file's content or metadata changed.
    Changed(PathBuf),
    /// A file disappeared.
    Removed(PathBuf),
}

impl StorageEvent {
    /// Path the event is about.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Added(path) | Self::Changed(path) | Self::Removed(path) => path,
        }
    }
}

/// Filter deciding which relative paths are reported.
pub type PathFilter = Box<dyn Fn(&Path) -> bool + Send + Sync>;

/// A running watcher. Dropping it stops the watch.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<StorageEvent>,
}

impl WatchHandle {
    /// Start watching `target` and report events relative to `root`.
    ///
    /// # Errors
    /// Returns an error when the platform watcher cannot be created or
    /// cannot watch `target`.
    pub fn start(
        root: &Path,
        target: &Path,
        mode: RecursiveMode,
        filter: PathFilter,
    ) -> Result<Self, StoreError> {
        let (tx, events) = mpsc::unbounded_channel();
        let base = root.to_path_buf();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    for change in translate(&base, &event) {
                        if filter(change.path()) && tx.send(change).is_err() {
                            debug!("Watch receiver dropped");
                            return;
                        }
                    }
                }
                Err(err) => warn!(error = %err, "Watcher error"),
            },
            Config::default(),
        )?;
        watcher.watch(target, mode)?;
        Ok(Self {
            _watcher: watcher,
            events,
        })
    }

    /// Next event, or `None` once the watcher is gone.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        self.events.recv().await
    }
}

fn translate(root: &Path, event: &Event) -> Vec<StorageEvent> {
    let rel = |path: &PathBuf| path.strip_prefix(root).ok().map(Path::to_path_buf);
    let first = event.paths.first().and_then(rel);
    match event.kind {
        EventKind::Create(_) => first.map(StorageEvent::Added).into_iter().collect(),
        EventKind::Remove(_) => first.map(StorageEvent::Removed).into_iter().collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            first.map(StorageEvent::Removed).into_iter().collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            first.map(StorageEvent::Added).into_iter().collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let to = event.paths.get(1).and_then(rel);
            first
                .map(StorageEvent::Removed)
                .into_iter()
                .chain(to.map(StorageEvent::Added))
                .collect()
        }
        EventKind::Modify(_) => event
            .paths
            .iter()
            .filter_map(rel)
            .map(StorageEvent::Changed)
            .collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
