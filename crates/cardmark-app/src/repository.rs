//! The live task index.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use cardmark_core::filter::TaskFilter;
use cardmark_core::order::{apply_order, assign_order, order_for_position};
use cardmark_core::task::{new_task_lines, sort_tasks};
use cardmark_core::{Config, File, ListConfig, Task, TaskId};
use cardmark_plugins::{PluginRegistry, TaskDraft};
use cardmark_store_fs::{Storage, StorageEvent, WatchHandle};
use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::{Lifecycle, RepoError, RepoEvent};

/// Files read concurrently during a scan.
pub const FILE_POOL_SIZE: usize = 8;

const EVENT_CAPACITY: usize = 256;

/// Outcome of a full scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Files indexed
    pub files: usize,
    /// Tasks found
    pub tasks: usize,
    /// Files that could not be read, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

/// A configured list and its tasks in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot {
    /// List definition
    pub list: ListConfig,
    /// Tasks sorted by order then text
    pub tasks: Vec<Task>,
}

/// Request to move a task to a position of a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveTask {
    /// Task to move
    pub task: TaskId,
    /// Target list
    pub list: String,
    /// Zero-based position in the target list
    pub position: usize,
}

/// Request to add a task.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    /// Target list
    pub list: String,
    /// Title text
    pub text: String,
    /// Extra body lines
    pub description: Vec<String>,
    /// File to add the task to, relative to the root
    pub path: PathBuf,
    /// Explicit order; assigned from the list when absent
    pub order: Option<f64>,
}

#[derive(Debug, Default)]
struct Index {
    files: BTreeMap<PathBuf, File>,
    lists: HashMap<String, Vec<Task>>,
}

impl Index {
    fn rebuild(&mut self) {
        let mut lists: HashMap<String, Vec<Task>> = HashMap::new();
        for task in self.files.values().flat_map(|file| file.tasks.iter()) {
            lists.entry(task.list.clone()).or_default().push(task.clone());
        }
        for tasks in lists.values_mut() {
            sort_tasks(tasks);
        }
        self.lists = lists;
    }

    fn find(&self, id: TaskId) -> Option<&Task> {
        self.lists.values().flatten().find(|task| task.id == id)
    }
}

/// Decrements the write counter when a save finishes.
struct WriteGuard<'a>(&'a AtomicUsize);

impl<'a> WriteGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Event-driven index of every task under a storage root.
pub struct Repository<S> {
    storage: Arc<S>,
    config: Arc<Config>,
    plugins: PluginRegistry,
    state: Mutex<Lifecycle>,
    index: Mutex<Index>,
    paused: AtomicBool,
    writing: AtomicUsize,
    events: broadcast::Sender<RepoEvent>,
}

impl<S: Storage> Repository<S> {
    /// Create an idle repository over `storage`.
    pub fn new(storage: S, config: Config, plugins: PluginRegistry) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            storage: Arc::new(storage),
            config: Arc::new(config),
            plugins,
            state: Mutex::new(Lifecycle::Idle),
            index: Mutex::new(Index::default()),
            paused: AtomicBool::new(false),
            writing: AtomicUsize::new(0),
            events,
        }
    }

    /// Board settings in use.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Underlying storage.
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Receive repository events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RepoEvent> {
        self.events.subscribe()
    }

    /// Current lifecycle state.
    ///
    /// # Errors
    /// Returns an error if the state lock is poisoned.
    pub fn lifecycle(&self) -> Result<Lifecycle, RepoError> {
        Ok(*self.state()?)
    }

    /// First full scan.
    ///
    /// # Errors
    /// Returns [`RepoError::Busy`] while another scan runs and a store error
    /// when the storage cannot be listed. Unreadable files are reported in
    /// the [`ScanReport`] instead.
    pub async fn init(&self) -> Result<ScanReport, RepoError> {
        self.run_scan(false).await
    }

    /// Re-scan everything, serving the previous index meanwhile.
    ///
    /// # Errors
    /// Same as [`Repository::init`], plus [`RepoError::NotReady`] before the
    /// first scan.
    pub async fn refresh(&self) -> Result<ScanReport, RepoError> {
        self.run_scan(true).await
    }

    /// Drop the index and refuse further work.
    ///
    /// # Errors
    /// Returns an error if a lock is poisoned.
    pub fn destroy(&self) -> Result<(), RepoError> {
        *self.state()? = Lifecycle::Destroyed;
        *self.index()? = Index::default();
        info!("Repository destroyed");
        Ok(())
    }

    async fn run_scan(&self, refresh: bool) -> Result<ScanReport, RepoError> {
        {
            let mut state = self.state()?;
            *state = state.begin_scan(refresh)?;
        }
        let result = self.scan().await;
        {
            let mut state = self.state()?;
            *state = state.finish_scan(result.is_ok());
        }
        result
    }

    async fn scan(&self) -> Result<ScanReport, RepoError> {
        let paths = self.storage.list().await?;
        info!(files = paths.len(), "Scanning files");

        let limiter = Arc::new(Semaphore::new(FILE_POOL_SIZE));
        let mut jobs = JoinSet::new();
        for path in paths {
            let storage = Arc::clone(&self.storage);
            let config = Arc::clone(&self.config);
            let limiter = Arc::clone(&limiter);
            jobs.spawn(async move {
                let permit = limiter.acquire_owned().await.ok();
                let result = storage.read(&path).await.map(|mut file| {
                    file.extract_tasks(&config);
                    file
                });
                drop(permit);
                (path, result)
            });
        }

        let mut report = ScanReport::default();
        let mut files = BTreeMap::new();
        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok((path, Ok(mut file))) => {
                    self.announce(&mut file);
                    report.tasks += file.tasks.len();
                    files.insert(path, file);
                }
                Ok((path, Err(err))) => {
                    warn!(path = %path.display(), error = %err, "Failed to read file");
                    report.failed.push((path, err.to_string()));
                }
                Err(err) => {
                    warn!(error = %err, "Scan job failed");
                    report.failed.push((PathBuf::new(), err.to_string()));
                }
            }
        }
        report.files = files.len();

        let populated = {
            let mut index = self.index()?;
            // destroy() flips the state before clearing the index.
            if self.lifecycle()? == Lifecycle::Destroyed {
                info!("Repository destroyed during scan, dropping results");
                return Err(RepoError::Destroyed);
            }
            index.files = files;
            index.rebuild();
            self.config
                .lists
                .iter()
                .filter(|list| !list.is_virtual())
                .filter_map(|list| index.lists.get(&list.name).map(|tasks| (list.clone(), tasks.clone())))
                .collect::<Vec<_>>()
        };
        for (list, tasks) in populated {
            self.plugins.list_found(&list, &tasks);
            self.emit(RepoEvent::ListFound {
                list: list.name,
                count: tasks.len(),
            });
        }
        info!(
            files = report.files,
            tasks = report.tasks,
            failed = report.failed.len(),
            "Scan finished"
        );
        Ok(report)
    }

    /// Tasks of `name` in display order.
    ///
    /// Virtual lists are filled by matching every task against their filter.
    /// Unknown lists are empty.
    ///
    /// # Errors
    /// Returns an error if the index lock is poisoned.
    pub fn get_tasks_in_list(&self, name: &str) -> Result<Vec<Task>, RepoError> {
        let index = self.index()?;
        let filter = self
            .config
            .find_list(name)
            .and_then(|list| list.filter.as_deref())
            .and_then(TaskFilter::new);
        let Some(filter) = filter else {
            return Ok(index.lists.get(name).cloned().unwrap_or_default());
        };
        let mut tasks: Vec<Task> = index
            .files
            .values()
            .flat_map(|file| file.tasks.iter())
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        sort_tasks(&mut tasks);
        Ok(tasks)
    }

    /// Every configured list with its tasks, in configuration order.
    ///
    /// # Errors
    /// Returns an error if the index lock is poisoned.
    pub fn lists(&self) -> Result<Vec<ListSnapshot>, RepoError> {
        self.config
            .lists
            .iter()
            .map(|list| {
                Ok(ListSnapshot {
                    list: list.clone(),
                    tasks: self.get_tasks_in_list(&list.name)?,
                })
            })
            .collect()
    }

    /// Look up a task by id.
    ///
    /// # Errors
    /// Returns an error if the index lock is poisoned.
    pub fn find_task(&self, id: TaskId) -> Result<Option<Task>, RepoError> {
        Ok(self.index()?.find(id).cloned())
    }

    /// Indexed copy of a file.
    ///
    /// # Errors
    /// Returns an error if the index lock is poisoned.
    pub fn file(&self, path: &Path) -> Result<Option<File>, RepoError> {
        Ok(self.index()?.files.get(path).cloned())
    }

    /// Move a task to `position` of `list`, renumbering neighbours when the
    /// target has no room, and write every touched file.
    ///
    /// # Errors
    /// Fails for unknown lists or tasks, stale tasks and write errors.
    pub async fn move_task(&self, request: MoveTask) -> Result<Task, RepoError> {
        self.lifecycle()?.ensure_ready()?;
        if !self.config.list_exists(&request.list) {
            return Err(RepoError::UnknownList(request.list));
        }
        let (task, others) = {
            let index = self.index()?;
            let task = index
                .find(request.task)
                .cloned()
                .ok_or(RepoError::MissingTask(request.task))?;
            let others: Vec<Task> = index
                .lists
                .get(&request.list)
                .into_iter()
                .flatten()
                .filter(|other| other.id != task.id)
                .cloned()
                .collect();
            (task, others)
        };

        let plan = order_for_position(&others, &task, request.position, &self.config);
        let mut moved = task.clone();
        moved.list.clone_from(&request.list);
        apply_order(&mut moved, plan.order, &self.config);
        debug!(task = %task.id, list = %request.list, position = request.position, order = ?plan.order, "Moving task");

        let mut edits = vec![(task, moved)];
        for (idx, order) in plan.renumber {
            if let Some(other) = others.get(idx) {
                let mut renumbered = other.clone();
                apply_order(&mut renumbered, Some(order), &self.config);
                edits.push((other.clone(), renumbered));
            }
        }
        let mut results = self.apply_edits(edits).await?;
        results
            .swap_remove(0)
            .ok_or(RepoError::MissingTask(request.task))
    }

    /// Replace the lines of the task with `task.id` by the rendering of
    /// `task`. With `write` unset the file stays dirty in memory until
    /// [`Repository::write_file`].
    ///
    /// # Errors
    /// Fails for unknown lists or tasks, stale tasks and write errors.
    pub async fn modify_task(&self, task: &Task, write: bool) -> Result<Task, RepoError> {
        self.lifecycle()?.ensure_ready()?;
        if !self.config.list_exists(&task.list) {
            return Err(RepoError::UnknownList(task.list.clone()));
        }
        let (original, mut file) = self.locate(task.id)?;
        if !file.replace_task_lines(&original, &task.render_lines()) {
            return Err(self.stale(&original).await);
        }
        let file = if write {
            self.save(file).await?
        } else {
            file.extract_tasks(&self.config);
            self.install(file.clone())?;
            file
        };
        file.tasks
            .iter()
            .find(|found| found.line == original.line)
            .cloned()
            .ok_or(RepoError::MissingTask(task.id))
    }

    /// Write the indexed content of `path` to storage.
    ///
    /// # Errors
    /// Fails when the file is not indexed or cannot be written.
    pub async fn write_file(&self, path: &Path) -> Result<(), RepoError> {
        self.lifecycle()?.ensure_ready()?;
        let file = self
            .file(path)?
            .ok_or_else(|| RepoError::MissingFile(path.to_path_buf()))?;
        self.save(file).await.map(drop)
    }

    /// Add a task to a file, creating the file when needed.
    ///
    /// Plugins see the request first and may edit or reject it.
    ///
    /// # Errors
    /// Fails for unknown lists, plugin rejections, binary targets and
    /// storage errors.
    pub async fn add_task(&self, request: NewTask) -> Result<Task, RepoError> {
        self.lifecycle()?.ensure_ready()?;
        let mut draft = TaskDraft {
            list: request.list,
            text: request.text,
            description: request.description,
            path: request.path,
            order: request.order,
        };
        self.plugins.before_add_task(&mut draft)?;
        if !self.config.list_exists(&draft.list) {
            return Err(RepoError::UnknownList(draft.list));
        }

        let mut file = match self.file(&draft.path)? {
            Some(file) => file,
            None => match self.storage.read(&draft.path).await {
                Ok(file) => file,
                Err(err) if err.is_not_found() => {
                    self.storage.prepare(&draft.path).await?;
                    File::new(draft.path.clone(), String::new())
                }
                Err(err) => return Err(err.into()),
            },
        };
        if file.binary {
            return Err(RepoError::Other(format!(
                "cannot add a task to binary file {}",
                draft.path.display()
            )));
        }

        let siblings = self.get_tasks_in_list(&draft.list)?;
        let top = self.config.add_new_cards_to_top;
        let order = assign_order(&siblings, draft.order, &self.config, top);
        let mut lines = new_task_lines(
            &self.config,
            &draft.list,
            &draft.text,
            order,
            file.language.is_markdown(),
        );
        lines.extend(draft.description);
        let line = file.insert_task_lines(&lines, top);

        let file = self.save(file).await?;
        let task = file
            .tasks
            .iter()
            .find(|task| task.line == line)
            .cloned()
            .ok_or_else(|| RepoError::Other(format!("new task not found in {}", draft.path.display())))?;
        info!(task = %task.id, list = %task.list, path = %draft.path.display(), "Added task");
        Ok(task)
    }

    /// Remove a task's lines from its file.
    ///
    /// # Errors
    /// Fails for unknown or stale tasks and write errors.
    pub async fn delete_task(&self, id: TaskId) -> Result<Task, RepoError> {
        self.lifecycle()?.ensure_ready()?;
        let (task, mut file) = self.locate(id)?;
        if !file.delete_task_lines(&task) {
            return Err(self.stale(&task).await);
        }
        self.save(file).await?;
        self.plugins.after_task_deleted(&task);
        info!(task = %id, path = %task.path().display(), "Deleted task");
        Ok(task)
    }

    /// Ignore watcher events until [`Repository::resume_watch`].
    pub fn pause_watch(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Handle watcher events again.
    pub fn resume_watch(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Whether watcher events are currently dropped, either on request or
    /// because the repository is writing.
    #[must_use]
    pub fn is_watch_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst) || self.writing.load(Ordering::SeqCst) > 0
    }

    /// Start the storage watcher.
    ///
    /// # Errors
    /// Returns a store error when the watcher cannot start.
    pub fn watch(&self) -> Result<WatchHandle, RepoError> {
        Ok(self.storage.watch()?)
    }

    /// Feed watcher events into the index until the watcher stops.
    pub async fn run_watch(&self, mut handle: WatchHandle) {
        while let Some(event) = handle.recv().await {
            if let Err(err) = self.handle_event(event).await {
                warn!(error = %err, "Failed to handle storage event");
            }
        }
        debug!("Watcher closed");
    }

    /// Apply one storage event. Returns whether the index changed.
    ///
    /// Events are dropped while paused or not ready. A file whose on-disk
    /// modification time is not newer than the indexed one is left alone,
    /// and so is a file whose checksum did not change.
    ///
    /// # Errors
    /// Returns a store error when the file cannot be inspected or read.
    pub async fn handle_event(&self, event: StorageEvent) -> Result<bool, RepoError> {
        if self.is_watch_paused() {
            debug!(path = %event.path().display(), "Watch paused, dropping event");
            return Ok(false);
        }
        if self.lifecycle()? != Lifecycle::Ready || !self.storage.accepts(event.path()) {
            return Ok(false);
        }
        let path = event.path().to_path_buf();
        let on_disk = match event {
            StorageEvent::Removed(_) => None,
            StorageEvent::Added(_) | StorageEvent::Changed(_) => self.storage.modified(&path).await?,
        };
        let Some(on_disk) = on_disk else {
            return self.forget(&path);
        };

        let known = self
            .index()?
            .files
            .get(&path)
            .map(|file| (file.modified, file.checksum.clone()));
        if let Some((Some(known_modified), _)) = &known
            && on_disk <= *known_modified
        {
            debug!(path = %path.display(), "Ignoring event with stale modification time");
            return Ok(false);
        }

        let mut file = match self.storage.read(&path).await {
            Ok(file) => file,
            Err(err) if err.is_not_found() => return self.forget(&path),
            Err(err) => return Err(err.into()),
        };
        if let Some((_, Some(known_checksum))) = &known
            && file.checksum.as_ref() == Some(known_checksum)
        {
            if let Some(indexed) = self.index()?.files.get_mut(&path) {
                indexed.modified = file.modified;
            }
            debug!(path = %path.display(), "Content unchanged");
            return Ok(false);
        }

        file.extract_tasks(&self.config);
        self.announce(&mut file);
        self.install(file)?;
        info!(path = %path.display(), "File updated");
        self.emit(RepoEvent::FileUpdate(path));
        Ok(true)
    }

    fn forget(&self, path: &Path) -> Result<bool, RepoError> {
        let removed = {
            let mut index = self.index()?;
            let removed = index.files.remove(path).is_some();
            if removed {
                index.rebuild();
            }
            removed
        };
        if removed {
            info!(path = %path.display(), "File removed");
            self.emit(RepoEvent::FileUpdate(path.to_path_buf()));
        }
        Ok(removed)
    }

    /// Rewrite several tasks, file by file, and return each rewritten task
    /// as found after the write.
    async fn apply_edits(&self, edits: Vec<(Task, Task)>) -> Result<Vec<Option<Task>>, RepoError> {
        let mut by_path: BTreeMap<PathBuf, Vec<usize>> = BTreeMap::new();
        for (idx, (original, _)) in edits.iter().enumerate() {
            by_path.entry(original.path().to_path_buf()).or_default().push(idx);
        }

        let mut results = vec![None; edits.len()];
        for (path, mut members) in by_path {
            let mut file = self.file(&path)?.ok_or_else(|| RepoError::MissingFile(path.clone()))?;
            // Bottom-up, so earlier line numbers stay valid.
            members.sort_by_key(|&idx| std::cmp::Reverse(edits[idx].0.line));
            let mut growth = Vec::with_capacity(members.len());
            for &idx in &members {
                let (original, updated) = &edits[idx];
                let before = file.line_count;
                if !file.replace_task_lines(original, &updated.render_lines()) {
                    return Err(self.stale(original).await);
                }
                growth.push((original.line, file.line_count.cast_signed() - before.cast_signed()));
            }

            let file = self.save(file).await?;
            for &idx in &members {
                let line = edits[idx].0.line;
                let shift: isize = growth
                    .iter()
                    .filter(|(other, _)| *other < line)
                    .map(|(_, delta)| delta)
                    .sum();
                let new_line = line.saturating_add_signed(shift);
                results[idx] = file.tasks.iter().find(|task| task.line == new_line).cloned();
            }
        }
        Ok(results)
    }

    fn locate(&self, id: TaskId) -> Result<(Task, File), RepoError> {
        let index = self.index()?;
        let task = index.find(id).cloned().ok_or(RepoError::MissingTask(id))?;
        let file = index
            .files
            .get(task.path())
            .cloned()
            .ok_or_else(|| RepoError::MissingFile(task.path().to_path_buf()))?;
        Ok((task, file))
    }

    /// Re-read a file whose content no longer matches a task and build the
    /// error for the caller.
    async fn stale(&self, task: &Task) -> RepoError {
        let path = task.path().to_path_buf();
        warn!(path = %path.display(), line = task.line, "Task is out of date, re-reading file");
        match self.storage.read(&path).await {
            Ok(mut file) => {
                file.extract_tasks(&self.config);
                self.announce(&mut file);
                if let Err(err) = self.install(file) {
                    return err;
                }
                self.emit(RepoEvent::FileUpdate(path.clone()));
            }
            Err(err) => warn!(path = %path.display(), error = %err, "Re-read failed"),
        }
        RepoError::StaleTask {
            path,
            line: task.line,
        }
    }

    async fn save(&self, mut file: File) -> Result<File, RepoError> {
        {
            let _writing = WriteGuard::new(&self.writing);
            self.storage.write(&mut file).await?;
        }
        file.extract_tasks(&self.config);
        self.install(file.clone())?;
        self.emit(RepoEvent::FileSaved(file.path.clone()));
        Ok(file)
    }

    fn install(&self, file: File) -> Result<(), RepoError> {
        let mut index = self.index()?;
        index.files.insert(file.path.clone(), file);
        index.rebuild();
        Ok(())
    }

    fn announce(&self, file: &mut File) {
        for task in &mut file.tasks {
            self.plugins.task_found(task);
            self.emit(RepoEvent::task_found(task));
        }
    }

    fn emit(&self, event: RepoEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn state(&self) -> Result<MutexGuard<'_, Lifecycle>, RepoError> {
        self.state
            .lock()
            .map_err(|_| RepoError::Other("Failed to lock lifecycle".into()))
    }

    fn index(&self) -> Result<MutexGuard<'_, Index>, RepoError> {
        self.index
            .lock()
            .map_err(|_| RepoError::Other("Failed to lock index".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardmark_core::extract_tasks;

    #[test]
    fn rebuild_groups_and_sorts_by_list() {
        let config = Config::default();
        let mut index = Index::default();
        for (path, content) in [
            ("a.md", "#TODO:20 late\n#DOING work\n"),
            ("b.md", "#TODO:10 early\n#TODO unordered\n"),
        ] {
            let mut file = File::new(path, content);
            file.extract_tasks(&config);
            index.files.insert(PathBuf::from(path), file);
        }
        index.rebuild();

        let todo: Vec<&str> = index.lists["TODO"].iter().map(|t| t.text.as_str()).collect();
        assert_eq!(todo, ["early", "late", "unordered"]);
        assert_eq!(index.lists["DOING"].len(), 1);

        let id = extract_tasks(Path::new("a.md"), "#TODO:20 late\n", &config)[0].id;
        assert_eq!(index.find(id).map(|t| t.text.as_str()), Some("late"));
    }

    #[test]
    fn write_guard_counts_nested_saves() {
        let counter = AtomicUsize::new(0);
        {
            let _outer = WriteGuard::new(&counter);
            let _inner = WriteGuard::new(&counter);
            assert_eq!(counter.load(Ordering::SeqCst), 2);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
