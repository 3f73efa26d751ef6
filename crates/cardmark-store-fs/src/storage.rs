//! Storage port consumed by the index, with a directory-tree and a single-file
//! implementation.

use crate::gateway::{Gateway, is_ignored};
use crate::watch::{PathFilter, WatchHandle};
use crate::StoreError;
use cardmark_core::File;
use notify::RecursiveMode;
use regex::Regex;
use std::future::Future;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// File access needed by the index.
///
/// Paths are always relative to [`Storage::root`].
pub trait Storage: Send + Sync + 'static {
    /// Project root.
    fn root(&self) -> &Path;

    /// Every file the index should know about.
    ///
    /// # Errors
    /// Returns a store error when the listing fails.
    fn list(&self) -> impl Future<Output = Result<Vec<PathBuf>, StoreError>> + Send;

    /// Whether `path` belongs to this storage at all.
    fn accepts(&self, path: &Path) -> bool;

    /// Read one file.
    ///
    /// # Errors
    /// Returns a store error when the file cannot be read.
    fn read(&self, path: &Path) -> impl Future<Output = Result<File, StoreError>> + Send;

    /// Write one file, updating its checksum and timestamps.
    ///
    /// # Errors
    /// Returns a store error when the file cannot be written.
    fn write(&self, file: &mut File) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete one file.
    ///
    /// # Errors
    /// Returns a store error when the file cannot be removed.
    fn delete(&self, path: &Path) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Ensure the parent directory of `path` exists.
    ///
    /// # Errors
    /// Returns a store error when the directory cannot be created.
    fn prepare(&self, path: &Path) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Current on-disk modification time.
    ///
    /// # Errors
    /// Returns a store error when the file cannot be inspected.
    fn modified(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<Option<OffsetDateTime>, StoreError>> + Send;

    /// Start watching for changes.
    ///
    /// # Errors
    /// Returns a store error when the platform watcher fails.
    fn watch(&self) -> Result<WatchHandle, StoreError>;
}

/// A project directory tree.
#[derive(Debug, Clone)]
pub struct FsStorage {
    gateway: Gateway,
    exclude: Vec<Regex>,
}

impl FsStorage {
    /// Storage for the tree under `root`, skipping paths matching `exclude`.
    ///
    /// # Errors
    /// Returns [`StoreError::Pattern`] when an exclude pattern is invalid.
    pub fn new(root: impl Into<PathBuf>, exclude: &[String]) -> Result<Self, StoreError> {
        let exclude = exclude
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            gateway: Gateway::new(root),
            exclude,
        })
    }

    /// Underlying gateway.
    #[must_use]
    pub const fn gateway(&self) -> &Gateway {
        &self.gateway
    }
}

impl Storage for FsStorage {
    fn root(&self) -> &Path {
        self.gateway.root()
    }

    async fn list(&self) -> Result<Vec<PathBuf>, StoreError> {
        self.gateway.list(&self.exclude).await
    }

    fn accepts(&self, path: &Path) -> bool {
        !is_ignored(path, &self.exclude)
    }

    async fn read(&self, path: &Path) -> Result<File, StoreError> {
        self.gateway.read(path).await
    }

    async fn write(&self, file: &mut File) -> Result<(), StoreError> {
        self.gateway.write(file).await
    }

    async fn delete(&self, path: &Path) -> Result<(), StoreError> {
        self.gateway.delete(path).await
    }

    async fn prepare(&self, path: &Path) -> Result<(), StoreError> {
        self.gateway.prepare(path).await
    }

    async fn modified(&self, path: &Path) -> Result<Option<OffsetDateTime>, StoreError> {
        self.gateway.modified(path).await
    }

    fn watch(&self) -> Result<WatchHandle, StoreError> {
        let exclude = self.exclude.clone();
        let filter: PathFilter = Box::new(move |path: &Path| !is_ignored(path, &exclude));
        WatchHandle::start(
            self.gateway.root(),
            self.gateway.root(),
            RecursiveMode::Recursive,
            filter,
        )
    }
}

/// Exactly one file, addressed relative to its directory.
#[derive(Debug, Clone)]
pub struct SingleFileStorage {
    gateway: Gateway,
    file: PathBuf,
}

impl SingleFileStorage {
    /// Storage for the file at `path`.
    ///
    /// # Errors
    /// Returns [`StoreError::Other`] when `path` has no file name.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .ok_or_else(|| StoreError::Other(format!("Not a file path: {}", path.display())))?;
        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok(Self {
            gateway: Gateway::new(dir),
            file: PathBuf::from(name),
        })
    }

    /// The one file, relative to the root.
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }

    fn check(&self, path: &Path) -> Result<(), StoreError> {
        if path == self.file {
            Ok(())
        } else {
            Err(StoreError::PathEscape(path.to_path_buf()))
        }
    }
}

impl Storage for SingleFileStorage {
    fn root(&self) -> &Path {
        self.gateway.root()
    }

    async fn list(&self) -> Result<Vec<PathBuf>, StoreError> {
        match self.gateway.modified(&self.file).await? {
            Some(_) => Ok(vec![self.file.clone()]),
            None => Ok(Vec::new()),
        }
    }

    fn accepts(&self, path: &Path) -> bool {
        path == self.file
    }

    async fn read(&self, path: &Path) -> Result<File, StoreError> {
        self.check(path)?;
        self.gateway.read(path).await
    }

    async fn write(&self, file: &mut File) -> Result<(), StoreError> {
        self.check(&file.path)?;
        self.gateway.write(file).await
    }

    async fn delete(&self, path: &Path) -> Result<(), StoreError> {
        self.check(path)?;
        self.gateway.delete(path).await
    }

    async fn prepare(&self, path: &Path) -> Result<(), StoreError> {
        self.check(path)?;
        self.gateway.prepare(path).await
    }

    async fn modified(&self, path: &Path) -> Result<Option<OffsetDateTime>, StoreError> {
        self.check(path)?;
        self.gateway.modified(path).await
    }

    fn watch(&self) -> Result<WatchHandle, StoreError> {
        let file = self.file.clone();
        let filter: PathFilter = Box::new(move |path: &Path| path == file);
        WatchHandle::start(
            self.gateway.root(),
            self.gateway.root(),
            RecursiveMode::NonRecursive,
            filter,
        )
    }
}
