//! Reads and writes project files on behalf of the index.

use crate::StoreError;
use cardmark_core::File;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Bytes inspected when deciding whether a file is binary.
pub const BINARY_SAMPLE_LEN: usize = 8000;

/// Directory names never scanned.
pub const IGNORED_DIRS: &[&str] = &[".git", "node_modules", "target", ".cardmark"];

/// SHA-256 of `bytes`, hex encoded.
#[must_use]
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Whether `bytes` look binary: a NUL byte or invalid UTF-8 in the sample.
#[must_use]
pub fn is_binary(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(BINARY_SAMPLE_LEN)];
    if sample.contains(&0) {
        return true;
    }
    match std::str::from_utf8(sample) {
        Ok(_) => false,
        // A multi-byte character cut off by the sample boundary is fine.
        Err(err) => err.error_len().is_some() || sample.len() == bytes.len(),
    }
}

/// Whether `rel` is skipped by scans: an ignored directory or an exclude hit.
#[must_use]
pub fn is_ignored(rel: &Path, exclude: &[Regex]) -> bool {
    if rel.components().any(|comp| {
        comp.as_os_str()
            .to_str()
            .is_some_and(|name| IGNORED_DIRS.contains(&name))
    }) {
        return true;
    }
    let text = rel.to_string_lossy().replace('\\', "/");
    exclude.iter().any(|re| re.is_match(&text))
}

/// File access rooted at one project directory.
#[derive(Debug, Clone)]
pub struct Gateway {
    root: PathBuf,
}

impl Gateway {
    /// Gateway for the project at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Turn a project-relative path into an absolute one.
    ///
    /// # Errors
    /// Returns [`StoreError::PathEscape`] when the path uses `..` or points
    /// outside the root. No I/O happens before this check.
    pub fn resolve(&self, rel: &Path) -> Result<PathBuf, StoreError> {
        let rel = if rel.is_absolute() {
            rel.strip_prefix(&self.root)
                .map_err(|_| StoreError::PathEscape(rel.to_path_buf()))?
        } else {
            rel
        };
        if rel
            .components()
            .any(|comp| !matches!(comp, Component::Normal(_) | Component::CurDir))
        {
            return Err(StoreError::PathEscape(rel.to_path_buf()));
        }
        Ok(self.root.join(rel))
    }

    /// Path of `abs` relative to the root, if it lies inside it.
    #[must_use]
    pub fn relative(&self, abs: &Path) -> Option<PathBuf> {
        abs.strip_prefix(&self.root).ok().map(Path::to_path_buf)
    }

    /// Make sure the parent directory of `rel` exists.
    ///
    /// Concurrent callers preparing the same directory all succeed.
    ///
    /// # Errors
    /// Returns an error for unsafe paths or when the directory cannot be
    /// created.
    pub async fn prepare(&self, rel: &Path) -> Result<(), StoreError> {
        let abs = self.resolve(rel)?;
        let Some(parent) = abs.parent() else {
            return Ok(());
        };
        match tokio::fs::create_dir_all(parent).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::AlreadyExists && parent.is_dir() => Ok(()),
            Err(err) => Err(StoreError::io(parent, err)),
        }
    }

    /// Read a file and classify it.
    ///
    /// Binary files come back with [`File::binary`] set and no content. A
    /// file is binary when its sample looks binary or when any part of it is
    /// not valid UTF-8.
    ///
    /// # Errors
    /// Returns an error for unsafe paths, non-regular files and I/O failures.
    pub async fn read(&self, rel: &Path) -> Result<File, StoreError> {
        let abs = self.resolve(rel)?;
        let meta = tokio::fs::metadata(&abs)
            .await
            .map_err(|err| StoreError::io(rel, err))?;
        if !meta.is_file() {
            return Err(StoreError::NotAFile(rel.to_path_buf()));
        }
        let bytes = tokio::fs::read(&abs)
            .await
            .map_err(|err| StoreError::io(rel, err))?;

        let sum = checksum(&bytes);
        let text = if is_binary(&bytes) {
            None
        } else {
            // Invalid UTF-8 past the sample would not survive a rewrite.
            String::from_utf8(bytes).ok()
        };
        let mut file = if let Some(text) = text {
            File::new(rel, text)
        } else {
            debug!(path = %rel.display(), "Skipping binary file");
            File::binary(rel)
        };
        file.checksum = Some(sum);
        file.modified = meta.modified().ok().map(to_datetime);
        file.created = meta.created().ok().map(to_datetime);
        Ok(file)
    }

    /// Write `file` to disk.
    ///
    /// The checksum is updated before writing and restored if the write
    /// fails, so it never describes content that is not on disk.
    ///
    /// # Errors
    /// Returns an error for unsafe paths and I/O failures.
    pub async fn write(&self, file: &mut File) -> Result<(), StoreError> {
        let abs = self.resolve(&file.path)?;
        let previous = file.checksum.replace(checksum(file.content.as_bytes()));
        let result = async {
            self.prepare(&file.path).await?;
            tokio::fs::write(&abs, file.content.as_bytes())
                .await
                .map_err(|err| StoreError::io(&file.path, err))
        }
        .await;
        if let Err(err) = result {
            warn!(path = %file.path.display(), error = %err, "Write failed");
            file.checksum = previous;
            return Err(err);
        }
        let modified = self.modified(&file.path).await.ok().flatten();
        file.modified = Some(modified.unwrap_or_else(OffsetDateTime::now_utc));
        file.dirty = false;
        info!(path = %file.path.display(), "Saved file");
        Ok(())
    }

    /// Delete a file.
    ///
    /// # Errors
    /// Returns an error for unsafe paths and I/O failures.
    pub async fn delete(&self, rel: &Path) -> Result<(), StoreError> {
        let abs = self.resolve(rel)?;
        tokio::fs::remove_file(&abs)
            .await
            .map_err(|err| StoreError::io(rel, err))?;
        info!(path = %rel.display(), "Deleted file");
        Ok(())
    }

    /// On-disk modification time, `None` when the file is gone.
    ///
    /// # Errors
    /// Returns an error for unsafe paths and I/O failures other than a
    /// missing file.
    pub async fn modified(&self, rel: &Path) -> Result<Option<OffsetDateTime>, StoreError> {
        let abs = self.resolve(rel)?;
        match tokio::fs::metadata(&abs).await {
            Ok(meta) => Ok(meta.modified().ok().map(to_datetime)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::io(rel, err)),
        }
    }

    /// Every regular file under the root, relative and sorted.
    ///
    /// # Errors
    /// Returns an error if the blocking walk cannot be joined.
    pub async fn list(&self, exclude: &[Regex]) -> Result<Vec<PathBuf>, StoreError> {
        let root = self.root.clone();
        let exclude = exclude.to_vec();
        tokio::task::spawn_blocking(move || walk(&root, &exclude))
            .await
            .map_err(|err| StoreError::Other(format!("Directory walk join error: {err}")))
    }
}

fn walk(root: &Path, exclude: &[Regex]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .is_ok_and(|rel| rel.as_os_str().is_empty() || !is_ignored(rel, exclude))
        })
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect();
    files.sort();
    files
}

fn to_datetime(time: SystemTime) -> OffsetDateTime {
    OffsetDateTime::from(time)
}
