//! The watch-driven task index for cardmark.
//!
//! A [`Repository`] scans a [`Storage`](cardmark_store_fs::Storage), keeps
//! every task grouped by list, writes edits back through the storage and
//! follows on-disk changes reported by the watcher.

pub mod config;
mod error;
mod event;
mod lifecycle;
pub mod repository;

pub use config::ProjectConfig;
pub use error::RepoError;
pub use event::RepoEvent;
pub use lifecycle::Lifecycle;
pub use repository::{FILE_POOL_SIZE, ListSnapshot, MoveTask, NewTask, Repository, ScanReport};
