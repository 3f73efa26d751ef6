//! Filesystem storage for cardmark: the file gateway, the `Storage` port and
//! the watcher adapter.

mod error;
/// File reads, writes, checksums and path safety.
pub mod gateway;
/// Storage port and its implementations.
pub mod storage;
/// Watcher adapter.
pub mod watch;

pub use error::StoreError;
pub use gateway::Gateway;
pub use storage::{FsStorage, SingleFileStorage, Storage};
pub use watch::{StorageEvent, WatchHandle};
