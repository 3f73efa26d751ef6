//! Task extraction, ordering and rendering for cardmark.
//!
//! Everything in this crate is pure: callers hand in text and a [`Config`]
//! and get tasks or rewritten text back. Reading and writing files lives in
//! `cardmark-store-fs`.

/// Comment spans and the comment-only view of source files.
pub mod comment;
/// Settings consumed by parsing and ordering.
pub mod config;
/// In-memory file model and line edits.
pub mod file;
/// Virtual-list filter queries.
pub mod filter;
/// Identifier types.
pub mod id;
/// Extension to comment-syntax table.
pub mod language;
/// Metadata, tags and contexts.
pub mod meta;
/// Order assignment and representation rewriting.
pub mod order;
/// Streaming task-boundary engine.
pub mod reader;
/// Single-line task recognizers.
pub mod syntax;
/// The task record.
pub mod task;
/// Line helpers.
pub mod text;

pub use config::{Config, ListConfig};
pub use file::File;
pub use id::TaskId;
pub use language::Language;
pub use reader::{TaskReader, extract_tasks};
pub use syntax::TaskKind;
pub use task::{Task, TaskSource};
