//! Plugin capability interface for cardmark.
//!
//! A plugin implements any subset of the [`Plugin`] hooks. Plugins live in a
//! [`PluginRegistry`] keyed by name, and [`PluginsConfig`] decides which of
//! them run.

mod config;
mod error;
mod plugin;
mod registry;

pub use config::PluginsConfig;
pub use error::{PluginError, Result};
pub use plugin::{HookKind, Plugin, TaskDraft};
pub use registry::PluginRegistry;
