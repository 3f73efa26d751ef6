//! Error types for plugin dispatch

/// Result type for plugin operations
pub type Result<T> = std::result::Result<T, PluginError>;

/// Errors raised by plugins or the registry
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// A plugin refused the operation
    #[error("Plugin {plugin} rejected the operation: {reason}")]
    Rejected {
        /// Name of the rejecting plugin
        plugin: String,
        /// Explanation from the plugin
        reason: String,
    },

    /// A plugin failed while handling a hook
    #[error("Plugin {plugin} failed: {message}")]
    Failed {
        /// Name of the failing plugin
        plugin: String,
        /// Failure description
        message: String,
    },

    /// Two plugins were registered under one name
    #[error("Plugin already registered: {0}")]
    Duplicate(String),
}
