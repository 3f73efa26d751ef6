//! Plugin configuration

use serde::{Deserialize, Serialize};

/// Which registered plugins run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Whether plugins run at all
    pub enabled: bool,

    /// Names of plugins that never run
    pub disabled: Vec<String>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            disabled: Vec::new(),
        }
    }
}

impl PluginsConfig {
    /// Check if a specific plugin is enabled
    #[must_use]
    pub fn is_plugin_enabled(&self, name: &str) -> bool {
        self.enabled && !self.disabled.iter().any(|disabled| disabled == name)
    }
}
