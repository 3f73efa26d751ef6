//! Registry of plugin instances keyed by name

use crate::{HookKind, Plugin, PluginError, PluginsConfig, Result, TaskDraft};
use cardmark_core::{ListConfig, Task};
use tracing::{debug, warn};

/// Named plugin instances plus the configuration deciding which run.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
    config: PluginsConfig,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .field("config", &self.config)
            .finish()
    }
}

impl PluginRegistry {
    /// Empty registry governed by `config`.
    #[must_use]
    pub fn new(config: PluginsConfig) -> Self {
        Self {
            plugins: Vec::new(),
            config,
        }
    }

    /// Add a plugin.
    ///
    /// # Errors
    /// Returns [`PluginError::Duplicate`] when the name is taken.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) -> Result<()> {
        if self.get(plugin.name()).is_some() {
            return Err(PluginError::Duplicate(plugin.name().to_owned()));
        }
        debug!(plugin = plugin.name(), "Registered plugin");
        self.plugins.push(plugin);
        Ok(())
    }

    /// Remove a plugin by name, returning it.
    pub fn unregister(&mut self, name: &str) -> Option<Box<dyn Plugin>> {
        let idx = self.plugins.iter().position(|p| p.name() == name)?;
        Some(self.plugins.remove(idx))
    }

    /// Look up a plugin by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins
            .iter()
            .find(|p| p.name() == name)
            .map(AsRef::as_ref)
    }

    /// Registered names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Replace the configuration.
    pub fn set_config(&mut self, config: PluginsConfig) {
        self.config = config;
    }

    fn active(&self) -> impl Iterator<Item = &dyn Plugin> {
        self.plugins
            .iter()
            .map(AsRef::as_ref)
            .filter(|p| self.config.is_plugin_enabled(p.name()))
    }

    fn report(kind: HookKind, plugin: &dyn Plugin, result: Result<()>) {
        if let Err(err) = result {
            warn!(hook = kind.as_str(), plugin = plugin.name(), error = %err, "Plugin hook failed");
        }
    }

    /// Run `on_task_found` on every active plugin.
    pub fn task_found(&self, task: &mut Task) {
        for plugin in self.active() {
            Self::report(HookKind::OnTaskFound, plugin, plugin.on_task_found(task));
        }
    }

    /// Run `on_before_add_task`; the first error aborts.
    ///
    /// # Errors
    /// Returns the first plugin error.
    pub fn before_add_task(&self, draft: &mut TaskDraft) -> Result<()> {
        for plugin in self.active() {
            plugin.on_before_add_task(draft)?;
        }
        Ok(())
    }

    /// Run `on_after_task_deleted` on every active plugin.
    pub fn after_task_deleted(&self, task: &Task) {
        for plugin in self.active() {
            Self::report(HookKind::OnAfterTaskDeleted, plugin, plugin.on_after_task_deleted(task));
        }
    }

    /// Run `on_list_found` on every active plugin.
    pub fn list_found(&self, list: &ListConfig, tasks: &[Task]) {
        for plugin in self.active() {
            Self::report(HookKind::OnListFound, plugin, plugin.on_list_found(list, tasks));
        }
    }
}
