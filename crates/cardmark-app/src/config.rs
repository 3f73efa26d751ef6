use std::{collections::HashSet, fs, path::Path};

use anyhow::{Context, Result, bail};
use cardmark_core::Config;
use cardmark_plugins::PluginsConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// Directory holding project settings, relative to the project root.
pub const CONFIG_DIR: &str = ".cardmark";
const CONFIG_FILE: &str = "config.toml";

#[allow(clippy::expect_used)]
static LIST_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{2,}$").expect("list name regex"));

/// Top-level project configuration loaded from `.cardmark/config.toml`.
///
/// Board settings sit at the top level of the file; plugin switches live in
/// a `[plugins]` table.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Settings consumed by parsing and ordering.
    #[serde(flatten)]
    pub board: Config,
    /// Which plugins run.
    pub plugins: PluginsConfig,
}

impl ProjectConfig {
    /// Load configuration for the project rooted at `root`.
    ///
    /// A missing file yields the built-in defaults.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read, parsed or validated.
    pub fn from_workdir(root: impl AsRef<Path>) -> Result<Self> {
        let config_path = root.as_ref().join(CONFIG_DIR).join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config {}", config_path.display()))
    }

    /// Parse and validate configuration text.
    ///
    /// # Errors
    /// Returns an error for malformed TOML or settings that fail validation.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.ensure_unique_lists()?;
        self.ensure_valid_names()?;
        if self.board.blank_lines_to_end_task == 0 {
            bail!("blank_lines_to_end_task must be at least 1");
        }
        Ok(())
    }

    fn ensure_unique_lists(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for list in &self.board.lists {
            if !seen.insert(list.name.as_str()) {
                bail!("duplicate list detected: {}", list.name);
            }
        }
        Ok(())
    }

    fn ensure_valid_names(&self) -> Result<()> {
        for list in &self.board.lists {
            if !LIST_NAME_RE.is_match(&list.name) {
                bail!(
                    "list name '{}' must be at least two letters, digits, '_' or '-'",
                    list.name
                );
            }
            if let Some(filter) = &list.filter
                && filter.trim().is_empty()
            {
                bail!("virtual list '{}' has an empty filter", list.name);
            }
        }
        Ok(())
    }
}
