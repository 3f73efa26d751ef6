//! Configuration consumed by the parsing and ordering layers.
//!
//! Loading from disk happens elsewhere; everything here is plain data that
//! callers construct (or deserialize) and then pass explicitly.

use serde::{Deserialize, Serialize};

/// Default number of consecutive blank lines that ends a task body.
pub const DEFAULT_BLANK_LINES_TO_END_TASK: usize = 2;
/// Default prefix of hash-tag task tokens.
pub const DEFAULT_TOKEN_PREFIX: &str = "#";

/// A configured list (board column).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListConfig {
    /// List name as it appears in task tokens (case-sensitive).
    pub name: String,
    /// Stable identifier used by UI layers.
    #[serde(default)]
    pub id: Option<String>,
    /// Hidden lists are indexed but not displayed.
    #[serde(default)]
    pub hidden: bool,
    /// Filter query for virtual lists. Virtual lists never own tasks.
    #[serde(default)]
    pub filter: Option<String>,
}

impl ListConfig {
    /// Create a visible, non-virtual list.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            hidden: false,
            filter: None,
        }
    }

    /// Whether the list is populated by a filter instead of task tokens.
    #[must_use]
    pub const fn is_virtual(&self) -> bool {
        self.filter.is_some()
    }
}

/// Settings that drive task recognition and ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ordered list definitions.
    pub lists: Vec<ListConfig>,
    /// Prefix of hash-tag tokens, `#` unless configured otherwise.
    pub token_prefix: String,
    /// Store order as `order:` metadata instead of an inline `:n` suffix.
    pub order_meta: bool,
    /// Never synthesize an order for tasks that have none.
    pub keep_empty_priority: bool,
    /// Consecutive blank lines that end a task body.
    pub blank_lines_to_end_task: usize,
    /// Literal line that always ends a task body.
    pub custom_card_terminator: Option<String>,
    /// Insert new tasks at the top of their list instead of the bottom.
    pub add_new_cards_to_top: bool,
    /// Treat `- [ ]` checkbox lines as task boundaries.
    pub add_checkbox_tasks: bool,
    /// Path patterns (regular expressions) excluded from repository scans.
    pub exclude: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lists: ["TODO", "DOING", "DONE"]
                .into_iter()
                .map(ListConfig::new)
                .collect(),
            token_prefix: DEFAULT_TOKEN_PREFIX.to_owned(),
            order_meta: false,
            keep_empty_priority: false,
            blank_lines_to_end_task: DEFAULT_BLANK_LINES_TO_END_TASK,
            custom_card_terminator: None,
            add_new_cards_to_top: false,
            add_checkbox_tasks: false,
            exclude: Vec::new(),
        }
    }
}

impl Config {
    /// Build a configuration with the given list names and default settings.
    pub fn with_lists<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lists: names.into_iter().map(ListConfig::new).collect(),
            ..Self::default()
        }
    }

    /// Whether `name` is a configured list that can own tasks.
    #[must_use]
    pub fn list_exists(&self, name: &str) -> bool {
        self.lists
            .iter()
            .any(|list| list.name == name && !list.is_virtual())
    }

    /// Look up a list definition by name.
    #[must_use]
    pub fn find_list(&self, name: &str) -> Option<&ListConfig> {
        self.lists.iter().find(|list| list.name == name)
    }

    /// Blank-line threshold, never below one.
    #[must_use]
    pub fn blank_lines_threshold(&self) -> usize {
        self.blank_lines_to_end_task.max(1)
    }
}
