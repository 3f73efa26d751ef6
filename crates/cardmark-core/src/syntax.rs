//! Task notations recognised on a single line.
//!
//! Each notation is matched independently and the first hit in precedence
//! order wins: hash-tag (inline or metadata order), markdown link, then the
//! code-comment style. Checkbox and list-item markers never start tasks; the
//! reader uses them to find where a task body ends.

use crate::config::Config;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::ops::Range;

#[allow(clippy::expect_used)]
static HASH_BODY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9_-]{2,})(:(-?[\d.]+(?:e-?\d+)?)?)?[ \t]+(\S.*?)[ \t]*$")
        .expect("valid hash task regex")
});

#[allow(clippy::expect_used)]
static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\]]+)\]\(#([A-Za-z0-9_-]{2,})(:(-?[\d.]+(?:e-?\d+)?)?)?\)")
        .expect("valid link task regex")
});

#[allow(clippy::expect_used)]
static CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*)([A-Z][A-Z0-9_-]+)(:(-?[\d.]+(?:e-?\d+)?)?)?[ \t]+(\S.*?)[ \t]*$")
        .expect("valid code task regex")
});

#[allow(clippy::expect_used)]
static CHECKBOX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)[-*] \[[ xX]\][ \t]").expect("valid checkbox regex"));

#[allow(clippy::expect_used)]
static LIST_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*)(?:[-*+]|\d+[.)])[ \t]+").expect("valid list marker regex")
});

/// Notation a task was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// `#LIST:10 title`, order inline.
    Hash,
    /// `#LIST title`, order kept in `order:` metadata.
    HashMeta,
    /// `[title](#LIST:10)`.
    Link,
    /// `LIST: title` at the start of a code comment.
    Code,
}

/// A task opening line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    /// Notation that matched.
    pub kind: TaskKind,
    /// List name from the token.
    pub list: String,
    /// Inline order, when present and numeric.
    pub order: Option<f64>,
    /// Inline order exactly as written.
    pub order_literal: Option<String>,
    /// Whether the token carried a `:` separator.
    pub has_colon: bool,
    /// Title text.
    pub text: String,
    /// Text on the line before the task.
    pub before_text: String,
    /// Byte range of the token (prefix, list, separator and order).
    pub token: Range<usize>,
    /// Byte range of the title text.
    pub text_range: Range<usize>,
}

/// Line matchers bound to one configuration.
#[derive(Debug, Clone)]
pub struct Recognizers {
    lists: Vec<String>,
    token_prefix: String,
    order_meta: bool,
}

impl Recognizers {
    /// Capture the settings the matchers depend on.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let token_prefix = if config.token_prefix.is_empty() {
            crate::config::DEFAULT_TOKEN_PREFIX.to_owned()
        } else {
            config.token_prefix.clone()
        };
        Self {
            lists: config
                .lists
                .iter()
                .filter(|list| !list.is_virtual())
                .map(|list| list.name.clone())
                .collect(),
            token_prefix,
            order_meta: config.order_meta,
        }
    }

    /// Prefix used by hash-tag tokens.
    #[must_use]
    pub fn token_prefix(&self) -> &str {
        &self.token_prefix
    }

    fn is_list(&self, name: &str) -> bool {
        self.lists.iter().any(|list| list == name)
    }

    /// Recognise a task opening on `line`.
    ///
    /// `code` enables the comment-only notation; pass `true` only for lines
    /// projected out of a source-code comment.
    #[must_use]
    pub fn parse(&self, line: &str, code: bool) -> Option<Match> {
        self.parse_hash(line)
            .or_else(|| self.parse_link(line))
            .or_else(|| if code { self.parse_code(line) } else { None })
    }

    fn parse_hash(&self, line: &str) -> Option<Match> {
        let prefix = self.token_prefix.as_str();
        for (idx, _) in line.match_indices(prefix) {
            let blocked = line[..idx]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '/');
            if blocked || in_backticks(line, idx) {
                continue;
            }
            let body_start = idx + prefix.len();
            let Some(caps) = HASH_BODY_RE.captures(&line[body_start..]) else {
                continue;
            };
            let (Some(list), Some(text)) = (caps.get(1), caps.get(4)) else {
                continue;
            };
            if !self.is_list(list.as_str()) {
                continue;
            }
            let token_end = caps.get(2).map_or(list.end(), |sep| sep.end());
            let literal = caps.get(3).map(|m| m.as_str().to_owned());
            let kind = if self.order_meta {
                TaskKind::HashMeta
            } else {
                TaskKind::Hash
            };
            return Some(Match {
                kind,
                list: list.as_str().to_owned(),
                order: match kind {
                    TaskKind::Hash => literal.as_deref().and_then(parse_order),
                    _ => None,
                },
                order_literal: literal,
                has_colon: caps.get(2).is_some(),
                text: text.as_str().to_owned(),
                before_text: line[..idx].to_owned(),
                token: idx..body_start + token_end,
                text_range: body_start + text.start()..body_start + text.end(),
            });
        }
        None
    }

    fn parse_link(&self, line: &str) -> Option<Match> {
        LINK_RE.captures_iter(line).find_map(|caps| {
            let whole = caps.get(0)?;
            let text = caps.get(1)?;
            let list = caps.get(2)?;
            if !self.is_list(list.as_str()) || in_backticks(line, whole.start()) {
                return None;
            }
            let literal = caps.get(4).map(|m| m.as_str().to_owned());
            Some(Match {
                kind: TaskKind::Link,
                list: list.as_str().to_owned(),
                order: literal.as_deref().and_then(parse_order),
                order_literal: literal,
                has_colon: caps.get(3).is_some(),
                text: text.as_str().to_owned(),
                before_text: line[..whole.start()].to_owned(),
                // `#` sits right before the list name.
                token: list.start() - 1..caps.get(3).map_or(list.end(), |sep| sep.end()),
                text_range: text.range(),
            })
        })
    }

    fn parse_code(&self, line: &str) -> Option<Match> {
        let caps = CODE_RE.captures(line)?;
        let list = caps.get(2)?;
        let text = caps.get(5)?;
        if !self.is_list(list.as_str()) {
            return None;
        }
        let literal = caps.get(4).map(|m| m.as_str().to_owned());
        Some(Match {
            kind: TaskKind::Code,
            list: list.as_str().to_owned(),
            order: literal.as_deref().and_then(parse_order),
            order_literal: literal,
            has_colon: caps.get(3).is_some(),
            text: text.as_str().to_owned(),
            before_text: line[..list.start()].to_owned(),
            token: list.start()..caps.get(3).map_or(list.end(), |sep| sep.end()),
            text_range: text.range(),
        })
    }
}

/// Leading whitespace width of a `- [ ]` checkbox line.
#[must_use]
pub fn checkbox_pad(line: &str) -> Option<usize> {
    CHECKBOX_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|pad| pad.len())
}

/// Leading whitespace width of a markdown list item.
#[must_use]
pub fn list_marker_indent(line: &str) -> Option<usize> {
    LIST_MARKER_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|pad| pad.len())
}

/// Column where the body of a markdown list item starts.
#[must_use]
pub fn list_body_indent(line: &str) -> Option<usize> {
    LIST_MARKER_RE.find(line).map(|marker| marker.end())
}

/// Whether byte offset `idx` sits inside an inline backtick span.
#[must_use]
pub fn in_backticks(line: &str, idx: usize) -> bool {
    line[..idx].bytes().filter(|b| *b == b'`').count() % 2 == 1
}

/// Parse an order literal; non-finite values are rejected.
#[must_use]
pub fn parse_order(literal: &str) -> Option<f64> {
    literal.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Canonical text form of an order.
#[must_use]
pub fn format_order(order: f64) -> String {
    if order == 0.0 {
        "0".to_owned()
    } else {
        order.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recognizers() -> Recognizers {
        Recognizers::new(&Config::default())
    }

    #[test]
    fn hash_task_with_order() {
        let m = recognizers()
            .parse("## #TODO:10 Write the docs", false)
            .unwrap_or_else(|| panic!("hash task must match"));
        assert_eq!(m.kind, TaskKind::Hash);
        assert_eq!(m.list, "TODO");
        assert_eq!(m.order, Some(10.0));
        assert_eq!(m.order_literal.as_deref(), Some("10"));
        assert!(m.has_colon);
        assert_eq!(m.text, "Write the docs");
        assert_eq!(m.before_text, "## ");
        assert_eq!(&"## #TODO:10 Write the docs"[m.token.clone()], "#TODO:10");
    }

    #[test]
    fn hash_task_colon_without_order() {
        let line = "#DOING: A";
        let m = recognizers()
            .parse(line, false)
            .unwrap_or_else(|| panic!("hash task must match"));
        assert!(m.has_colon);
        assert!(m.order.is_none());
        assert_eq!(&line[m.token], "#DOING:");
        assert_eq!(m.text, "A");
    }

    #[test]
    fn unconfigured_lists_are_plain_text() {
        assert!(recognizers().parse("#BACKLOG do it", false).is_none());
        assert!(recognizers().parse("#todo lower case", false).is_none());
    }

    #[test]
    fn url_fragments_and_code_spans_are_not_tasks() {
        let r = recognizers();
        assert!(r.parse("see http://host/page#TODO later", false).is_none());
        assert!(r.parse("word#TODO nope", false).is_none());
        assert!(r.parse("use `#TODO thing` literally", false).is_none());
    }

    #[test]
    fn order_meta_mode_reads_no_inline_order() {
        let config = Config {
            order_meta: true,
            ..Config::default()
        };
        let m = Recognizers::new(&config)
            .parse("#TODO:5 thing", false)
            .unwrap_or_else(|| panic!("hash task must match"));
        assert_eq!(m.kind, TaskKind::HashMeta);
        assert!(m.order.is_none());
        assert_eq!(m.order_literal.as_deref(), Some("5"));
    }

    #[test]
    fn link_task_captures_leading_text() {
        let line = "- [Ship it](#DONE:2.5) now";
        let m = recognizers()
            .parse(line, false)
            .unwrap_or_else(|| panic!("link task must match"));
        assert_eq!(m.kind, TaskKind::Link);
        assert_eq!(m.text, "Ship it");
        assert_eq!(m.order, Some(2.5));
        assert_eq!(m.before_text, "- ");
        assert_eq!(&line[m.token], "#DONE:2.5");
    }

    #[test]
    fn code_style_only_in_code_comments() {
        let r = recognizers();
        assert!(r.parse("TODO: refactor", false).is_none());
        let m = r
            .parse("TODO: refactor", true)
            .unwrap_or_else(|| panic!("code task must match"));
        assert_eq!(m.kind, TaskKind::Code);
        assert_eq!(m.text, "refactor");
        assert!(m.has_colon);
        assert!(r.parse("call TODO: later", true).is_none());
    }

    #[test]
    fn custom_token_prefix() {
        let config = Config {
            token_prefix: "@@".into(),
            ..Config::default()
        };
        let r = Recognizers::new(&config);
        assert!(r.parse("#TODO thing", false).is_none());
        let m = r
            .parse("@@TODO thing", false)
            .unwrap_or_else(|| panic!("prefixed task must match"));
        assert_eq!(m.token, 0..6);
    }

    #[test]
    fn boundary_markers() {
        assert_eq!(checkbox_pad("  - [ ] item"), Some(2));
        assert_eq!(checkbox_pad("- [x] done"), Some(0));
        assert_eq!(checkbox_pad("- item"), None);
        assert_eq!(list_marker_indent("   1. item"), Some(3));
        assert_eq!(list_marker_indent("text"), None);
    }

    #[test]
    fn order_formatting() {
        assert_eq!(format_order(10.0), "10");
        assert_eq!(format_order(-0.0), "0");
        assert_eq!(format_order(2.5), "2.5");
        assert_eq!(parse_order("1e-3"), Some(0.001));
        assert_eq!(parse_order("1.2.3"), None);
    }
}
