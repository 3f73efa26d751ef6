//! `key:value` metadata, `+tags` and `@contexts` found in task text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Metadata key holding a task's order when orders live in metadata.
pub const ORDER_KEY: &str = "order";

#[allow(clippy::expect_used)]
static META_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|\s)([A-Za-z0-9_.-]+):("[^"]*"|[^\s"]+)"#).expect("valid metadata regex")
});

#[allow(clippy::expect_used)]
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)\+([\w./-]+)").expect("valid tag regex"));

#[allow(clippy::expect_used)]
static CONTEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)@([\w./-]+)").expect("valid context regex"));

#[allow(clippy::expect_used)]
static ORDER_ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(^|\s)order:("[^"]*"|[^\s"]+?)(-->|\s|$)"#).expect("valid order entry regex")
});

/// Ordered metadata: keys keep first-seen order and values keep declaration
/// order, repeats included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Meta {
    entries: Vec<(String, Vec<String>)>,
}

impl Meta {
    /// Append `value` under `key`.
    pub fn push(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key.to_owned(), vec![value])),
        }
    }

    /// Replace every value of `key` with `value`.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.remove(key);
        self.push(key, value);
    }

    /// Drop `key` entirely.
    pub fn remove(&mut self, key: &str) {
        self.entries.retain(|(k, _)| k != key);
    }

    /// All values of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map_or(&[], |(_, values)| values.as_slice())
    }

    /// First value of `key`.
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).first().map(String::as_str)
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Iterate `(key, values)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    /// Whether no metadata was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collect metadata pairs from `line` into `meta`.
pub fn parse_meta_into(line: &str, meta: &mut Meta) {
    for caps in META_RE.captures_iter(line) {
        let (Some(key), Some(raw)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let raw = raw.as_str();
        // `http://…` and friends.
        if raw.starts_with("//") {
            continue;
        }
        let value = if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
            &raw[1..raw.len() - 1]
        } else {
            raw.strip_suffix("-->").unwrap_or(raw)
        };
        if value.is_empty() {
            continue;
        }
        meta.push(key.as_str(), value);
    }
}

/// Collect `+tags` from `line`, skipping duplicates.
pub fn parse_tags_into(line: &str, tags: &mut Vec<String>) {
    collect_unique(&TAG_RE, line, tags);
}

/// Collect `@contexts` from `line`, skipping duplicates.
pub fn parse_contexts_into(line: &str, contexts: &mut Vec<String>) {
    collect_unique(&CONTEXT_RE, line, contexts);
}

fn collect_unique(re: &Regex, line: &str, out: &mut Vec<String>) {
    for caps in re.captures_iter(line) {
        if let Some(name) = caps.get(1) {
            let name = name.as_str().trim_end_matches(['.', '/']);
            if !name.is_empty() && !out.iter().any(|existing| existing == name) {
                out.push(name.to_owned());
            }
        }
    }
}

/// Replace the value of every `order:` entry on `line`.
///
/// Returns `None` when the line has no order entry.
#[must_use]
pub fn replace_order_entry(line: &str, value: &str) -> Option<String> {
    if !ORDER_ENTRY_RE.is_match(line) {
        return None;
    }
    Some(
        ORDER_ENTRY_RE
            .replace_all(line, |caps: &regex::Captures<'_>| {
                let lead = caps.get(1).map_or("", |m| m.as_str());
                let tail = caps.get(3).map_or("", |m| m.as_str());
                format!("{lead}order:{value}{tail}")
            })
            .into_owned(),
    )
}

/// Remove every `order:` entry from `line`.
///
/// Returns `None` when the line has no order entry.
#[must_use]
pub fn strip_order_entry(line: &str) -> Option<String> {
    if !ORDER_ENTRY_RE.is_match(line) {
        return None;
    }
    let stripped = ORDER_ENTRY_RE.replace_all(line, |caps: &regex::Captures<'_>| {
        let tail = caps.get(3).map_or("", |m| m.as_str());
        if tail == "-->" {
            " -->".to_owned()
        } else {
            caps.get(1).map_or("", |m| m.as_str()).to_owned()
        }
    });
    Some(stripped.trim_end().replace("  -->", " -->"))
}

/// Whether a line holds nothing but an empty HTML comment.
#[must_use]
pub fn is_empty_comment(line: &str) -> bool {
    line.trim()
        .strip_prefix("<!--")
        .and_then(|rest| rest.strip_suffix("-->"))
        .is_some_and(|body| body.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_keeps_declaration_order_and_repeats() {
        let mut meta = Meta::default();
        parse_meta_into("due:2024-01-01 owner:ann", &mut meta);
        parse_meta_into("<!-- owner:bob note:\"two words\" -->", &mut meta);
        let keys: Vec<_> = meta.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["due", "owner", "note"]);
        assert_eq!(meta.get("owner"), ["ann".to_owned(), "bob".to_owned()]);
        assert_eq!(meta.first("note"), Some("two words"));
    }

    #[test]
    fn meta_skips_urls_and_strips_comment_close() {
        let mut meta = Meta::default();
        parse_meta_into("see https://example.com <!-- order:10-->", &mut meta);
        assert!(!meta.contains_key("https"));
        assert_eq!(meta.first(ORDER_KEY), Some("10"));
    }

    #[test]
    fn tags_and_contexts() {
        let mut tags = Vec::new();
        let mut contexts = Vec::new();
        let line = "fix it +bug +ui @home +bug a+b";
        parse_tags_into(line, &mut tags);
        parse_contexts_into(line, &mut contexts);
        assert_eq!(tags, vec!["bug", "ui"]);
        assert_eq!(contexts, vec!["home"]);
    }

    #[test]
    fn order_entries_are_rewritten_in_place() {
        assert_eq!(
            replace_order_entry("<!-- due:1 order:5 -->", "20").as_deref(),
            Some("<!-- due:1 order:20 -->")
        );
        assert_eq!(
            replace_order_entry("<!-- order:5-->", "7").as_deref(),
            Some("<!-- order:7-->")
        );
        assert!(replace_order_entry("<!-- due:1 -->", "7").is_none());
    }

    #[test]
    fn order_entries_are_stripped() {
        assert_eq!(
            strip_order_entry("<!-- due:1 order:5 -->").as_deref(),
            Some("<!-- due:1 -->")
        );
        let stripped = strip_order_entry("<!-- order:5 -->").unwrap_or_default();
        assert!(is_empty_comment(&stripped));
    }
}
