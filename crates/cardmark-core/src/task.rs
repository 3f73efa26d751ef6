//! The task record and its rendering back to text.

use crate::config::Config;
use crate::id::TaskId;
use crate::meta::{self, Meta, ORDER_KEY};
use crate::syntax::{Match, TaskKind, format_order, parse_order};
use serde::Serialize;
use std::cmp::Ordering;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Line opening a card-tag body.
pub const CARD_OPEN: &str = "<card>";
/// Line closing a card-tag body.
pub const CARD_CLOSE: &str = "</card>";

/// Where a task was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSource {
    /// Path relative to the project root.
    pub path: PathBuf,
    /// Language name of the file.
    pub language: &'static str,
}

/// The title line as it was read, kept so rendering only touches the parts
/// that changed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TitleLine {
    raw: String,
    token: Range<usize>,
    text: Range<usize>,
    token_prefix: String,
}

/// One extracted unit of work.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    /// Stable identifier derived from the task's location.
    pub id: TaskId,
    /// Owning list.
    pub list: String,
    /// Title text with the task token removed.
    pub text: String,
    /// Sort position.
    pub order: Option<f64>,
    /// First line (1-based).
    pub line: usize,
    /// Last line (1-based, inclusive).
    pub last_line: usize,
    /// Body lines, raw.
    pub description: Vec<String>,
    /// Metadata from the title and body.
    pub meta: Meta,
    /// `+tags` from the title and body.
    pub tags: Vec<String>,
    /// `@contexts` from the title and body.
    pub context: Vec<String>,
    /// Origin file.
    pub source: TaskSource,
    /// Notation the task was written in.
    pub kind: TaskKind,
    /// Whether the token carries a `:` separator.
    pub has_colon: bool,
    /// Inline order exactly as written.
    pub order_literal: Option<String>,
    /// Text before the task on its title line.
    pub before_text: String,
    /// Whether the body is wrapped in `<card>` tags.
    pub card_tag: bool,
    #[serde(skip)]
    title: TitleLine,
}

impl Task {
    /// Build a task from a recognised title line and its body.
    #[must_use]
    pub fn from_match(
        found: Match,
        raw_title: &str,
        token_prefix: &str,
        line: usize,
        description: Vec<String>,
        card_tag: bool,
        source: TaskSource,
    ) -> Self {
        let prefix = match found.kind {
            TaskKind::Hash | TaskKind::HashMeta => token_prefix,
            TaskKind::Link => "#",
            TaskKind::Code => "",
        };
        let mut task = Self {
            id: TaskId::from_location(&source.path, line),
            list: found.list,
            text: found.text,
            order: found.order,
            line,
            last_line: line,
            description,
            meta: Meta::default(),
            tags: Vec::new(),
            context: Vec::new(),
            source,
            kind: found.kind,
            has_colon: found.has_colon,
            order_literal: found.order_literal,
            before_text: found.before_text,
            card_tag,
            title: TitleLine {
                raw: raw_title.to_owned(),
                token: found.token,
                text: found.text_range,
                token_prefix: prefix.to_owned(),
            },
        };
        task.refresh_details();
        task.last_line = line + task.span_len() - 1;
        task
    }

    /// Re-derive metadata, tags and contexts after the text changed.
    ///
    /// Metadata-order tasks also re-read their order here.
    pub fn refresh_details(&mut self) {
        let mut meta = Meta::default();
        let mut tags = Vec::new();
        let mut context = Vec::new();
        for line in std::iter::once(&self.text).chain(self.description.iter()) {
            meta::parse_meta_into(line, &mut meta);
            meta::parse_tags_into(line, &mut tags);
            meta::parse_contexts_into(line, &mut context);
        }
        if self.kind == TaskKind::HashMeta || self.order_literal.is_none() {
            if let Some(order) = meta.first(ORDER_KEY).and_then(parse_order) {
                self.order = Some(order);
            } else if self.kind == TaskKind::HashMeta {
                self.order = None;
            }
        }
        self.meta = meta;
        self.tags = tags;
        self.context = context;
    }

    /// Number of lines the task occupies when rendered.
    #[must_use]
    pub fn span_len(&self) -> usize {
        1 + self.description.len() + if self.card_tag { 2 } else { 0 }
    }

    /// The token as it should be written now.
    #[must_use]
    pub fn token(&self) -> String {
        let mut token = format!("{}{}", self.title.token_prefix, self.list);
        if self.has_colon {
            token.push(':');
        }
        if let Some(literal) = &self.order_literal {
            token.push_str(literal);
        }
        token
    }

    /// Render the title line, touching only the token and title text.
    #[must_use]
    pub fn render_title(&self) -> String {
        let raw = &self.title.raw;
        let token = self.token();
        let mut edits = [
            (self.title.token.clone(), token.as_str()),
            (self.title.text.clone(), self.text.as_str()),
        ];
        edits.sort_by_key(|(range, _)| range.start);
        let mut out = String::with_capacity(raw.len() + 8);
        let mut cursor = 0;
        for (range, replacement) in edits {
            let start = range.start.clamp(cursor, raw.len());
            out.push_str(&raw[cursor..start]);
            out.push_str(replacement);
            cursor = range.end.clamp(start, raw.len());
        }
        out.push_str(&raw[cursor..]);
        out
    }

    /// Render every line of the task (title, card tags, body).
    #[must_use]
    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.span_len());
        lines.push(self.render_title());
        if self.card_tag {
            lines.push(CARD_OPEN.to_owned());
        }
        lines.extend(self.description.iter().cloned());
        if self.card_tag {
            lines.push(CARD_CLOSE.to_owned());
        }
        lines
    }

    /// Raw title line as it was read.
    #[must_use]
    pub fn raw_title(&self) -> &str {
        &self.title.raw
    }

    /// Path of the owning file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.source.path
    }

    /// Whether the task still has an order of its own in the text.
    #[must_use]
    pub const fn has_order(&self) -> bool {
        self.order.is_some()
    }
}

/// Sort by order (ordered tasks first), then title text.
///
/// The sort is stable, so tasks that compare equal keep file order.
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(compare_tasks);
}

fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    match (a.order, b.order) {
        (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.text.cmp(&b.text)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Lines for a brand new task in the configured notation.
///
/// Code files only ever get the plain comment-style body; framing the lines
/// as comments is up to the caller.
#[must_use]
pub fn new_task_lines(config: &Config, list: &str, text: &str, order: Option<f64>, markdown: bool) -> Vec<String> {
    let prefix = if config.token_prefix.is_empty() {
        crate::config::DEFAULT_TOKEN_PREFIX
    } else {
        config.token_prefix.as_str()
    };
    match (order, config.order_meta) {
        (Some(order), false) => vec![format!("{prefix}{list}:{} {text}", format_order(order))],
        (Some(order), true) => {
            let entry = format!("{ORDER_KEY}:{}", format_order(order));
            let meta_line = if markdown {
                format!("<!-- {entry} -->")
            } else {
                entry
            };
            vec![format!("{prefix}{list} {text}"), meta_line]
        }
        (None, _) => vec![format!("{prefix}{list} {text}")],
    }
}
