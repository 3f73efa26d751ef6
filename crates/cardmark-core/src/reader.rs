//! Streaming task-boundary engine.
//!
//! A [`TaskReader`] pulls lines one at a time and hands out one task per
//! [`TaskReader::read_task`] call. The line that ends a task is never
//! consumed: it is kept as the seed of the next read, because it is often the
//! opening line of the next task.

use crate::comment::{ViewLine, project};
use crate::config::Config;
use crate::language::{Language, for_path};
use crate::syntax::{Match, Recognizers, checkbox_pad, in_backticks, list_marker_indent};
use crate::task::{CARD_CLOSE, CARD_OPEN, Task, TaskSource};
use crate::text::{is_blank, split_lines};
use std::path::Path;

/// Pull-based reader over the lines of one file.
pub struct TaskReader<I>
where
    I: Iterator<Item = ViewLine>,
{
    lines: I,
    seed: Option<(usize, ViewLine)>,
    next_line_no: usize,
    recognizers: Recognizers,
    source: TaskSource,
    code: bool,
    in_fence: bool,
    closed: bool,
    blank_threshold: usize,
    terminator: Option<String>,
    checkbox_boundaries: bool,
}

impl<I> TaskReader<I>
where
    I: Iterator<Item = ViewLine>,
{
    /// Read `lines` belonging to `path` (already projected for code files).
    pub fn new(lines: I, path: &Path, language: &'static Language, config: &Config) -> Self {
        Self {
            lines,
            seed: None,
            next_line_no: 1,
            recognizers: Recognizers::new(config),
            source: TaskSource {
                path: path.to_path_buf(),
                language: language.name,
            },
            code: language.is_code(),
            in_fence: false,
            closed: false,
            blank_threshold: config.blank_lines_threshold(),
            terminator: config
                .custom_card_terminator
                .as_deref()
                .map(str::trim)
                .filter(|term| !term.is_empty())
                .map(str::to_owned),
            checkbox_boundaries: config.add_checkbox_tasks,
        }
    }

    /// Stop reading; every later call to [`read_task`](Self::read_task)
    /// returns `None`.
    pub fn close(&mut self) {
        self.closed = true;
        self.seed = None;
    }

    fn next_line(&mut self) -> Option<(usize, ViewLine)> {
        if self.closed {
            return None;
        }
        if let Some(seed) = self.seed.take() {
            return Some(seed);
        }
        let line = self.lines.next()?;
        let no = self.next_line_no;
        self.next_line_no += 1;
        Some((no, line))
    }

    fn push_back(&mut self, line_no: usize, line: ViewLine) {
        self.seed = Some((line_no, line));
    }

    /// Read the next task, or `None` at end of input.
    pub fn read_task(&mut self) -> Option<Task> {
        loop {
            let (line_no, view) = self.next_line()?;
            if self.code {
                if view.span.is_none() {
                    continue;
                }
            } else {
                if is_fence(&view.text) {
                    self.in_fence = !self.in_fence;
                    continue;
                }
                if self.in_fence {
                    continue;
                }
            }
            let Some(found) = self.recognizers.parse(&view.text, self.code) else {
                continue;
            };
            return Some(self.read_body(line_no, &view, found));
        }
    }

    fn read_body(&mut self, line_no: usize, title: &ViewLine, found: Match) -> Task {
        let span = title.span;
        let card_tag = match self.next_line() {
            Some((_, next))
                if next.text.trim() == CARD_OPEN && (!self.code || next.span == span) =>
            {
                true
            }
            Some((no, next)) => {
                self.push_back(no, next);
                false
            }
            None => false,
        };

        let (description, card_closed) = if card_tag {
            self.read_card_body(span)
        } else {
            let own_checkbox = if self.checkbox_boundaries {
                checkbox_pad(&title.text)
            } else {
                None
            };
            let own_marker = list_marker_indent(&title.text);
            (self.read_loose_body(span, own_checkbox, own_marker), false)
        };

        let mut task = Task::from_match(
            found,
            &title.text,
            self.recognizers.token_prefix(),
            line_no,
            description,
            card_tag,
            self.source.clone(),
        );
        if card_tag && !card_closed {
            task.last_line -= 1;
        }
        task
    }

    /// Body between `<card>` and `</card>`; blank lines never end it, and
    /// neither does a `</card>` inside an open HTML comment.
    fn read_card_body(&mut self, span: Option<usize>) -> (Vec<String>, bool) {
        let mut description = Vec::new();
        let mut open_comments = 0usize;
        while let Some((no, line)) = self.next_line() {
            if self.code && line.span != span {
                self.push_back(no, line);
                return (description, false);
            }
            if open_comments == 0 && line.text.trim() == CARD_CLOSE {
                return (description, true);
            }
            open_comments = (open_comments + line.text.matches("<!--").count())
                .saturating_sub(line.text.matches("-->").count());
            description.push(line.text);
        }
        (description, false)
    }

    fn read_loose_body(
        &mut self,
        span: Option<usize>,
        own_checkbox: Option<usize>,
        own_marker: Option<usize>,
    ) -> Vec<String> {
        let mut description: Vec<String> = Vec::new();
        let mut blanks = 0;
        let mut fence = false;
        let mut open_backtick = false;

        while let Some((no, line)) = self.next_line() {
            if self.code && line.span != span {
                self.push_back(no, line);
                break;
            }
            let text = line.text.as_str();
            if !fence && self.ends_loose_body(text, own_checkbox, own_marker) {
                self.push_back(no, line);
                break;
            }

            if is_fence(text) {
                fence = !fence;
                blanks = 0;
            } else if is_blank(text) && !fence && !open_backtick {
                blanks += 1;
                description.push(line.text);
                if blanks >= self.blank_threshold {
                    break;
                }
                continue;
            } else {
                blanks = 0;
                if !fence && in_backticks(text, text.len()) {
                    open_backtick = !open_backtick;
                }
            }
            description.push(line.text);
        }

        while description.last().is_some_and(|line| is_blank(line)) {
            description.pop();
        }
        description
    }

    fn ends_loose_body(&self, text: &str, own_checkbox: Option<usize>, own_marker: Option<usize>) -> bool {
        if self
            .terminator
            .as_deref()
            .is_some_and(|term| text.trim() == term)
        {
            return true;
        }
        if self.recognizers.parse(text, self.code).is_some() {
            return true;
        }
        if let Some(own) = own_checkbox
            && checkbox_pad(text).is_some_and(|pad| pad <= own)
        {
            return true;
        }
        if let Some(own) = own_marker
            && list_marker_indent(text).is_some_and(|pad| pad <= own)
        {
            return true;
        }
        false
    }
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// Every task in `text`, in line order.
///
/// Code files are read through their comments; everything else is read as
/// markdown.
#[must_use]
pub fn extract_tasks(path: &Path, text: &str, config: &Config) -> Vec<Task> {
    let language = for_path(path);
    let view: Vec<ViewLine> = if language.is_code() {
        project(text, language)
    } else {
        split_lines(text).into_iter().map(ViewLine::plain).collect()
    };
    let mut reader = TaskReader::new(view.into_iter(), path, language, config);
    std::iter::from_fn(|| reader.read_task()).collect()
}
