//! In-memory model of one scanned file and the line edits applied to it.

use crate::comment::{LineFrame, ViewLine, continuation_prefix, project};
use crate::config::Config;
use crate::language::{Language, for_path};
use crate::reader::TaskReader;
use crate::task::Task;
use crate::text::{detect_eol, is_blank, join_terminated, split_lines, split_terminated};
use serde::Serialize;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// A file known to the index.
#[derive(Debug, Clone, Serialize)]
pub struct File {
    /// Path relative to the project root.
    pub path: PathBuf,
    /// Full text (empty for binary files).
    #[serde(skip)]
    pub content: String,
    /// SHA-256 of the content last read or written, hex encoded.
    pub checksum: Option<String>,
    /// Last known modification time.
    #[serde(with = "time::serde::rfc3339::option")]
    pub modified: Option<OffsetDateTime>,
    /// Creation time when the platform reports one.
    #[serde(with = "time::serde::rfc3339::option")]
    pub created: Option<OffsetDateTime>,
    /// Number of lines in [`content`](Self::content).
    pub line_count: usize,
    /// Comment syntax of the file.
    pub language: &'static Language,
    /// Binary files are tracked but never parsed.
    pub binary: bool,
    /// Content changed in memory and not yet written.
    pub dirty: bool,
    /// Tasks found in the content, in line order.
    pub tasks: Vec<Task>,
}

impl File {
    /// A text file with `content`.
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let path = path.into();
        let content = content.into();
        Self {
            language: for_path(&path),
            line_count: split_lines(&content).len(),
            path,
            content,
            checksum: None,
            modified: None,
            created: None,
            binary: false,
            dirty: false,
            tasks: Vec::new(),
        }
    }

    /// A binary file; its content is not kept.
    pub fn binary(path: impl Into<PathBuf>) -> Self {
        Self {
            binary: true,
            ..Self::new(path, String::new())
        }
    }

    /// Replace the content and mark the file dirty.
    pub fn set_content(&mut self, content: String) {
        self.line_count = split_lines(&content).len();
        self.content = content;
        self.dirty = true;
    }

    /// Re-read the tasks from the current content.
    pub fn extract_tasks(&mut self, config: &Config) -> &[Task] {
        self.tasks = if self.binary {
            Vec::new()
        } else {
            let mut reader = TaskReader::new(self.view().into_iter(), &self.path, self.language, config);
            std::iter::from_fn(|| reader.read_task()).collect()
        };
        &self.tasks
    }

    /// The lines a task reader sees.
    #[must_use]
    pub fn view(&self) -> Vec<ViewLine> {
        if self.language.is_code() {
            project(&self.content, self.language)
        } else {
            split_lines(&self.content)
                .into_iter()
                .map(ViewLine::plain)
                .collect()
        }
    }

    /// Path relative to the project root.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the title line of `task` is still where the task says it is.
    #[must_use]
    pub fn holds_task(&self, task: &Task) -> bool {
        let view = self.view();
        task.line
            .checked_sub(1)
            .and_then(|idx| view.get(idx))
            .is_some_and(|line| line.text == task.raw_title())
            && task.last_line <= view.len()
    }

    /// Replace the lines of `task` with `lines` (view text, unframed).
    ///
    /// Returns `false` without touching the content when the file no longer
    /// holds the task where it was read.
    pub fn replace_task_lines(&mut self, task: &Task, lines: &[String]) -> bool {
        if !self.holds_task(task) {
            return false;
        }
        let view = self.view();
        let start = task.line - 1;
        let end = task.last_line.max(task.line);
        let old_frames: Vec<LineFrame> = view[start..end].iter().map(|l| l.frame.clone()).collect();
        let continuation = LineFrame {
            prefix: continuation_prefix(&view, task.line, self.language),
            suffix: String::new(),
        };
        let (old_len, new_len) = (old_frames.len(), lines.len());
        // A closing token on the old last line follows the task's new last line.
        let moved_suffix = if new_len == old_len || new_len == 0 {
            None
        } else {
            old_frames
                .last()
                .map(|frame| frame.suffix.clone())
                .filter(|suffix| !suffix.trim().is_empty())
        };

        let mut rendered = Vec::with_capacity(new_len.max(old_len));
        for (idx, text) in lines.iter().enumerate() {
            let frame = old_frames.get(idx).unwrap_or(&continuation);
            let line = match &moved_suffix {
                Some(suffix) if idx + 1 == new_len => {
                    format!("{}{} {}", frame.prefix, text.trim_end(), suffix.trim_start())
                }
                Some(_) if idx + 1 == old_len => format!("{}{text}", frame.prefix).trim_end().to_owned(),
                _ if idx < old_len => frame.wrap(text),
                _ => format!("{}{text}", frame.prefix).trim_end().to_owned(),
            };
            rendered.push(line);
        }
        for (idx, frame) in old_frames.iter().enumerate().skip(new_len) {
            let mut frame = frame.clone();
            if moved_suffix.is_some() && idx + 1 == old_len {
                frame.suffix.clear();
            }
            if !is_removable(&frame, self.language) {
                rendered.push(frame.wrap("").trim_end().to_owned());
            }
        }
        self.splice(start, end, rendered);
        true
    }

    /// Remove the lines of `task`.
    pub fn delete_task_lines(&mut self, task: &Task) -> bool {
        self.replace_task_lines(task, &[])
    }

    /// Add `lines` for a new task at the top or bottom of the file.
    ///
    /// Returns the 1-based line number of the first added line.
    pub fn insert_task_lines(&mut self, lines: &[String], top: bool) -> usize {
        let eol = detect_eol(&self.content);
        let mut source = split_terminated(&self.content);
        let framed = lines
            .iter()
            .map(|line| (frame_new_line(line, self.language), eol.to_owned()));

        let first_line = if top {
            let mut block: Vec<(String, String)> = framed.collect();
            if source.first().is_some_and(|(line, _)| !is_blank(line)) {
                block.push((String::new(), eol.to_owned()));
            }
            source.splice(0..0, block);
            1
        } else {
            if source.last().is_some_and(|(line, _)| !is_blank(line)) && self.language.is_markdown() {
                source.push((String::new(), eol.to_owned()));
            }
            let at = source.len() + 1;
            source.extend(framed);
            at
        };
        self.set_content(join_terminated(&source, eol, true));
        first_line
    }

    /// Lines keep their own terminators; lines beyond the replaced range use
    /// the file's dominant one.
    fn splice(&mut self, start: usize, end: usize, rendered: Vec<String>) {
        let eol = detect_eol(&self.content);
        let trailing = self.content.ends_with('\n');
        let mut source = split_terminated(&self.content);
        let end = end.min(source.len());
        let start = start.min(end);
        let old_endings: Vec<String> = source[start..end].iter().map(|(_, own)| own.clone()).collect();
        let replacement: Vec<(String, String)> = rendered
            .into_iter()
            .enumerate()
            .map(|(idx, line)| {
                let own = old_endings
                    .get(idx)
                    .filter(|own| !own.is_empty())
                    .map_or_else(|| eol.to_owned(), Clone::clone);
                (line, own)
            })
            .collect();
        source.splice(start..end, replacement);
        self.set_content(join_terminated(&source, eol, trailing));
    }
}

fn is_removable(frame: &LineFrame, lang: &Language) -> bool {
    if !frame.suffix.trim().is_empty() {
        return false;
    }
    let prefix = frame.prefix.trim();
    if prefix.is_empty() {
        return true;
    }
    if lang.line.is_some_and(|token| prefix == token) {
        return true;
    }
    lang.block
        .and_then(|block| block.ignore)
        .is_some_and(|ignore| prefix == ignore)
}

fn frame_new_line(line: &str, lang: &Language) -> String {
    match (lang.line, lang.block) {
        (Some(token), _) => format!("{token} {line}"),
        (None, Some(block)) => format!("{} {line} {}", block.start, block.end),
        (None, None) => line.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, content: &str) -> File {
        let mut file = File::new(path, content);
        file.extract_tasks(&Config::default());
        file
    }

    #[test]
    fn extract_and_render_round_trip() {
        let content = "# Notes\n\n#TODO:10 first\nbody line\n\n\n[link](#DOING) after\n";
        let mut file = file("notes.md", content);
        assert_eq!(file.tasks.len(), 2);
        for task in file.tasks.clone() {
            assert!(file.replace_task_lines(&task, &task.render_lines()));
        }
        assert_eq!(file.content, content);
    }

    #[test]
    fn code_round_trip_keeps_comment_frames() {
        let content = "fn main() {\n    // #TODO:5 thing\n    //   detail\n    run();\n}\n";
        let mut file = file("main.rs", content);
        let task = file.tasks[0].clone();
        assert_eq!(task.description, vec!["  detail"]);
        assert!(file.replace_task_lines(&task, &task.render_lines()));
        assert_eq!(file.content, content);
    }

    #[test]
    fn growing_a_code_task_adds_comment_lines() {
        let content = "x();\n// #TODO thing\ny();\n";
        let mut file = file("a.js", content);
        let task = file.tasks[0].clone();
        let lines = vec![task.render_title(), "more".to_owned()];
        assert!(file.replace_task_lines(&task, &lines));
        assert_eq!(file.content, "x();\n// #TODO thing\n// more\ny();\n");
    }

    #[test]
    fn block_comment_suffix_moves_to_last_line() {
        let content = "/* #TODO thing */\n";
        let mut file = file("a.c", content);
        let task = file.tasks[0].clone();
        let lines = vec![task.render_title(), "more".to_owned()];
        assert!(file.replace_task_lines(&task, &lines));
        assert_eq!(file.content, "/* #TODO thing\n * more */\n");
    }

    #[test]
    fn edits_keep_mixed_line_endings() {
        let mut file = file("notes.md", "intro\r\n#TODO:10 a\nplain\n");
        let mut task = file.tasks[0].clone();
        task.text = "b".into();
        assert!(file.replace_task_lines(&task, &task.render_lines()));
        assert_eq!(file.content, "intro\r\n#TODO:10 b\nplain\n");

        let mut file = File::new("notes.md", "one\r\ntwo\n");
        file.insert_task_lines(&["#TODO c".to_owned()], false);
        assert_eq!(file.content, "one\r\ntwo\n\r\n#TODO c\r\n");
    }

    #[test]
    fn stale_task_is_rejected() {
        let mut file = file("notes.md", "#TODO a\n");
        let task = file.tasks[0].clone();
        file.set_content("something else\n".into());
        assert!(!file.replace_task_lines(&task, &task.render_lines()));
        assert_eq!(file.content, "something else\n");
    }

    #[test]
    fn delete_removes_task_lines() {
        let mut file = file("notes.md", "#TODO a\nbody\n\n\n#TODO b\n");
        let task = file.tasks[0].clone();
        assert!(file.delete_task_lines(&task));
        assert_eq!(file.content, "\n\n#TODO b\n");
    }

    #[test]
    fn delete_keeps_block_delimiters() {
        let mut file = file("a.c", "/* #TODO a\n * b */\nint x;\n");
        let task = file.tasks[0].clone();
        assert!(file.delete_task_lines(&task));
        assert!(file.content.starts_with("/*"));
        assert!(file.content.contains("*/"));
    }

    #[test]
    fn insert_adds_separated_lines() {
        let mut file = File::new("notes.md", "#TODO a\n");
        let at = file.insert_task_lines(&["#TODO b".to_owned()], false);
        assert_eq!(at, 3);
        assert_eq!(file.content, "#TODO a\n\n#TODO b\n");
        assert!(file.dirty);

        let at = file.insert_task_lines(&["#DOING c".to_owned()], true);
        assert_eq!(at, 1);
        assert!(file.content.starts_with("#DOING c\n\n#TODO a"));
    }

    #[test]
    fn binary_files_have_no_tasks() {
        let mut file = File::binary("image.png");
        assert!(file.extract_tasks(&Config::default()).is_empty());
    }
}
