//! Comment extraction for source-code files.
//!
//! Extraction is two pure steps: [`comment_spans`] walks the raw text once and
//! returns every comment with the byte range of its body on each line, then
//! [`project`] maps each source line onto a comment-only view. Lines outside
//! comments become empty, so task recognition only ever sees commented text.
//!
//! Line numbers are preserved one-to-one between the source and the view.

use crate::language::Language;
use crate::text::split_lines;

/// Syntax that produced a comment span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    /// Consecutive line comments (`// …`).
    Line,
    /// One block comment (`/* … */`).
    Block,
}

/// Body of a comment on one source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentLine {
    /// 1-based source line.
    pub line: usize,
    /// Byte offset where the body starts (after the opening token).
    pub start: usize,
    /// Byte offset where the body ends (before the closing token).
    pub end: usize,
}

/// A contiguous comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentSpan {
    /// Comment syntax.
    pub kind: CommentKind,
    /// First source line (1-based).
    pub begin_line: usize,
    /// Last source line (1-based, inclusive).
    pub end_line: usize,
    /// Body ranges, one per covered line.
    pub lines: Vec<CommentLine>,
}

impl CommentSpan {
    fn line_body(&self, line: usize) -> Option<&CommentLine> {
        self.lines.iter().find(|body| body.line == line)
    }
}

/// Source text that surrounds the visible part of a commented line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineFrame {
    /// Everything before the view text (code, comment token, decoration).
    pub prefix: String,
    /// Everything after the view text (closing token, trailing code).
    pub suffix: String,
}

impl LineFrame {
    /// Wrap `text` back into its source form.
    #[must_use]
    pub fn wrap(&self, text: &str) -> String {
        let mut out = String::with_capacity(self.prefix.len() + text.len() + self.suffix.len());
        out.push_str(&self.prefix);
        out.push_str(text);
        out.push_str(&self.suffix);
        out
    }
}

/// One line of the comment-only view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewLine {
    /// Comment-relative text (empty outside comments).
    pub text: String,
    /// Index of the governing comment span.
    pub span: Option<usize>,
    /// Source text around [`text`](Self::text).
    pub frame: LineFrame,
}

impl ViewLine {
    /// A markdown line, used verbatim.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            span: None,
            frame: LineFrame::default(),
        }
    }
}

#[derive(Clone, Copy)]
enum ScanState {
    Code,
    Str(char),
    Block,
}

struct OpenBlock {
    begin_line: usize,
    seg_start: usize,
    lines: Vec<CommentLine>,
}

/// Compute every comment span in `text` for `lang`.
///
/// String literals are skipped so comment tokens inside them are ignored.
/// Consecutive line comments merge into one span. An unterminated block
/// comment runs to the end of the text.
#[must_use]
pub fn comment_spans(text: &str, lang: &Language) -> Vec<CommentSpan> {
    let mut spans: Vec<CommentSpan> = Vec::new();
    let mut state = ScanState::Code;
    let mut open: Option<OpenBlock> = None;
    let mut line = 1;
    let mut line_start = 0;
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];
        let Some(ch) = rest.chars().next() else {
            break;
        };
        match state {
            ScanState::Code => {
                if let Some(block) = lang.block
                    && rest.starts_with(block.start)
                {
                    let body = i + block.start.len();
                    open = Some(OpenBlock {
                        begin_line: line,
                        seg_start: body - line_start,
                        lines: Vec::new(),
                    });
                    state = ScanState::Block;
                    i = body;
                    continue;
                }
                if let Some(token) = lang.line
                    && rest.starts_with(token)
                {
                    let eol = rest.find('\n').map_or(text.len(), |n| i + n);
                    let body = CommentLine {
                        line,
                        start: i + token.len() - line_start,
                        end: trim_cr(text, line_start, eol) - line_start,
                    };
                    push_line_comment(&mut spans, body);
                    i = eol;
                    continue;
                }
                if ch == '\n' {
                    line += 1;
                    line_start = i + 1;
                } else if lang.quotes.contains(&ch) {
                    state = ScanState::Str(ch);
                }
                i += ch.len_utf8();
            }
            ScanState::Str(quote) => {
                if ch == '\\' {
                    i += 1;
                    if let Some(escaped) = text[i..].chars().next() {
                        if escaped == '\n' {
                            line += 1;
                            line_start = i + 1;
                        }
                        i += escaped.len_utf8();
                    }
                    continue;
                }
                if ch == quote {
                    state = ScanState::Code;
                } else if ch == '\n' {
                    line += 1;
                    line_start = i + 1;
                    // Only template literals may span lines.
                    if quote != '`' {
                        state = ScanState::Code;
                    }
                }
                i += ch.len_utf8();
            }
            ScanState::Block => {
                let Some(block) = lang.block else {
                    state = ScanState::Code;
                    continue;
                };
                if rest.starts_with(block.end) {
                    if let Some(mut current) = open.take() {
                        current.lines.push(CommentLine {
                            line,
                            start: current.seg_start,
                            end: i - line_start,
                        });
                        spans.push(CommentSpan {
                            kind: CommentKind::Block,
                            begin_line: current.begin_line,
                            end_line: line,
                            lines: current.lines,
                        });
                    }
                    state = ScanState::Code;
                    i += block.end.len();
                    continue;
                }
                if ch == '\n' {
                    if let Some(current) = open.as_mut() {
                        current.lines.push(CommentLine {
                            line,
                            start: current.seg_start,
                            end: trim_cr(text, line_start, i) - line_start,
                        });
                        current.seg_start = 0;
                    }
                    line += 1;
                    line_start = i + 1;
                }
                i += ch.len_utf8();
            }
        }
    }

    if let Some(mut current) = open {
        if line_start < text.len() || current.begin_line == line {
            current.lines.push(CommentLine {
                line,
                start: current.seg_start,
                end: trim_cr(text, line_start, text.len()) - line_start,
            });
        }
        let end_line = current.lines.last().map_or(current.begin_line, |l| l.line);
        spans.push(CommentSpan {
            kind: CommentKind::Block,
            begin_line: current.begin_line,
            end_line,
            lines: current.lines,
        });
    }

    spans
}

fn trim_cr(text: &str, line_start: usize, end: usize) -> usize {
    if end > line_start && text.as_bytes().get(end - 1) == Some(&b'\r') {
        end - 1
    } else {
        end
    }
}

fn push_line_comment(spans: &mut Vec<CommentSpan>, body: CommentLine) {
    if let Some(last) = spans.last_mut()
        && last.kind == CommentKind::Line
        && last.end_line + 1 == body.line
    {
        last.end_line = body.line;
        last.lines.push(body);
        return;
    }
    spans.push(CommentSpan {
        kind: CommentKind::Line,
        begin_line: body.line,
        end_line: body.line,
        lines: vec![body],
    });
}

/// Map each 0-based line index to the span covering it.
///
/// When two comments share a line the first one wins.
#[must_use]
pub fn span_lookup(spans: &[CommentSpan], line_count: usize) -> Vec<Option<usize>> {
    let mut lookup = vec![None; line_count];
    for (idx, span) in spans.iter().enumerate() {
        for body in &span.lines {
            if let Some(slot) = body.line.checked_sub(1).and_then(|i| lookup.get_mut(i))
                && slot.is_none()
            {
                *slot = Some(idx);
            }
        }
    }
    lookup
}

/// Project `text` onto its comment-only view.
#[must_use]
pub fn project(text: &str, lang: &Language) -> Vec<ViewLine> {
    let raw_lines = split_lines(text);
    let spans = comment_spans(text, lang);
    let lookup = span_lookup(&spans, raw_lines.len());

    raw_lines
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            let Some(span_idx) = lookup.get(idx).copied().flatten() else {
                return ViewLine::default();
            };
            let Some(span) = spans.get(span_idx) else {
                return ViewLine::default();
            };
            let Some(body) = span.line_body(idx + 1) else {
                return ViewLine::default();
            };
            let start = body.start.min(raw.len());
            let end = body.end.clamp(start, raw.len());
            let content = raw.get(start..end).unwrap_or_default();
            let first = span.begin_line == idx + 1;
            let skip = marker_width(content, span.kind, first, lang);
            ViewLine {
                text: content[skip..].to_owned(),
                span: Some(span_idx),
                frame: LineFrame {
                    prefix: raw[..start + skip].to_owned(),
                    suffix: raw[end..].to_owned(),
                },
            }
        })
        .collect()
}

/// Prefix to hand to lines appended inside the span that governs `line`.
#[must_use]
pub fn continuation_prefix(view: &[ViewLine], line: usize, lang: &Language) -> String {
    let Some(current) = line.checked_sub(1).and_then(|idx| view.get(idx)) else {
        return String::new();
    };
    let prefix = &current.frame.prefix;
    let indent: String = prefix.chars().take_while(|c| c.is_whitespace()).collect();
    match (lang.line, lang.block) {
        (Some(token), _) if prefix.trim_start().starts_with(token) => format!("{indent}{token} "),
        (_, Some(block)) => {
            let opening = prefix.trim_start().starts_with(block.start);
            match (block.ignore, opening) {
                (Some(ignore), true) => format!("{indent} {ignore} "),
                (Some(ignore), false) => format!("{indent}{ignore} "),
                (None, _) => indent,
            }
        }
        (Some(token), None) => format!("{indent}{token} "),
        (None, None) => indent,
    }
}

fn marker_width(content: &str, kind: CommentKind, first: bool, lang: &Language) -> usize {
    let ignore = lang.block.and_then(|block| block.ignore);
    let mut skip = 0;
    match kind {
        CommentKind::Line => {}
        CommentKind::Block if first => {
            if let Some(ignore) = ignore {
                while content[skip..].starts_with(ignore) {
                    skip += ignore.len();
                }
            }
        }
        CommentKind::Block => {
            let trimmed = content.trim_start();
            if let Some(ignore) = ignore
                && trimmed.starts_with(ignore)
            {
                skip = content.len() - trimmed.len() + ignore.len();
            }
        }
    }
    if content[skip..].starts_with(' ') {
        skip += 1;
    }
    skip
}
