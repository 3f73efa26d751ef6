//! Line splitting helpers shared by the scanner, the reader and the rewriter.

/// Split `text` into lines without their terminators.
///
/// A trailing newline does not produce an extra empty line, and a `\r` before
/// `\n` is stripped, so line numbers match what editors display.
#[must_use]
pub fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let body = text.strip_suffix('\n').unwrap_or(text);
    body.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Line terminator used by `text` (`\r\n` when present, `\n` otherwise).
#[must_use]
pub fn detect_eol(text: &str) -> &'static str {
    if text.contains("\r\n") { "\r\n" } else { "\n" }
}

/// Split `text` into lines paired with their own terminators.
///
/// The last line has an empty terminator when the text does not end with a
/// newline.
#[must_use]
pub fn split_terminated(text: &str) -> Vec<(String, String)> {
    text.split_inclusive('\n')
        .map(|chunk| {
            let (line, eol) = if let Some(line) = chunk.strip_suffix("\r\n") {
                (line, "\r\n")
            } else if let Some(line) = chunk.strip_suffix('\n') {
                (line, "\n")
            } else {
                (chunk, "")
            };
            (line.to_owned(), eol.to_owned())
        })
        .collect()
}

/// Join lines that carry their own terminators.
///
/// Lines without one get `eol`, except the last line, which only ends with a
/// terminator when `trailing` is set.
#[must_use]
pub fn join_terminated(lines: &[(String, String)], eol: &str, trailing: bool) -> String {
    let mut out = String::new();
    for (idx, (line, own)) in lines.iter().enumerate() {
        out.push_str(line);
        if idx + 1 < lines.len() || trailing {
            out.push_str(if own.is_empty() { eol } else { own });
        }
    }
    out
}

/// Whether `line` is empty or whitespace only.
#[must_use]
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_handles_trailing_newline_and_crlf() {
        assert_eq!(split_lines("a\nb\n"), vec!["a", "b"]);
        assert_eq!(split_lines("a\r\nb"), vec!["a", "b"]);
        assert_eq!(split_lines("a\n\n"), vec!["a", ""]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn join_restores_original_shape() {
        let text = "one\r\ntwo\r\n";
        let lines = split_terminated(text);
        assert_eq!(join_terminated(&lines, detect_eol(text), text.ends_with('\n')), text);
    }

    #[test]
    fn terminated_lines_keep_mixed_endings() {
        let text = "intro\r\nbody\nlast";
        let lines = split_terminated(text);
        assert_eq!(lines.len(), split_lines(text).len());
        assert_eq!(lines[0], ("intro".to_owned(), "\r\n".to_owned()));
        assert_eq!(lines[1], ("body".to_owned(), "\n".to_owned()));
        assert_eq!(lines[2], ("last".to_owned(), String::new()));
        assert_eq!(join_terminated(&lines, "\r\n", false), text);
        assert_eq!(join_terminated(&lines, "\r\n", true), "intro\r\nbody\nlast\r\n");
    }
}
