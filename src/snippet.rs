//! Source excerpt rendering for decode errors.
//!
//! When a taskfile fails to decode, the error carries a few lines of the
//! document around the reported position with a caret marking the column, to
//! make the diagnosis readable without opening the file.

use std::fmt;

/// Number of context lines rendered above and below the error line.
const DEFAULT_PADDING: usize = 2;

/// A rendered excerpt of a document around one line/column position.
#[derive(Debug, Clone)]
pub struct Snippet {
    lines: Vec<String>,
}

impl Snippet {
    /// Build a snippet around `line`/`column` (both 1-based) with the
    /// default padding. The window is clamped to the document's extent.
    pub fn new(content: &[u8], line: usize, column: usize) -> Self {
        Self::with_padding(content, line, column, DEFAULT_PADDING)
    }

    pub fn with_padding(content: &[u8], line: usize, column: usize, padding: usize) -> Self {
        let text = String::from_utf8_lossy(content);
        let all: Vec<&str> = text.lines().collect();
        if all.is_empty() || line == 0 || line > all.len() {
            return Self { lines: Vec::new() };
        }

        let first = line.saturating_sub(padding + 1); // 0-based window start
        let last = (line + padding).min(all.len()); // 0-based exclusive end
        let gutter = last.to_string().len();

        let mut lines = Vec::with_capacity(last - first + 1);
        for (i, source) in all[first..last].iter().enumerate() {
            let number = first + i + 1;
            let marker = if number == line { ">" } else { " " };
            lines.push(format!("{marker} {number:>gutter$} | {source}"));
            if number == line && column > 0 {
                // The gutter is "{marker} {number} | ", which is gutter + 5
                // characters wide.
                lines.push(format!(
                    "{caret:>width$}",
                    caret = "^",
                    width = gutter + 5 + column
                ));
            }
        }
        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for Snippet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &[u8] = b"version: '3'\nvars:\n  A: 1\ntasks:\n  build:\n    cmds:\n      - cargo build\n";

    #[test]
    fn marks_the_error_line_and_column() {
        let snippet = Snippet::new(DOC, 4, 1).to_string();
        assert!(snippet.contains("> 4 | tasks:"));
        assert!(snippet.contains('^'));
        // Two lines of context either side.
        assert!(snippet.contains("2 | vars:"));
        assert!(snippet.contains("6 |     cmds:"));
        // Out of window.
        assert!(!snippet.contains("cargo build"));
    }

    #[test]
    fn clamps_at_document_start() {
        let snippet = Snippet::new(DOC, 1, 1).to_string();
        assert!(snippet.starts_with("> 1 | version: '3'"));
    }

    #[test]
    fn clamps_at_document_end() {
        let snippet = Snippet::new(DOC, 7, 9).to_string();
        assert!(snippet.contains("> 7 |       - cargo build"));
        assert!(snippet.contains("5 |   build:"));
    }

    #[test]
    fn out_of_range_line_renders_empty() {
        let snippet = Snippet::new(DOC, 99, 1);
        assert!(snippet.is_empty());
        assert_eq!(snippet.to_string(), "");
    }
}
