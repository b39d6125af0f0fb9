use serde::{Deserialize, Serialize};
use std::fmt;

/// Location of a token or statement inside a galaxy script.
///
/// Galaxy statements never span lines, so a span is a single line plus a
/// 1-based, inclusive column range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    #[serde(rename = "column")]
    pub start_col: u32,
    #[serde(rename = "end_column")]
    pub end_col: u32,
}

impl Span {
    pub fn new(line: u32, start_col: u32, end_col: u32) -> Self {
        Self {
            line,
            start_col,
            end_col,
        }
    }

    /// A zero-width span at a single position.
    pub fn point(line: u32, col: u32) -> Self {
        Self::new(line, col, col)
    }

    /// Smallest span covering both `self` and `other`.
    ///
    /// Spans on different lines keep the earlier line; only statement-level
    /// spans are merged, and those share a line.
    pub fn merge(self, other: Span) -> Span {
        match self.line.cmp(&other.line) {
            std::cmp::Ordering::Less => self,
            std::cmp::Ordering::Greater => other,
            std::cmp::Ordering::Equal => Span::new(
                self.line,
                self.start_col.min(other.start_col),
                self.end_col.max(other.end_col),
            ),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.start_col)
    }
}

/// A named galaxy script kept around for error reporting.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub source: String,
    lines: Vec<(usize, usize)>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let mut lines = Vec::new();
        let mut start = 0;
        for (idx, _) in source.match_indices('\n') {
            lines.push((start, idx));
            start = idx + 1;
        }
        lines.push((start, source.len()));
        Self {
            name: name.into(),
            source,
            lines,
        }
    }

    /// Text of a 1-based line without its terminator.
    pub fn line(&self, line_number: u32) -> Option<&str> {
        let idx = line_number.checked_sub(1)? as usize;
        let &(start, end) = self.lines.get(idx)?;
        Some(self.source[start..end].trim_end_matches('\r'))
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// The source text covered by `span`, if it is in range.
    pub fn snippet(&self, span: Span) -> Option<&str> {
        let line = self.line(span.line)?;
        let start = span.start_col.checked_sub(1)? as usize;
        let end = (span.end_col as usize).min(line.len());
        line.get(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_point() {
        let s = Span::point(3, 7);
        assert_eq!(s, Span::new(3, 7, 7));
    }

    #[test]
    fn test_span_merge_same_line() {
        let merged = Span::new(1, 5, 9).merge(Span::new(1, 2, 6));
        assert_eq!(merged, Span::new(1, 2, 9));
    }

    #[test]
    fn test_span_merge_keeps_earlier_line() {
        let merged = Span::new(4, 1, 3).merge(Span::new(2, 8, 9));
        assert_eq!(merged, Span::new(2, 8, 9));
    }

    #[test]
    fn test_span_display() {
        assert_eq!(Span::new(12, 4, 9).to_string(), "12:4");
    }

    #[test]
    fn test_source_file_lines() {
        let src = SourceFile::new("t.txt", ":1 = 42\r\n:2 = ap inc :1\nap inc :2");
        assert_eq!(src.line(1), Some(":1 = 42"));
        assert_eq!(src.line(2), Some(":2 = ap inc :1"));
        assert_eq!(src.line(3), Some("ap inc :2"));
        assert_eq!(src.line(0), None);
        assert_eq!(src.line(4), None);
        assert_eq!(src.line_count(), 3);
    }

    #[test]
    fn test_source_file_empty() {
        let src = SourceFile::new("t.txt", "");
        assert_eq!(src.line_count(), 1);
        assert_eq!(src.line(1), Some(""));
    }

    #[test]
    fn test_snippet() {
        let src = SourceFile::new("t.txt", ":1 = ap frob 3");
        assert_eq!(src.snippet(Span::new(1, 9, 12)), Some("frob"));
        assert_eq!(src.snippet(Span::new(2, 1, 1)), None);
    }
}
