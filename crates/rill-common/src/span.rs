use std::sync::Arc;

use serde::{Serialize, Serializer};

/// File name attached to synthetic spans.
pub const SYNTHETIC_FILE: &str = "<synthetic>";

/// A position in source text: 1-indexed line and column, 0-indexed byte offset.
///
/// All three are tracked together. The lexer stamps positions while it
/// advances, so no pass downstream of tokenization ever recomputes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

impl Position {
    pub fn new(line: u32, column: u32, offset: u32) -> Self {
        debug_assert!(line >= 1, "line is 1-indexed");
        debug_assert!(column >= 1, "column is 1-indexed");
        Self { line, column, offset }
    }

    /// The position of the first character of a file.
    pub fn origin() -> Self {
        Self { line: 1, column: 1, offset: 0 }
    }
}

/// A region of a source file. Start is inclusive, end is exclusive.
///
/// Spans carry their file name so that AST fragments parsed from different
/// inputs (the hybrid JSON path) stay attributable. The file name is shared
/// via `Arc`, so cloning a span is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub file: Arc<str>,
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(file: Arc<str>, start: Position, end: Position) -> Self {
        debug_assert!(
            start.offset <= end.offset,
            "span start ({}) must be <= end ({})",
            start.offset,
            end.offset
        );
        Self { file, start, end }
    }

    /// A zero-length span marking a node the compiler invented.
    ///
    /// Synthetic spans are exempt from the parent-containment invariant;
    /// they sit at their parent's start.
    pub fn synthetic() -> Self {
        Self {
            file: Arc::from(SYNTHETIC_FILE),
            start: Position::origin(),
            end: Position::origin(),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        &*self.file == SYNTHETIC_FILE
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> u32 {
        self.end.offset - self.start.offset
    }

    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }

    /// Merge two spans into one that covers both.
    ///
    /// Picks the minimum start and maximum end offset. The file of `self`
    /// wins; merging across files has no sensible answer and only arises
    /// for synthetic children, which contribute nothing to extent anyway.
    pub fn merge(&self, other: &Span) -> Span {
        if other.is_synthetic() {
            return self.clone();
        }
        if self.is_synthetic() {
            return other.clone();
        }
        let start = if self.start.offset <= other.start.offset {
            self.start
        } else {
            other.start
        };
        let end = if self.end.offset >= other.end.offset {
            self.end
        } else {
            other.end
        };
        Span::new(self.file.clone(), start, end)
    }

    /// Whether `other` lies entirely within `self`.
    pub fn contains(&self, other: &Span) -> bool {
        other.start.offset >= self.start.offset && other.end.offset <= self.end.offset
    }
}

impl Serialize for Span {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Span", 3)?;
        s.serialize_field("file", &*self.file)?;
        s.serialize_field("start", &self.start)?;
        s.serialize_field("end", &self.end)?;
        s.end()
    }
}

/// Pre-computed index of line start offsets for offset -> (line, column)
/// lookup via binary search. Built once per source file.
#[derive(Debug)]
pub struct LineIndex {
    /// Byte offset of the start of each line. The first entry is always 0.
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset to a 1-based (line, column) pair.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line_idx = self.line_starts.partition_point(|&start| start <= offset);
        let line_idx = line_idx.saturating_sub(1);
        let line = (line_idx as u32) + 1;
        let col = offset - self.line_starts[line_idx] + 1;
        (line, col)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: u32, end: u32) -> Span {
        Span::new(
            Arc::from("test.rill"),
            Position::new(1, start + 1, start),
            Position::new(1, end + 1, end),
        )
    }

    #[test]
    fn span_len_and_empty() {
        assert_eq!(span(5, 10).len(), 5);
        assert!(!span(5, 10).is_empty());
        assert!(span(3, 3).is_empty());
    }

    #[test]
    fn span_merge_covers_both() {
        let merged = span(5, 10).merge(&span(8, 15));
        assert_eq!(merged.start.offset, 5);
        assert_eq!(merged.end.offset, 15);
    }

    #[test]
    fn span_merge_with_synthetic_keeps_real_extent() {
        let real = span(4, 9);
        assert_eq!(real.merge(&Span::synthetic()), real);
        assert_eq!(Span::synthetic().merge(&real), real);
    }

    #[test]
    fn span_contains() {
        assert!(span(0, 10).contains(&span(2, 8)));
        assert!(!span(2, 8).contains(&span(0, 10)));
    }

    #[test]
    fn synthetic_span_is_marked() {
        let s = Span::synthetic();
        assert!(s.is_synthetic());
        assert!(s.is_empty());
    }

    #[test]
    fn line_index_lookup() {
        let idx = LineIndex::new("hello\nworld\nfoo");
        assert_eq!(idx.line_col(0), (1, 1));
        assert_eq!(idx.line_col(6), (2, 1));
        assert_eq!(idx.line_col(13), (3, 2));
        assert_eq!(idx.line_count(), 3);
    }

    #[test]
    fn line_index_newline_belongs_to_its_line() {
        let idx = LineIndex::new("ab\ncd");
        assert_eq!(idx.line_col(2), (1, 3));
        assert_eq!(idx.line_col(3), (2, 1));
    }
}
