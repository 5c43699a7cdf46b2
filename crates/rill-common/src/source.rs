use std::sync::Arc;

use crate::span::{LineIndex, Position, Span};

/// A source file: name plus full text, with a lazily built line index.
///
/// The compiler core never reads files itself; callers hand it a
/// `SourceFile` and every span produced downstream refers back to it.
#[derive(Debug)]
pub struct SourceFile {
    pub name: Arc<str>,
    pub text: String,
    line_index: LineIndex,
}

impl SourceFile {
    pub fn new(name: impl Into<Arc<str>>, text: impl Into<String>) -> Self {
        let text = text.into();
        let line_index = LineIndex::new(&text);
        Self {
            name: name.into(),
            text,
            line_index,
        }
    }

    /// Position of a byte offset in this file.
    pub fn position_at(&self, offset: u32) -> Position {
        let (line, column) = self.line_index.line_col(offset);
        Position::new(line, column, offset)
    }

    /// Span between two byte offsets in this file.
    pub fn span(&self, start: u32, end: u32) -> Span {
        Span::new(self.name.clone(), self.position_at(start), self.position_at(end))
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_at_tracks_lines() {
        let file = SourceFile::new("a.rill", "let x = 1\nlet y = 2");
        let p = file.position_at(10);
        assert_eq!((p.line, p.column, p.offset), (2, 1, 10));
    }

    #[test]
    fn span_carries_file_name() {
        let file = SourceFile::new("a.rill", "abc");
        let s = file.span(0, 3);
        assert_eq!(&*s.file, "a.rill");
        assert_eq!(s.len(), 3);
    }
}
