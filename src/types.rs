//! Core types used throughout the project.

use tower_lsp::lsp_types;

/// A range in a catalog file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceRange {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl From<lsp_types::Range> for SourceRange {
    fn from(range: lsp_types::Range) -> Self {
        Self { start: range.start.into(), end: range.end.into() }
    }
}

impl From<SourceRange> for lsp_types::Range {
    fn from(range: SourceRange) -> Self {
        Self { start: range.start.into(), end: range.end.into() }
    }
}

/// A position in a catalog file (0-indexed line, UTF-16 column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct SourcePosition {
    pub line: u32,
    pub character: u32,
}

impl From<lsp_types::Position> for SourcePosition {
    fn from(position: lsp_types::Position) -> Self {
        Self { line: position.line, character: position.character }
    }
}

impl From<SourcePosition> for lsp_types::Position {
    fn from(position: SourcePosition) -> Self {
        Self { line: position.line, character: position.character }
    }
}

impl SourceRange {
    #[must_use]
    pub const fn new(start: SourcePosition, end: SourcePosition) -> Self {
        Self { start, end }
    }

    /// Checks if a position is within this range.
    #[must_use]
    pub const fn contains(&self, position: SourcePosition) -> bool {
        if position.line < self.start.line {
            return false;
        }
        if position.line == self.start.line && position.character < self.start.character {
            return false;
        }
        if position.line > self.end.line {
            return false;
        }
        if position.line == self.end.line && position.character > self.end.character {
            return false;
        }
        true
    }
}

/// Converts byte offsets of a text into LSP positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// Byte offset of the first character of every line.
    line_starts: Vec<usize>,
}

impl LineIndex {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(offset, _)| offset + 1));
        Self { line_starts }
    }

    /// Returns the position of `offset` in `text`.
    ///
    /// Offsets past the end clamp to the end of the text; offsets inside a
    /// multi-byte character round down to its start.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn position(&self, text: &str, offset: usize) -> SourcePosition {
        let offset = offset.min(text.len());
        let line = self.line_starts.partition_point(|&start| start <= offset).saturating_sub(1);
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);

        let character: usize = text
            .get(line_start..)
            .unwrap_or_default()
            .char_indices()
            .take_while(|(index, _)| line_start + index < offset)
            .map(|(_, ch)| ch.len_utf16())
            .sum();

        SourcePosition { line: line as u32, character: character as u32 }
    }

    /// Returns the range spanning the byte offsets `start..end`.
    #[must_use]
    pub fn range(&self, text: &str, start: usize, end: usize) -> SourceRange {
        SourceRange { start: self.position(text, start), end: self.position(text, end) }
    }
}
