//! Source positions and ranges.
//!
//! Lines and columns are 1-based, byte offsets are 0-based. Columns count
//! Unicode scalar values, not bytes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single position within a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pos {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number, counted in characters.
    pub column: usize,
    /// 0-based byte offset.
    pub byte: usize,
}

impl Pos {
    /// The position of the first byte of any buffer.
    pub const START: Pos = Pos {
        line: 1,
        column: 1,
        byte: 0,
    };

    pub fn new(line: usize, column: usize, byte: usize) -> Self {
        Self { line, column, byte }
    }

    /// Returns the position immediately after `ch`.
    pub fn advance(self, ch: char) -> Self {
        if ch == '\n' {
            Self {
                line: self.line + 1,
                column: 1,
                byte: self.byte + 1,
            }
        } else {
            Self {
                line: self.line,
                column: self.column + 1,
                byte: self.byte + ch.len_utf8(),
            }
        }
    }

    /// Computes the position of byte `offset` within `src`.
    ///
    /// Offsets past the end of `src` (or inside a multi-byte character)
    /// are clamped to the nearest preceding character boundary.
    pub fn from_offset(src: &str, offset: usize) -> Self {
        let mut pos = Self::START;
        for ch in src.chars() {
            if pos.byte + ch.len_utf8() > offset {
                break;
            }
            pos = pos.advance(ch);
        }
        pos
    }

    /// Computes the position of a 1-based `line`/`column` pair within `src`.
    ///
    /// Used to translate parser errors from serde-based formats, which only
    /// report line and column.
    pub fn from_line_column(src: &str, line: usize, column: usize) -> Self {
        let mut pos = Self::START;
        for ch in src.chars() {
            if pos.line > line || (pos.line == line && pos.column >= column) {
                break;
            }
            if pos.line == line && ch == '\n' {
                break;
            }
            pos = pos.advance(ch);
        }
        pos
    }

    /// The position just past the last byte of `src`.
    pub fn end_of(src: &str) -> Self {
        src.chars().fold(Self::START, Self::advance)
    }
}

impl Default for Pos {
    fn default() -> Self {
        Self::START
    }
}

/// A half-open range of source bytes in a named file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub filename: String,
    pub start: Pos,
    pub end: Pos,
}

impl SourceRange {
    pub fn new(filename: impl Into<String>, start: Pos, end: Pos) -> Self {
        Self {
            filename: filename.into(),
            start,
            end,
        }
    }

    /// A zero-length range at `pos`.
    pub fn point(filename: impl Into<String>, pos: Pos) -> Self {
        Self::new(filename, pos, pos)
    }

    /// A range covering the entire `content`.
    pub fn whole(filename: impl Into<String>, content: &str) -> Self {
        Self::new(filename, Pos::START, Pos::end_of(content))
    }

    /// A range spanning from the start of `self` to the end of `other`.
    pub fn to(&self, other: &SourceRange) -> Self {
        Self::new(self.filename.clone(), self.start, other.end)
    }

    /// Byte length of the range.
    pub fn len(&self) -> usize {
        self.end.byte.saturating_sub(self.start.byte)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slices `src` with the byte offsets of this range.
    pub fn slice<'a>(&self, src: &'a str) -> Option<&'a str> {
        src.get(self.start.byte..self.end.byte)
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(
                f,
                "{}:{},{}-{}",
                self.filename, self.start.line, self.start.column, self.end.column
            )
        } else {
            write!(
                f,
                "{}:{},{}-{},{}",
                self.filename, self.start.line, self.start.column, self.end.line, self.end.column
            )
        }
    }
}

/// Byte offset to [`Pos`] lookup for one source buffer.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    src: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(src: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(at, _)| at + 1))
            .collect();
        Self { src, line_starts }
    }

    /// The position of byte `offset`, clamped like [`Pos::from_offset`].
    pub fn pos(&self, offset: usize) -> Pos {
        let mut offset = offset.min(self.src.len());
        while !self.src.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line - 1];
        let column = self.src[line_start..offset].chars().count() + 1;
        Pos::new(line, column, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_tracks_lines_and_multibyte_chars() {
        let pos = Pos::START.advance('é');
        assert_eq!(pos, Pos::new(1, 2, 2));
        let pos = pos.advance('\n');
        assert_eq!(pos, Pos::new(2, 1, 3));
    }

    #[test]
    fn from_offset_matches_manual_walk() {
        let src = "ab\ncd\n";
        assert_eq!(Pos::from_offset(src, 0), Pos::START);
        assert_eq!(Pos::from_offset(src, 3), Pos::new(2, 1, 3));
        assert_eq!(Pos::from_offset(src, 4), Pos::new(2, 2, 4));
        assert_eq!(Pos::from_offset(src, 100), Pos::end_of(src));
    }

    #[test]
    fn from_line_column_stops_at_line_end() {
        let src = "ab\ncd";
        assert_eq!(Pos::from_line_column(src, 2, 2), Pos::new(2, 2, 4));
        assert_eq!(Pos::from_line_column(src, 1, 10), Pos::new(1, 3, 2));
    }

    #[test]
    fn line_index_agrees_with_from_offset() {
        let src = "a = \"é\"\n\nbc = 1\n";
        let index = LineIndex::new(src);
        for offset in 0..=src.len() + 2 {
            assert_eq!(index.pos(offset), Pos::from_offset(src, offset), "offset {offset}");
        }
    }

    #[test]
    fn display_uses_compact_form_on_single_line() {
        let range = SourceRange::new("vars.hcl", Pos::new(3, 1, 20), Pos::new(3, 8, 27));
        assert_eq!(range.to_string(), "vars.hcl:3,1-8");

        let range = SourceRange::new("vars.hcl", Pos::new(3, 1, 20), Pos::new(4, 2, 30));
        assert_eq!(range.to_string(), "vars.hcl:3,1-4,2");
    }
}
