//! Synthetic-container adapter for override files.
//!
//! Override files are a flat list of `key = value` assignments whose keys
//! may be dotted package paths. Dotted names are not valid body attribute
//! names, but they are valid object-constructor keys, so the raw source is
//! wrapped in a single synthetic attribute whose value is an object:
//!
//! ```text
//! __overrides__ = {
//! <original content>
//! }
//! ```
//!
//! After parsing, every position is mapped back onto the original bytes.
//! The prefix is exactly one line, so positions after it shift by one line
//! and by the prefix byte length while columns are unchanged. Positions on
//! the prefix line collapse to the start of the original content, and
//! positions in the synthetic suffix clamp to its end.

use crate::diagnostic::Diagnostics;
use crate::pos::{Pos, SourceRange};

/// Name of the synthetic attribute holding the wrapped assignments.
pub const WRAPPER_ATTRIBUTE: &str = "__overrides__";

const PREFIX: &str = "__overrides__ = {\n";
const SUFFIX: &str = "\n}\n";

/// An override source wrapped in the synthetic container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedSource {
    wrapped: String,
    prefix_len: usize,
    original_len: usize,
    original_end: Pos,
}

impl WrappedSource {
    /// Wraps `original` in the synthetic container.
    pub fn wrap(original: &str) -> Self {
        let mut wrapped = String::with_capacity(PREFIX.len() + original.len() + SUFFIX.len());
        wrapped.push_str(PREFIX);
        wrapped.push_str(original);
        wrapped.push_str(SUFFIX);
        Self {
            wrapped,
            prefix_len: PREFIX.len(),
            original_len: original.len(),
            original_end: Pos::end_of(original),
        }
    }

    /// The wrapped text to hand to the parser.
    pub fn wrapped(&self) -> &str {
        &self.wrapped
    }

    /// Byte length of the synthetic prefix.
    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    /// The original, unwrapped content.
    pub fn original(&self) -> &str {
        &self.wrapped[self.prefix_len..self.prefix_len + self.original_len]
    }

    /// Maps a position in the wrapped text onto the original content.
    pub fn unwrap_pos(&self, pos: Pos) -> Pos {
        if pos.line <= 1 || pos.byte < self.prefix_len {
            return Pos::START;
        }
        let byte = pos.byte - self.prefix_len;
        if byte > self.original_len {
            return self.original_end;
        }
        Pos {
            line: pos.line - 1,
            column: pos.column,
            byte,
        }
    }

    /// Maps a range in the wrapped text onto the original content.
    ///
    /// A range starting on the prefix line collapses to a zero-length
    /// range at the start of the original content.
    pub fn unwrap_range(&self, range: SourceRange) -> SourceRange {
        let start = self.unwrap_pos(range.start);
        if start == Pos::START && (range.start.line <= 1 || range.start.byte < self.prefix_len) {
            return SourceRange::point(range.filename, Pos::START);
        }
        let end = self.unwrap_pos(range.end).max(start);
        SourceRange::new(range.filename, start, end)
    }

    /// Maps every range in `diags` onto the original content.
    pub fn unwrap_diagnostics(&self, diags: Diagnostics) -> Diagnostics {
        diags.map_ranges(|range| self.unwrap_range(range))
    }
}
