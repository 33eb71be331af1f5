//! Source locations.
//!
//! A [`Span`] attributes an AST node or diagnostic to a region of the
//! submitted document. Each end of the span is a [`Position`] holding both the
//! byte offset and the 1-based line/column, so consumers can slice the source
//! text or point at it without re-scanning.
//!
//! Parsers work with byte ranges and resolve them through a [`LineIndex`]
//! built over the document the caller actually submitted.

use std::{fmt, ops::Range};

use serde::Serialize;

/// A single point in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    /// Byte offset from the start of the document.
    pub offset: usize,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column, counted in characters.
    pub column: u32,
}

impl Position {
    pub fn new(offset: usize, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open region `[start, end)` of the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    start: Position,
    end: Position,
}

impl Span {
    /// Create a span from two positions.
    ///
    /// The positions are swapped if given in reverse order.
    pub fn new(start: Position, end: Position) -> Self {
        if end.offset < start.offset {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }

    /// The byte range covered by this span.
    pub fn range(&self) -> Range<usize> {
        self.start.offset..self.end.offset
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a union of two spans (encompassing both).
    pub fn union(&self, other: Span) -> Span {
        let start = if other.start.offset < self.start.offset {
            other.start
        } else {
            self.start
        };
        let end = if other.end.offset > self.end.offset {
            other.end
        } else {
            self.end
        };
        Span { start, end }
    }

    /// Whether `other` lies entirely inside this span.
    pub fn contains(&self, other: Span) -> bool {
        self.start.offset <= other.start.offset && other.end.offset <= self.end.offset
    }
}

impl PartialOrd for Span {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Span {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.start
            .offset
            .cmp(&other.start.offset)
            .then(self.end.offset.cmp(&other.end.offset))
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A generic wrapper for AST elements that tracks source position information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Spanned<T> {
    value: T,
    span: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Get a reference to the underlying value
    pub fn inner(&self) -> &T {
        &self.value
    }

    /// Consume the Spanned wrapper and return just the inner value
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Convert from one spanned type to another using the provided function,
    /// keeping the span.
    pub fn map<F, U>(&self, f: F) -> Spanned<U>
    where
        F: FnOnce(&T) -> U,
    {
        Spanned {
            value: f(&self.value),
            span: self.span,
        }
    }
}

impl<T> std::ops::Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T: fmt::Display> fmt::Display for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

/// Resolves byte offsets of one document into line/column positions.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { text, line_starts }
    }

    /// The indexed text.
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Number of lines, counting a trailing partial line.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Resolve a byte offset. Offsets past the end clamp to the end, and
    /// offsets inside a multi-byte character snap back to its first byte.
    pub fn position(&self, offset: usize) -> Position {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = self.text[line_start..offset].chars().count();
        Position::new(offset, line as u32 + 1, column as u32 + 1)
    }

    /// Resolve a byte range into a span.
    pub fn span(&self, range: Range<usize>) -> Span {
        Span::new(self.position(range.start), self.position(range.end))
    }

    /// A span covering the whole document.
    pub fn full_span(&self) -> Span {
        self.span(0..self.text.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index_positions() {
        let index = LineIndex::new("ab\ncd\n\nef");

        assert_eq!(index.position(0), Position::new(0, 1, 1));
        assert_eq!(index.position(1), Position::new(1, 1, 2));
        assert_eq!(index.position(3), Position::new(3, 2, 1));
        assert_eq!(index.position(6), Position::new(6, 3, 1));
        assert_eq!(index.position(8), Position::new(8, 4, 2));
        assert_eq!(index.line_count(), 4);
    }

    #[test]
    fn test_line_index_counts_columns_in_chars() {
        let index = LineIndex::new("é = 1;");

        assert_eq!(index.position(2).column, 2);
        // Offset 1 is inside `é` and snaps back to its first byte.
        assert_eq!(index.position(1).offset, 0);
    }

    #[test]
    fn test_line_index_clamps_past_end() {
        let index = LineIndex::new("abc");

        assert_eq!(index.position(99), Position::new(3, 1, 4));
    }

    #[test]
    fn test_span_union_and_contains() {
        let index = LineIndex::new("float x = 1.0;");
        let a = index.span(0..5);
        let b = index.span(6..7);
        let union = a.union(b);

        assert_eq!(union.range(), 0..7);
        assert!(union.contains(a));
        assert!(union.contains(b));
        assert!(!a.contains(b));
    }

    #[test]
    fn test_span_ordering() {
        let index = LineIndex::new("0123456789");

        assert!(index.span(1..2) < index.span(2..3));
        assert!(index.span(1..2) < index.span(1..4));
        assert_eq!(index.span(3..5).cmp(&index.span(3..5)), std::cmp::Ordering::Equal);
    }

    #[test]
    fn test_spanned_map_keeps_span() {
        let index = LineIndex::new("main");
        let spanned = Spanned::new("main".to_string(), index.span(0..4));
        let len = spanned.map(|s| s.len());

        assert_eq!(*len.inner(), 4);
        assert_eq!(len.span(), spanned.span());
        assert_eq!(spanned.as_str(), "main");
    }
}

#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    // ===================
    // Property Test Functions
    // ===================

    /// A resolved position agrees with counting lines and characters directly.
    fn check_position_matches_text(text: &str, offset: usize) -> Result<(), TestCaseError> {
        let index = LineIndex::new(text);
        let position = index.position(offset);

        prop_assert!(position.offset <= text.len());
        prop_assert!(text.is_char_boundary(position.offset));

        let before = &text[..position.offset];
        let line = before.matches('\n').count() + 1;
        let column = before.rsplit('\n').next().map_or(0, |tail| tail.chars().count()) + 1;
        prop_assert_eq!(position.line as usize, line);
        prop_assert_eq!(position.column as usize, column);
        Ok(())
    }

    /// Positions never move backwards as offsets grow.
    fn check_positions_are_monotonic(text: &str, a: usize, b: usize) -> Result<(), TestCaseError> {
        let index = LineIndex::new(text);
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        let (low, high) = (index.position(low), index.position(high));
        prop_assert!(low.offset <= high.offset);
        prop_assert!((low.line, low.column) <= (high.line, high.column));
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn position_matches_text(text in "\\PC{0,80}(\n\\PC{0,20}){0,4}", offset in 0usize..200) {
            check_position_matches_text(&text, offset)?;
        }

        #[test]
        fn positions_are_monotonic(text in "[a-zé\n ]{0,60}", a in 0usize..80, b in 0usize..80) {
            check_positions_are_monotonic(&text, a, b)?;
        }
    }
}
