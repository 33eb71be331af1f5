//! Translation from fragment-local offsets to document spans.
//!
//! The delegating dialects hand the core front end a piece of text that is
//! not the submitted document: a stage section of an annotated file, or the
//! decoded contents of a JSON string. A [`SourceMap`] translates offsets in
//! that fragment back to the document, so every span is created in document
//! coordinates and no tree is rewritten afterwards.

use std::ops::Range;

use prism_core::{LineIndex, Span};

#[derive(Debug, Clone)]
enum OffsetMapping {
    /// The fragment is a verbatim slice starting at this document offset.
    Shift(usize),
    /// Document offset of every fragment byte, plus one trailing entry for
    /// the end of the fragment.
    Table(Vec<usize>),
}

/// Maps byte offsets of one fragment into spans of the submitted document.
#[derive(Debug, Clone)]
pub struct SourceMap<'doc> {
    index: &'doc LineIndex<'doc>,
    mapping: OffsetMapping,
}

impl<'doc> SourceMap<'doc> {
    /// The fragment is the document itself.
    pub fn identity(index: &'doc LineIndex<'doc>) -> Self {
        Self::shifted(index, 0)
    }

    /// The fragment is the document slice starting at `base`.
    pub fn shifted(index: &'doc LineIndex<'doc>, base: usize) -> Self {
        Self {
            index,
            mapping: OffsetMapping::Shift(base),
        }
    }

    /// The fragment was decoded from the document; `offsets[i]` is the
    /// document offset of fragment byte `i`. The table must hold one more
    /// entry than the fragment has bytes.
    pub fn table(index: &'doc LineIndex<'doc>, offsets: Vec<usize>) -> Self {
        Self {
            index,
            mapping: OffsetMapping::Table(offsets),
        }
    }

    /// The document offset of a fragment offset.
    pub fn offset(&self, local: usize) -> usize {
        match &self.mapping {
            OffsetMapping::Shift(base) => base + local,
            OffsetMapping::Table(offsets) => match offsets.get(local) {
                Some(offset) => *offset,
                None => offsets.last().copied().unwrap_or_default(),
            },
        }
    }

    /// The document span of a fragment range.
    ///
    /// The end of a non-empty range is mapped through its last byte so an
    /// escape sequence at the end of a token is covered completely.
    pub fn span(&self, range: Range<usize>) -> Span {
        let start = self.offset(range.start);
        let end = if range.end > range.start {
            match &self.mapping {
                OffsetMapping::Shift(base) => base + range.end,
                OffsetMapping::Table(_) => {
                    let last = self.offset(range.end - 1);
                    self.offset(range.end).max(last + 1)
                }
            }
        } else {
            start
        };
        self.index.span(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_mapping() {
        let index = LineIndex::new("float x;\nint y;");
        let map = SourceMap::identity(&index);
        let span = map.span(9..12);
        assert_eq!(span.start().line, 2);
        assert_eq!(span.start().column, 1);
        assert_eq!(span.range(), 9..12);
    }

    #[test]
    fn test_shifted_mapping() {
        let document = "// header\nvoid main() {}";
        let index = LineIndex::new(document);
        let map = SourceMap::shifted(&index, 10);
        let span = map.span(0..4);
        assert_eq!(&document[span.range()], "void");
        assert_eq!(span.start().line, 2);
    }

    #[test]
    fn test_table_mapping_skips_escapes() {
        // Document `"a\nb"` decodes to a, newline, b.
        let document = r#""a\nb""#;
        let index = LineIndex::new(document);
        let map = SourceMap::table(&index, vec![1, 2, 4, 5]);
        assert_eq!(map.span(2..3).range(), 4..5);
        assert_eq!(map.span(1..2).range(), 2..4);
        assert_eq!(map.span(0..3).range(), 1..5);
        assert_eq!(map.offset(10), 5);
    }
}
