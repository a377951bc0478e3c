//! Byte spans over a program's text.

use text_size::TextSize;

/// A byte offset into a program's text.
pub type ByteOffset = TextSize;

/// The bytes `[start, end)` of a program's text.
///
/// `end` is exclusive, so a span may end at the text's length and an empty
/// span marks an insertion point between two bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    /// First byte covered.
    pub start: ByteOffset,
    /// One past the last byte covered.
    pub end: ByteOffset,
}

impl Span {
    #[inline]
    pub fn new(start: impl Into<ByteOffset>, end: impl Into<ByteOffset>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// The insertion point at `offset`.
    #[inline]
    pub fn empty(offset: impl Into<ByteOffset>) -> Self {
        let offset = offset.into();
        Self::new(offset, offset)
    }

    #[inline]
    pub fn len(&self) -> TextSize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `start` as a string index.
    #[inline]
    pub fn lo(&self) -> usize {
        u32::from(self.start) as usize
    }

    /// `end` as a string index.
    #[inline]
    pub fn hi(&self) -> usize {
        u32::from(self.end) as usize
    }

    /// The covered text, or `None` if either end is out of `source` or
    /// splits a character.
    pub fn text<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(self.lo()..self.hi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECL: &str = "let x = 1 + 2;";

    #[test]
    fn test_operand_span() {
        let rhs = Span::new(8u32, 13u32);
        assert_eq!(rhs.text(DECL), Some("1 + 2"));
        assert_eq!(u32::from(rhs.len()), 5);
        assert_eq!((rhs.lo(), rhs.hi()), (8, 13));
    }

    #[test]
    fn test_span_may_end_at_text_length() {
        let whole = Span::new(0u32, DECL.len() as u32);
        assert_eq!(whole.text(DECL), Some(DECL));
        assert_eq!(Span::new(10u32, 15u32).text(DECL), None);
    }

    #[test]
    fn test_insertion_point() {
        let point = Span::empty(4u32);
        assert!(point.is_empty());
        assert_eq!(point.text(DECL), Some(""));
        assert_eq!(point.start, point.end);
    }

    #[test]
    fn test_span_inside_character() {
        let source = "s = 'é';";
        assert_eq!(Span::new(5u32, 7u32).text(source), Some("é"));
        assert_eq!(Span::new(5u32, 6u32).text(source), None);
    }
}
