// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **String View** - *Borrowed Access to One Store Element*
//!
//! [`StrView`] is the per-element handle every worker reads through. It borrows the
//! element's bytes from a [`CharacterStore`](crate::store::CharacterStore) and cannot
//! outlive it.
//!
//! Positions exposed to callers are **character** positions; byte offsets are used
//! internally and by the zero-copy derivations. A null view behaves like an empty
//! string for text access and sorts before every valid view.

use std::cmp::Ordering;
use std::str::{CharIndices, Chars};

use memchr::memmem;

/// Non-owning descriptor of one element of a character store.
#[derive(Debug, Clone, Copy)]
pub struct StrView<'a> {
    text: &'a str,
    null: bool,
}

impl<'a> StrView<'a> {
    /// A null element.
    #[inline]
    pub const fn null() -> Self {
        Self {
            text: "",
            null: true,
        }
    }

    /// A valid element over `text`.
    #[inline]
    pub const fn new(text: &'a str) -> Self {
        Self { text, null: false }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.null
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.null
    }

    /// True for null and for zero-length elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The element text, or `None` when null.
    #[inline]
    pub fn as_str(&self) -> Option<&'a str> {
        if self.null { None } else { Some(self.text) }
    }

    /// The element text; `""` for null.
    #[inline]
    pub fn text(&self) -> &'a str {
        self.text
    }

    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.text.as_bytes()
    }

    #[inline]
    pub fn byte_len(&self) -> usize {
        self.text.len()
    }

    #[inline]
    pub fn is_ascii(&self) -> bool {
        self.text.is_ascii()
    }

    /// Number of characters, counted from UTF-8 lead bytes.
    #[inline]
    pub fn char_count(&self) -> usize {
        self.as_bytes().iter().filter(|&&b| (b & 0xC0) != 0x80).count()
    }

    #[inline]
    pub fn chars(&self) -> Chars<'a> {
        self.text.chars()
    }

    #[inline]
    pub fn char_indices(&self) -> CharIndices<'a> {
        self.text.char_indices()
    }

    /// Character starting at byte offset `at`.
    #[inline]
    pub fn char_at(&self, at: usize) -> Option<char> {
        self.text.get(at..).and_then(|s| s.chars().next())
    }

    /// Character ending at byte offset `at`.
    #[inline]
    pub fn char_before(&self, at: usize) -> Option<char> {
        self.text.get(..at).and_then(|s| s.chars().next_back())
    }

    /// Byte offset of character position `pos`, clamped to the end of the element.
    pub fn byte_offset(&self, pos: usize) -> usize {
        if self.is_ascii() {
            return pos.min(self.text.len());
        }
        self.text
            .char_indices()
            .nth(pos)
            .map(|(b, _)| b)
            .unwrap_or(self.text.len())
    }

    /// Character position of byte offset `at`, which must lie on a char boundary.
    pub fn char_position(&self, at: usize) -> usize {
        let at = at.min(self.text.len());
        self.as_bytes()[..at]
            .iter()
            .filter(|&&b| (b & 0xC0) != 0x80)
            .count()
    }

    /// Byte range of the character span `[start, start + len)`, clamped to the element.
    ///
    /// `len = None` runs to the end.
    pub fn char_span(&self, start: usize, len: Option<usize>) -> (usize, usize) {
        let from = self.byte_offset(start);
        let to = match len {
            Some(n) => from + StrView::new(&self.text[from..]).byte_offset(n),
            None => self.text.len(),
        };
        (from, to)
    }

    /// Sub-view over a character span; see [`char_span`](Self::char_span).
    pub fn substr(&self, start: usize, len: Option<usize>) -> StrView<'a> {
        if self.null {
            return *self;
        }
        let (from, to) = self.char_span(start, len);
        StrView::new(&self.text[from..to])
    }

    /// Byte offset of the first occurrence of `needle`.
    #[inline]
    pub fn find_bytes(&self, needle: &str) -> Option<usize> {
        memmem::find(self.as_bytes(), needle.as_bytes())
    }

    /// Character position of the first occurrence of `needle`.
    pub fn find(&self, needle: &str) -> Option<usize> {
        self.find_bytes(needle).map(|b| self.char_position(b))
    }

    /// Character position of the last occurrence of `needle`.
    pub fn rfind(&self, needle: &str) -> Option<usize> {
        memmem::rfind(self.as_bytes(), needle.as_bytes()).map(|b| self.char_position(b))
    }

    #[inline]
    pub fn starts_with(&self, prefix: &str) -> bool {
        !self.null && self.text.starts_with(prefix)
    }

    #[inline]
    pub fn ends_with(&self, suffix: &str) -> bool {
        !self.null && self.text.ends_with(suffix)
    }

    /// Byte-wise total order with nulls first.
    #[inline]
    pub fn compare(&self, other: &StrView<'_>) -> Ordering {
        match (self.null, other.null) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.as_bytes().cmp(other.as_bytes()),
        }
    }
}

impl PartialEq for StrView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for StrView<'_> {}

impl PartialOrd for StrView<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StrView<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl<'a> From<Option<&'a str>> for StrView<'a> {
    fn from(value: Option<&'a str>) -> Self {
        value.map_or(StrView::null(), StrView::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_positions_multibyte() {
        let v = StrView::new("héllo wörld");
        assert_eq!(v.char_count(), 11);
        assert_eq!(v.byte_len(), 13);
        assert_eq!(v.byte_offset(2), 3);
        assert_eq!(v.char_position(3), 2);
        assert_eq!(v.byte_offset(100), 13);
        assert_eq!(v.char_at(1), Some('é'));
        assert_eq!(v.char_before(3), Some('é'));
    }

    #[test]
    fn test_substr() {
        let v = StrView::new("añbc");
        assert_eq!(v.substr(1, Some(2)).text(), "ñb");
        assert_eq!(v.substr(2, None).text(), "bc");
        assert_eq!(v.substr(10, Some(1)).text(), "");
        assert!(StrView::null().substr(0, None).is_null());
    }

    #[test]
    fn test_find_reports_char_positions() {
        let v = StrView::new("日本語の本");
        assert_eq!(v.find("本"), Some(1));
        assert_eq!(v.rfind("本"), Some(4));
        assert_eq!(v.find("x"), None);
        assert!(v.starts_with("日本"));
        assert!(v.ends_with("の本"));
        assert!(!StrView::null().starts_with(""));
    }

    #[test]
    fn test_ordering_nulls_first() {
        let mut views = vec![
            StrView::new("b"),
            StrView::null(),
            StrView::new("a"),
            StrView::new(""),
        ];
        views.sort();
        let out: Vec<Option<&str>> = views.iter().map(|v| v.as_str()).collect();
        assert_eq!(out, vec![None, Some(""), Some("a"), Some("b")]);
        assert_ne!(StrView::null(), StrView::new(""));
    }
}
