// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Strip and Pad Kernels** - *Trimming and Width Alignment*
//!
//! ## Core Operations
//! - **strip**: removes a character set (default Unicode whitespace) from one or both
//!   ends. The result shares the input buffer.
//! - **pad**: aligns elements to a character width with a single fill character.
//! - **zfill**: left-pads numbers with `0`, keeping a leading sign in front.

use std::ops::Range;

use crate::errors::KernelError;
use crate::store::CharacterStore;
use crate::utils::{single_char, ByteWriter};

/// Which ends `strip` trims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StripSide {
    Left,
    Right,
    #[default]
    Both,
}

/// Where `pad` inserts fill characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PadSide {
    /// Fill on the left; text is right-aligned.
    #[default]
    Left,
    /// Fill on the right; text is left-aligned.
    Right,
    /// Fill both sides; an odd fill count puts the extra character on the right.
    Both,
}

/// What `pad` does with elements already wider than the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PadPolicy {
    #[default]
    Keep,
    /// Cut to the first `width` characters.
    Truncate,
}

/// Byte range of `text` left after stripping.
fn strip_bounds(text: &str, side: StripSide, chars: Option<&str>) -> Range<usize> {
    let strip = |c: char| match chars {
        None => c.is_whitespace(),
        Some(set) => set.contains(c),
    };
    let start = match side {
        StripSide::Right => 0,
        _ => text.len() - text.trim_start_matches(strip).len(),
    };
    let end = match side {
        StripSide::Left => text.len(),
        _ => start + text[start..].trim_end_matches(strip).len(),
    };
    start..end
}

/// Strips `chars` (any of them, in any order) from the chosen ends of every element.
///
/// `chars = None` strips Unicode whitespace. Elements with nothing to strip keep their
/// original bounds. The output points into the input buffer.
pub fn strip(store: &CharacterStore, side: StripSide, chars: Option<&str>) -> CharacterStore {
    store.share(store.len(), |i| {
        let text = store.view(i).as_str()?;
        Some((i, strip_bounds(text, side, chars)))
    })
}

/// `(left fill, right fill, kept byte length)` for one element.
fn pad_plan(
    text: &str,
    width: usize,
    side: PadSide,
    policy: PadPolicy,
) -> (usize, usize, usize) {
    let n = text.chars().count();
    if n >= width {
        let keep = match policy {
            PadPolicy::Truncate if n > width => {
                text.char_indices().nth(width).map_or(text.len(), |(b, _)| b)
            }
            _ => text.len(),
        };
        return (0, 0, keep);
    }
    let total = width - n;
    match side {
        PadSide::Left => (total, 0, text.len()),
        PadSide::Right => (0, total, text.len()),
        PadSide::Both => (total / 2, total - total / 2, text.len()),
    }
}

/// Pads every element to `width` characters with `fill`.
///
/// # Errors
/// `InvalidArguments` unless `fill` is exactly one character.
pub fn pad(
    store: &CharacterStore,
    width: usize,
    side: PadSide,
    fill: &str,
    policy: PadPolicy,
) -> Result<CharacterStore, KernelError> {
    let fill = single_char("pad", fill)?;
    let fill_len = fill.len_utf8();
    store.transform(
        |v| {
            let (l, r, keep) = pad_plan(v.as_str()?, width, side, policy);
            Some((l + r) * fill_len + keep)
        },
        |v, out| {
            let text = v.text();
            let (l, r, keep) = pad_plan(text, width, side, policy);
            let mut w = ByteWriter::new(out);
            w.push_char_n(fill, l);
            w.push_str(&text[..keep]);
            w.push_char_n(fill, r);
        },
    )
}

/// Left-pads with `'0'` to `width` characters, after any leading `+` or `-`.
pub fn zfill(store: &CharacterStore, width: usize) -> Result<CharacterStore, KernelError> {
    let zeros = |text: &str| width.saturating_sub(text.chars().count());
    store.transform(
        |v| v.as_str().map(|t| t.len() + zeros(t)),
        |v, out| {
            let text = v.text();
            let (sign, rest) = match text.as_bytes().first() {
                Some(b'+') | Some(b'-') => text.split_at(1),
                _ => ("", text),
            };
            let mut w = ByteWriter::new(out);
            w.push_str(sign);
            w.push_char_n('0', zeros(text));
            w.push_str(rest);
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn str_array(vals: &[Option<&str>]) -> CharacterStore {
        CharacterStore::from_opt_strs(vals).unwrap()
    }

    #[test]
    fn test_strip_whitespace_shares_buffer() {
        let s = str_array(&[Some("  ab \n"), Some("cd"), None, Some("\u{3000}x")]);
        let out = strip(&s, StripSide::Both, None);
        assert_eq!(out, str_array(&[Some("ab"), Some("cd"), None, Some("x")]));
        assert!(out.shares_buffer_with(&s));
    }

    #[test]
    fn test_strip_sides_and_char_set() {
        let s = str_array(&[Some("xxhixy"), Some("none")]);
        assert_eq!(
            strip(&s, StripSide::Left, Some("xy")),
            str_array(&[Some("hixy"), Some("none")])
        );
        assert_eq!(
            strip(&s, StripSide::Right, Some("xy")),
            str_array(&[Some("xxhi"), Some("none")])
        );
        assert_eq!(strip(&s, StripSide::Both, Some("")), s);
    }

    #[test]
    fn test_strip_everything() {
        let s = str_array(&[Some("   ")]);
        assert_eq!(strip(&s, StripSide::Both, None).get(0), Some(""));
    }

    #[test]
    fn test_pad_sides() {
        let s = str_array(&[Some("ab"), None, Some("abcdef")]);
        let left = pad(&s, 5, PadSide::Left, "*", PadPolicy::Keep).unwrap();
        assert_eq!(left, str_array(&[Some("***ab"), None, Some("abcdef")]));
        let both = pad(&s, 5, PadSide::Both, "é", PadPolicy::Keep).unwrap();
        assert_eq!(both.get(0), Some("éabéé"));
        let right = pad(&s, 3, PadSide::Right, ".", PadPolicy::Truncate).unwrap();
        assert_eq!(right, str_array(&[Some("ab."), None, Some("abc")]));
    }

    #[test]
    fn test_pad_rejects_bad_fill() {
        let s = str_array(&[Some("a")]);
        assert!(matches!(
            pad(&s, 3, PadSide::Left, "ab", PadPolicy::Keep),
            Err(KernelError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_zfill_keeps_sign() {
        let s = str_array(&[Some("-42"), Some("+7"), Some("123456"), Some("x"), None]);
        let out = zfill(&s, 5).unwrap();
        assert_eq!(
            out,
            str_array(&[Some("-0042"), Some("+0007"), Some("123456"), Some("0000x"), None])
        );
    }
}
