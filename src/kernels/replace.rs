// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Replace and Rewrite Kernels** - *Literal Substitution and Composition*
//!
//! ## Core Operations
//! - **replace**: literal, left-to-right, non-overlapping, optionally capped
//! - **substring**: character-position window, zero-copy
//! - **repeat**: bounded repetition
//! - **translate**: per-character mapping or deletion
//! - **concat** / **join**: element-wise and whole-column concatenation
//!
//! Every kernel that writes new bytes follows the sizing/fill pattern, with the
//! sizing pass reporting the exact byte count the fill pass writes.

#[cfg(feature = "fast_hash")]
use ahash::AHashMap;
#[cfg(not(feature = "fast_hash"))]
use std::collections::HashMap;

use memchr::memmem::Finder;

use crate::config::STRING_REPEAT_LIMIT;
use crate::errors::{log_length_mismatch, KernelError};
use crate::store::CharacterStore;
use crate::utils::ByteWriter;

/// Replaces occurrences of `target` with `repl`, at most `max` per element.
///
/// An empty `target` leaves the store unchanged. Occurrences are found left to right
/// and never overlap, so replacing `"aa"` in `"aaa"` rewrites only the first two bytes.
pub fn replace(
    store: &CharacterStore,
    target: &str,
    repl: &str,
    max: Option<usize>,
) -> Result<CharacterStore, KernelError> {
    if target.is_empty() || max == Some(0) {
        return Ok(store.clone());
    }
    let finder = Finder::new(target);
    let cap = max.unwrap_or(usize::MAX);
    store.transform(
        |v| {
            let text = v.as_str()?;
            let hits = finder.find_iter(text.as_bytes()).take(cap).count();
            Some(text.len() - hits * target.len() + hits * repl.len())
        },
        |v, out| {
            let text = v.as_bytes();
            let mut w = ByteWriter::new(out);
            let mut last = 0;
            for at in finder.find_iter(text).take(cap) {
                w.push_bytes(&text[last..at]);
                w.push_str(repl);
                last = at + target.len();
            }
            w.push_bytes(&text[last..]);
        },
    )
}

/// Characters `[start, start + len)` of every element; `len = None` runs to the end.
///
/// Positions past the end clamp, giving empty strings. The output shares the input
/// buffer.
pub fn substring(store: &CharacterStore, start: usize, len: Option<usize>) -> CharacterStore {
    store.share(store.len(), |i| {
        let v = store.view(i);
        if v.is_null() {
            return None;
        }
        let (from, to) = v.char_span(start, len);
        Some((i, from..to))
    })
}

/// Repeats every element `times` times.
///
/// # Errors
/// `InvalidArguments` when `times` exceeds [`STRING_REPEAT_LIMIT`].
pub fn repeat(store: &CharacterStore, times: usize) -> Result<CharacterStore, KernelError> {
    if times > STRING_REPEAT_LIMIT {
        return Err(KernelError::InvalidArguments(format!(
            "repeat: {} exceeds the limit of {}",
            times, STRING_REPEAT_LIMIT
        )));
    }
    store.transform(
        |v| v.as_str().map(|t| t.len().saturating_mul(times)),
        |v, out| {
            let mut w = ByteWriter::new(out);
            for _ in 0..times {
                w.push_bytes(v.as_bytes());
            }
        },
    )
}

/// Maps characters through `table`; a `None` target deletes the character.
/// Characters absent from the table pass through unchanged.
pub fn translate(
    store: &CharacterStore,
    table: &[(char, Option<char>)],
) -> Result<CharacterStore, KernelError> {
    #[cfg(feature = "fast_hash")]
    let map: AHashMap<char, Option<char>> = table.iter().copied().collect();
    #[cfg(not(feature = "fast_hash"))]
    let map: HashMap<char, Option<char>> = table.iter().copied().collect();

    let mapped = |c: char| map.get(&c).copied().unwrap_or(Some(c));
    store.transform(
        |v| {
            let text = v.as_str()?;
            Some(text.chars().filter_map(mapped).map(char::len_utf8).sum())
        },
        |v, out| {
            let mut w = ByteWriter::new(out);
            v.chars().filter_map(mapped).for_each(|c| w.push_char(c));
        },
    )
}

/// Concatenates corresponding elements of two stores with `sep` between them.
///
/// # Null Handling
/// The result is null where either input is null.
///
/// # Errors
/// `LengthMismatch` if the stores differ in length.
pub fn concat(
    lhs: &CharacterStore,
    rhs: &CharacterStore,
    sep: &str,
) -> Result<CharacterStore, KernelError> {
    if lhs.len() != rhs.len() {
        return Err(KernelError::LengthMismatch(log_length_mismatch(
            "concat",
            lhs.len(),
            rhs.len(),
        )));
    }
    CharacterStore::build(
        lhs.len(),
        |i| {
            let l = lhs.view(i).as_str()?;
            let r = rhs.view(i).as_str()?;
            Some(l.len() + sep.len() + r.len())
        },
        |i, out| {
            let mut w = ByteWriter::new(out);
            w.push_bytes(lhs.view(i).as_bytes());
            w.push_str(sep);
            w.push_bytes(rhs.view(i).as_bytes());
        },
    )
}

/// Joins every non-null element with `sep` into a one-element store.
///
/// An empty or all-null input joins to `""`.
pub fn join(store: &CharacterStore, sep: &str) -> Result<CharacterStore, KernelError> {
    let valid = store.len() - store.null_count();
    let total = store.value_bytes() + sep.len() * valid.saturating_sub(1);
    CharacterStore::build(
        1,
        |_| Some(total),
        |_, out| {
            let mut w = ByteWriter::new(out);
            for (k, s) in store.iter().flatten().enumerate() {
                if k > 0 {
                    w.push_str(sep);
                }
                w.push_str(s);
            }
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
    fn test_replace_all_and_capped() {
        let s = str_array(&[Some("a-b-c"), None, Some("none")]);
        let all = replace(&s, "-", "+-+", None).unwrap();
        assert_eq!(all, str_array(&[Some("a+-+b+-+c"), None, Some("none")]));
        let one = replace(&s, "-", "", Some(1)).unwrap();
        assert_eq!(one.get(0), Some("ab-c"));
    }

    #[test]
    fn test_replace_empty_target_is_noop() {
        let s = str_array(&[Some("abc")]);
        let out = replace(&s, "", "x", None).unwrap();
        assert_eq!(out, s);
        assert!(out.shares_buffer_with(&s));
    }

    #[test]
    fn test_replace_non_overlapping() {
        let s = str_array(&[Some("aaa")]);
        assert_eq!(replace(&s, "aa", "b", None).unwrap().get(0), Some("ba"));
    }

    #[test]
    fn test_replace_idempotent_when_repl_cannot_match() {
        let s = str_array(&[Some("aaa")]);
        let once = replace(&s, "a", "b", None).unwrap();
        let twice = replace(&once, "a", "b", None).unwrap();
        assert_eq!(once.get(0), Some("bbb"));
        assert_eq!(twice, once);
    }

    #[test]
    fn test_substring_chars() {
        let s = str_array(&[Some("héllo"), Some("ab"), None]);
        let out = substring(&s, 1, Some(3));
        assert_eq!(out, str_array(&[Some("éll"), Some("b"), None]));
        assert!(out.shares_buffer_with(&s));
        assert_eq!(substring(&s, 4, None).get(0), Some("o"));
    }

    #[test]
    fn test_repeat() {
        let s = str_array(&[Some("ab"), Some(""), None]);
        assert_eq!(repeat(&s, 3).unwrap(), str_array(&[Some("ababab"), Some(""), None]));
        assert!(repeat(&s, STRING_REPEAT_LIMIT + 1).is_err());
    }

    #[test]
    fn test_translate_maps_and_deletes() {
        let s = str_array(&[Some("hello")]);
        let out = translate(&s, &[('l', Some('ł')), ('o', None)]).unwrap();
        assert_eq!(out.get(0), Some("hełł"));
    }

    #[test]
    fn test_concat_nulls_and_mismatch() {
        let l = str_array(&[Some("a"), None, Some("c")]);
        let r = str_array(&[Some("x"), Some("y"), Some("")]);
        assert_eq!(
            concat(&l, &r, "-").unwrap(),
            str_array(&[Some("a-x"), None, Some("c-")])
        );
        let short = str_array(&[Some("a")]);
        assert!(matches!(
            concat(&l, &short, ""),
            Err(KernelError::LengthMismatch(_))
        ));
    }

    #[test]
    fn test_join_skips_nulls() {
        let s = str_array(&[Some("a"), None, Some("b"), Some("c")]);
        assert_eq!(join(&s, ", ").unwrap().get(0), Some("a, b, c"));
        assert_eq!(join(&str_array(&[None]), ",").unwrap().get(0), Some(""));
    }
}
