// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Case Folding Kernels** - *Unicode Case Conversion*
//!
//! Upper, lower, swap, capitalise and title case over a whole store.
//!
//! Full Unicode mappings can change byte length (`ß` → `SS`, `İ` → `i̇`), so every
//! mode runs as a sizing pass followed by a fill pass. ASCII elements take a byte-wise
//! fast path in both passes.

use crate::errors::KernelError;
use crate::store::CharacterStore;
use crate::utils::ByteWriter;

/// Case conversion applied by [`fold_case`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMode {
    Upper,
    Lower,
    /// Upper-case letters become lower case and vice versa.
    SwapCase,
    /// First character upper case, the rest lower case.
    Capitalize,
    /// First letter of every alphabetic run upper case, the rest lower case.
    Title,
}

/// Streams the converted characters of `text` into `emit`.
#[inline]
fn emit_folded<F: FnMut(char)>(mode: CaseMode, text: &str, mut emit: F) {
    let mut prev_alpha = false;
    for (k, c) in text.chars().enumerate() {
        let upper = match mode {
            CaseMode::Upper => true,
            CaseMode::Lower => false,
            CaseMode::SwapCase => {
                if c.is_uppercase() {
                    false
                } else if c.is_lowercase() {
                    true
                } else {
                    emit(c);
                    continue;
                }
            }
            CaseMode::Capitalize => k == 0,
            CaseMode::Title => {
                let up = !prev_alpha;
                prev_alpha = c.is_alphabetic();
                up
            }
        };
        if upper {
            c.to_uppercase().for_each(&mut emit);
        } else {
            c.to_lowercase().for_each(&mut emit);
        }
    }
}

#[inline]
fn fold_ascii(mode: CaseMode, src: &[u8], out: &mut [u8]) {
    let mut prev_alpha = false;
    for (k, (&b, o)) in src.iter().zip(out.iter_mut()).enumerate() {
        *o = match mode {
            CaseMode::Upper => b.to_ascii_uppercase(),
            CaseMode::Lower => b.to_ascii_lowercase(),
            CaseMode::SwapCase if b.is_ascii_uppercase() => b.to_ascii_lowercase(),
            CaseMode::SwapCase => b.to_ascii_uppercase(),
            CaseMode::Capitalize if k == 0 => b.to_ascii_uppercase(),
            CaseMode::Capitalize => b.to_ascii_lowercase(),
            CaseMode::Title => {
                let up = !prev_alpha;
                prev_alpha = b.is_ascii_alphabetic();
                if up { b.to_ascii_uppercase() } else { b.to_ascii_lowercase() }
            }
        };
    }
}

/// Applies `mode` to every element; nulls stay null.
///
/// # Errors
/// Propagates allocation and offset overflow errors from the two-pass build.
pub fn fold_case(store: &CharacterStore, mode: CaseMode) -> Result<CharacterStore, KernelError> {
    store.transform(
        |v| {
            let text = v.as_str()?;
            if text.is_ascii() {
                return Some(text.len());
            }
            let mut n = 0;
            emit_folded(mode, text, |c| n += c.len_utf8());
            Some(n)
        },
        |v, out| {
            if v.is_ascii() {
                fold_ascii(mode, v.as_bytes(), out);
                return;
            }
            let mut w = ByteWriter::new(out);
            emit_folded(mode, v.text(), |c| w.push_char(c));
            debug_assert!(w.is_full());
        },
    )
}

pub fn to_upper(store: &CharacterStore) -> Result<CharacterStore, KernelError> {
    fold_case(store, CaseMode::Upper)
}

pub fn to_lower(store: &CharacterStore) -> Result<CharacterStore, KernelError> {
    fold_case(store, CaseMode::Lower)
}

pub fn swap_case(store: &CharacterStore) -> Result<CharacterStore, KernelError> {
    fold_case(store, CaseMode::SwapCase)
}

pub fn capitalize(store: &CharacterStore) -> Result<CharacterStore, KernelError> {
    fold_case(store, CaseMode::Capitalize)
}

pub fn title(store: &CharacterStore) -> Result<CharacterStore, KernelError> {
    fold_case(store, CaseMode::Title)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn str_array(vals: &[Option<&str>]) -> CharacterStore {
        CharacterStore::from_opt_strs(vals).unwrap()
    }

    #[test]
    fn test_upper_expands_bytes() {
        let s = str_array(&[Some("straße"), None, Some("abc")]);
        let out = to_upper(&s).unwrap();
        assert_eq!(out, str_array(&[Some("STRASSE"), None, Some("ABC")]));
    }

    #[test]
    fn test_lower_unicode() {
        let s = str_array(&[Some("ÀÉÎ"), Some("İ")]);
        let out = to_lower(&s).unwrap();
        assert_eq!(out.get(0), Some("àéî"));
        assert_eq!(out.get(1), Some("i\u{307}"));
    }

    #[test]
    fn test_swapcase() {
        let s = str_array(&[Some("Hello World 1"), Some("aß")]);
        let out = swap_case(&s).unwrap();
        assert_eq!(out.get(0), Some("hELLO wORLD 1"));
        assert_eq!(out.get(1), Some("ASS"));
    }

    #[test]
    fn test_capitalize_and_title() {
        let s = str_array(&[Some("hELLO wORLD"), Some("élan vital"), Some("")]);
        assert_eq!(
            capitalize(&s).unwrap(),
            str_array(&[Some("Hello world"), Some("Élan vital"), Some("")])
        );
        assert_eq!(
            title(&s).unwrap(),
            str_array(&[Some("Hello World"), Some("Élan Vital"), Some("")])
        );
    }

    #[test]
    fn test_title_word_boundaries() {
        let s = str_array(&[Some("ab-cd e2f")]);
        assert_eq!(title(&s).unwrap().get(0), Some("Ab-Cd E2F"));
    }
}
