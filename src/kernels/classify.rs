// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Character Class Kernels** - *Per-Element Text Predicates*
//!
//! Tests whether every character of an element belongs to a class.
//! Empty elements are `false`; null elements stay null.

use crate::columns::BooleanColumn;
use crate::store::CharacterStore;

/// Character classes tested by [`is_class`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClassKind {
    Alpha,
    /// ASCII decimal digits.
    Digit,
    Alnum,
    Space,
    /// At least one cased character and no lower-case ones.
    Upper,
    /// At least one cased character and no upper-case ones.
    Lower,
    /// Any Unicode numeric character.
    Numeric,
}

#[inline]
fn all_chars(text: &str, f: impl Fn(char) -> bool) -> bool {
    !text.is_empty() && text.chars().all(f)
}

#[inline]
fn cased(text: &str, upper: bool) -> bool {
    let mut seen = false;
    for c in text.chars() {
        if c.is_uppercase() || c.is_lowercase() {
            if c.is_uppercase() != upper {
                return false;
            }
            seen = true;
        }
    }
    seen
}

#[inline]
fn matches_class(kind: CharClassKind, text: &str) -> bool {
    match kind {
        CharClassKind::Alpha => all_chars(text, char::is_alphabetic),
        CharClassKind::Digit => all_chars(text, |c| c.is_ascii_digit()),
        CharClassKind::Alnum => all_chars(text, char::is_alphanumeric),
        CharClassKind::Space => all_chars(text, char::is_whitespace),
        CharClassKind::Upper => cased(text, true),
        CharClassKind::Lower => cased(text, false),
        CharClassKind::Numeric => all_chars(text, char::is_numeric),
    }
}

/// Tests every element against `kind`.
pub fn is_class(store: &CharacterStore, kind: CharClassKind) -> BooleanColumn {
    BooleanColumn::from_store(store, |v| matches_class(kind, v.text()))
}

/// Generates a named predicate kernel for one character class.
macro_rules! class_predicate {
    ($fn_name:ident, $kind:ident) => {
        #[doc = concat!("Element-wise `", stringify!($kind), "` test. See [`CharClassKind`].")]
        pub fn $fn_name(store: &CharacterStore) -> BooleanColumn {
            is_class(store, CharClassKind::$kind)
        }
    };
}

class_predicate!(is_alpha, Alpha);
class_predicate!(is_digit, Digit);
class_predicate!(is_alnum, Alnum);
class_predicate!(is_space, Space);
class_predicate!(is_upper, Upper);
class_predicate!(is_lower, Lower);
class_predicate!(is_numeric, Numeric);

#[cfg(test)]
mod tests {
    use super::*;

    fn str_array(vals: &[Option<&str>]) -> CharacterStore {
        CharacterStore::from_opt_strs(vals).unwrap()
    }

    #[test]
    fn test_alpha_digit_alnum() {
        let s = str_array(&[Some("abcé"), Some("123"), Some("a1"), Some(""), None]);
        assert_eq!(
            is_alpha(&s).to_vec(),
            vec![Some(true), Some(false), Some(false), Some(false), None]
        );
        assert_eq!(
            is_digit(&s).to_vec(),
            vec![Some(false), Some(true), Some(false), Some(false), None]
        );
        assert_eq!(
            is_alnum(&s).to_vec(),
            vec![Some(true), Some(true), Some(true), Some(false), None]
        );
    }

    #[test]
    fn test_space_and_numeric() {
        let s = str_array(&[Some(" \t\u{3000}"), Some("½Ⅻ"), Some("٣")]);
        assert_eq!(is_space(&s).to_vec(), vec![Some(true), Some(false), Some(false)]);
        assert_eq!(is_numeric(&s).to_vec(), vec![Some(false), Some(true), Some(true)]);
        assert_eq!(is_digit(&s).get(2), Some(false));
    }

    #[test]
    fn test_upper_lower_ignore_uncased() {
        let s = str_array(&[Some("ABC 1"), Some("abc!"), Some("Abc"), Some("123")]);
        assert_eq!(
            is_upper(&s).to_vec(),
            vec![Some(true), Some(false), Some(false), Some(false)]
        );
        assert_eq!(
            is_lower(&s).to_vec(),
            vec![Some(false), Some(true), Some(false), Some(false)]
        );
    }
}
