// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Literal Search Kernels** - *Substring Location and Length Measures*
//!
//! Literal search over every element with a single shared `memchr::memmem` finder.
//! Positions are character positions. Null rows are null in every output.

use memchr::memmem::{Finder, FinderRev};

use crate::columns::{BooleanColumn, NumericColumn};
use crate::store::CharacterStore;
use crate::utils::to_i32;

/// Returned by [`find`] and [`rfind`] for rows without an occurrence.
pub const NOT_FOUND: i32 = -1;

/// Character position of the first occurrence of `needle`, or [`NOT_FOUND`].
pub fn find(store: &CharacterStore, needle: &str) -> NumericColumn<i32> {
    let finder = Finder::new(needle);
    NumericColumn::from_store(store, |v| {
        Some(
            finder
                .find(v.as_bytes())
                .map_or(NOT_FOUND, |b| to_i32(v.char_position(b))),
        )
    })
}

/// Character position of the last occurrence of `needle`, or [`NOT_FOUND`].
pub fn rfind(store: &CharacterStore, needle: &str) -> NumericColumn<i32> {
    let finder = FinderRev::new(needle);
    NumericColumn::from_store(store, |v| {
        Some(
            finder
                .rfind(v.as_bytes())
                .map_or(NOT_FOUND, |b| to_i32(v.char_position(b))),
        )
    })
}

/// Number of non-overlapping occurrences of `needle`.
///
/// An empty needle matches between every pair of characters and at both ends.
pub fn count(store: &CharacterStore, needle: &str) -> NumericColumn<i32> {
    let finder = Finder::new(needle);
    NumericColumn::from_store(store, |v| {
        let n = if needle.is_empty() {
            v.char_count() + 1
        } else {
            finder.find_iter(v.as_bytes()).count()
        };
        Some(to_i32(n))
    })
}

pub fn contains(store: &CharacterStore, needle: &str) -> BooleanColumn {
    let finder = Finder::new(needle);
    BooleanColumn::from_store(store, |v| finder.find(v.as_bytes()).is_some())
}

pub fn starts_with(store: &CharacterStore, prefix: &str) -> BooleanColumn {
    BooleanColumn::from_store(store, |v| v.starts_with(prefix))
}

pub fn ends_with(store: &CharacterStore, suffix: &str) -> BooleanColumn {
    BooleanColumn::from_store(store, |v| v.ends_with(suffix))
}

/// Length of every element in characters.
pub fn char_len(store: &CharacterStore) -> NumericColumn<i32> {
    NumericColumn::from_store(store, |v| Some(to_i32(v.char_count())))
}

/// Length of every element in bytes.
pub fn byte_len(store: &CharacterStore) -> NumericColumn<i32> {
    NumericColumn::from_store(store, |v| Some(to_i32(v.byte_len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn str_array(vals: &[Option<&str>]) -> CharacterStore {
        CharacterStore::from_opt_strs(vals).unwrap()
    }

    #[test]
    fn test_find_rfind_char_positions() {
        let s = str_array(&[Some("añaña"), Some("xyz"), None]);
        assert_eq!(find(&s, "a").to_vec(), vec![Some(0), Some(NOT_FOUND), None]);
        assert_eq!(find(&s, "ña").to_vec()[0], Some(1));
        assert_eq!(rfind(&s, "ña").to_vec()[0], Some(3));
        assert_eq!(find(&s, "").get(1), Some(0));
    }

    #[test]
    fn test_count_non_overlapping() {
        let s = str_array(&[Some("aaaa"), Some("abc"), None]);
        assert_eq!(count(&s, "aa").to_vec(), vec![Some(2), Some(0), None]);
        assert_eq!(count(&s, "").get(1), Some(4));
    }

    #[test]
    fn test_predicates() {
        let s = str_array(&[Some("prefix-body"), Some(""), None]);
        assert_eq!(
            contains(&s, "-b").to_vec(),
            vec![Some(true), Some(false), None]
        );
        assert_eq!(
            starts_with(&s, "pre").to_vec(),
            vec![Some(true), Some(false), None]
        );
        assert_eq!(
            ends_with(&s, "").to_vec(),
            vec![Some(true), Some(true), None]
        );
    }

    #[test]
    fn test_lengths() {
        let s = str_array(&[Some("größe"), None, Some("")]);
        assert_eq!(char_len(&s).to_vec(), vec![Some(5), None, Some(0)]);
        assert_eq!(byte_len(&s).to_vec(), vec![Some(7), None, Some(0)]);
    }
}
