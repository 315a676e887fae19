// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Numeric Conversion Kernels** - *Parse, Format and Hash*
//!
//! ## Core Operations
//! - **parse_int / parse_int_radix / parse_float**: single fixed-width pass into a
//!   [`NumericColumn`]. Leading and trailing ASCII whitespace is ignored. Unparsable
//!   or out-of-range text yields a null element, never an error.
//! - **format_int / format_float**: two-pass formatting back into a store, via `itoa`
//!   and `ryu` (shortest round-trip representation).
//! - **hash**: deterministic 64-bit hash of every element's bytes.

use std::hash::BuildHasher;

use arrow_buffer::ArrowNativeType;
use num_traits::{Float, Num, PrimInt};

use crate::columns::NumericColumn;
#[cfg(feature = "fast_hash")]
use crate::config::HASH_SEEDS;
use crate::errors::KernelError;
use crate::store::CharacterStore;

/// Parses base-10 integers. Overflow and malformed text give nulls.
pub fn parse_int<T>(store: &CharacterStore) -> NumericColumn<T>
where
    T: ArrowNativeType + PrimInt,
{
    NumericColumn::from_store(store, |v| T::from_str_radix(v.text().trim_ascii(), 10).ok())
}

/// Parses integers in `radix`.
///
/// # Errors
/// `InvalidArguments` unless `2 <= radix <= 36`.
pub fn parse_int_radix<T>(store: &CharacterStore, radix: u32) -> Result<NumericColumn<T>, KernelError>
where
    T: ArrowNativeType + PrimInt,
{
    if !(2..=36).contains(&radix) {
        return Err(KernelError::InvalidArguments(format!(
            "parse_int_radix: radix {} outside 2..=36",
            radix
        )));
    }
    Ok(NumericColumn::from_store(store, |v| {
        T::from_str_radix(v.text().trim_ascii(), radix).ok()
    }))
}

/// Parses floating point numbers.
///
/// `inf` and `nan` spellings parse to their values; finite text whose value overflows
/// to infinity is treated as out of range and gives a null.
pub fn parse_float<T>(store: &CharacterStore) -> NumericColumn<T>
where
    T: ArrowNativeType + Float,
{
    NumericColumn::from_store(store, |v| {
        let text = v.text().trim_ascii();
        let x = <T as Num>::from_str_radix(text, 10).ok()?;
        if x.is_finite() || names_non_finite(text) {
            Some(x)
        } else {
            None
        }
    })
}

#[inline]
fn names_non_finite(text: &str) -> bool {
    let t = text.trim_start_matches(['+', '-']).as_bytes();
    t.eq_ignore_ascii_case(b"inf")
        || t.eq_ignore_ascii_case(b"infinity")
        || t.eq_ignore_ascii_case(b"nan")
}

/// Formats integers in base 10; null values stay null.
pub fn format_int<T>(col: &NumericColumn<T>) -> Result<CharacterStore, KernelError>
where
    T: ArrowNativeType + itoa::Integer,
{
    CharacterStore::build(
        col.len(),
        |i| col.get(i).map(|x| itoa::Buffer::new().format(x).len()),
        |i, out| {
            if let Some(x) = col.get(i) {
                out.copy_from_slice(itoa::Buffer::new().format(x).as_bytes());
            }
        },
    )
}

/// Formats floats with the shortest representation that round-trips.
///
/// Null, infinite and NaN values give nulls.
pub fn format_float<T>(col: &NumericColumn<T>) -> Result<CharacterStore, KernelError>
where
    T: ArrowNativeType + Float + ryu::Float,
{
    let finite = |i: usize| col.get(i).filter(|x| x.is_finite());
    CharacterStore::build(
        col.len(),
        |i| finite(i).map(|x| ryu::Buffer::new().format_finite(x).len()),
        |i, out| {
            if let Some(x) = finite(i) {
                out.copy_from_slice(ryu::Buffer::new().format_finite(x).as_bytes());
            }
        },
    )
}

/// Deterministic 64-bit hash of every element. Null rows are null.
///
/// Hashes are stable for a given build and feature set, not across crate versions.
pub fn hash(store: &CharacterStore) -> NumericColumn<u64> {
    #[cfg(feature = "fast_hash")]
    let state =
        ahash::RandomState::with_seeds(HASH_SEEDS[0], HASH_SEEDS[1], HASH_SEEDS[2], HASH_SEEDS[3]);
    #[cfg(not(feature = "fast_hash"))]
    let state = std::hash::BuildHasherDefault::<std::collections::hash_map::DefaultHasher>::default();

    NumericColumn::from_store(store, |v| Some(BuildHasher::hash_one(&state, v.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn str_array(vals: &[Option<&str>]) -> CharacterStore {
        CharacterStore::from_opt_strs(vals).unwrap()
    }

    #[test]
    fn test_parse_int_nulls_on_bad_input() {
        let s = str_array(&[Some(" 42 "), Some("-7"), Some("x1"), Some("300"), None, Some("")]);
        let out = parse_int::<i8>(&s);
        assert_eq!(out.to_vec(), vec![Some(42), Some(-7), None, None, None, None]);
        let wide = parse_int::<i64>(&s);
        assert_eq!(wide.get(3), Some(300));
    }

    #[test]
    fn test_parse_int_radix() {
        let s = str_array(&[Some("ff"), Some("101"), Some("zz")]);
        let hex = parse_int_radix::<u32>(&s, 16).unwrap();
        assert_eq!(hex.to_vec(), vec![Some(255), Some(257), None]);
        assert!(parse_int_radix::<u32>(&s, 1).is_err());
    }

    #[test]
    fn test_parse_float() {
        let s = str_array(&[Some("1.5"), Some("-2e3"), Some("1e400"), Some("inf"), Some("abc")]);
        let out = parse_float::<f64>(&s);
        assert_eq!(out.get(0), Some(1.5));
        assert_eq!(out.get(1), Some(-2000.0));
        assert_eq!(out.get(2), None);
        assert_eq!(out.get(3), Some(f64::INFINITY));
        assert_eq!(out.get(4), None);
        let narrow = parse_float::<f32>(&s);
        assert_eq!(narrow.get(2), None);
    }

    #[test]
    fn test_format_int_and_float() {
        let ints = NumericColumn::from_options(vec![Some(-12i64), None, Some(0)]);
        assert_eq!(
            format_int(&ints).unwrap(),
            str_array(&[Some("-12"), None, Some("0")])
        );
        let floats = NumericColumn::from_options(vec![Some(0.1f64), Some(f64::NAN), Some(2.0)]);
        assert_eq!(
            format_float(&floats).unwrap(),
            str_array(&[Some("0.1"), None, Some("2.0")])
        );
    }

    #[test]
    fn test_hash_deterministic() {
        let s = str_array(&[Some("a"), Some("b"), Some("a"), None]);
        let h = hash(&s);
        assert_eq!(h.get(0), h.get(2));
        assert_ne!(h.get(0), h.get(1));
        assert_eq!(h.get(3), None);
        assert_eq!(hash(&s), h);
    }
}
