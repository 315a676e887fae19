// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Comparison and Sorting Kernels** - *Ordering, Predicates and Set Membership*
//!
//! Byte-wise lexicographic comparison of store elements against a scalar, against
//! another store, or against a set, plus stable argsort and sort.
//!
//! Regular sorts here produce a new store.
//! The argsort variants return the indices.
//!
//! ## Null ordering
//! Nulls sort **first** by default, the same convention the category builder uses.
//! [`NullOrder::Last`] moves them to the end. Descending order reverses the valid
//! values only; null placement always follows [`NullOrder`].

#[cfg(feature = "fast_hash")]
use ahash::AHashSet;
#[cfg(not(feature = "fast_hash"))]
use std::collections::HashSet;

use std::cmp::Ordering;

use arrow_buffer::BooleanBuffer;

use crate::columns::BooleanColumn;
use crate::device::{launch_map, sort_indices};
use crate::errors::{log_length_mismatch, KernelError};
use crate::operators::ComparisonOperator;
use crate::store::CharacterStore;
use crate::utils::merge_nulls;
use crate::view::StrView;

/// Where nulls go in sorted output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullOrder {
    #[default]
    First,
    Last,
}

/// Configuration for argsort
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgsortConfig {
    pub descending: bool,
    pub nulls: NullOrder,
}

impl ArgsortConfig {
    /// Create a new config with default settings (ascending, nulls first)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set descending order
    pub fn descending(mut self, descending: bool) -> Self {
        self.descending = descending;
        self
    }

    /// Set null placement
    pub fn nulls(mut self, nulls: NullOrder) -> Self {
        self.nulls = nulls;
        self
    }
}

#[inline]
fn ordering_holds(op: ComparisonOperator, ord: Ordering) -> bool {
    match op {
        ComparisonOperator::Equals => ord == Ordering::Equal,
        ComparisonOperator::NotEquals => ord != Ordering::Equal,
        ComparisonOperator::LessThan => ord == Ordering::Less,
        ComparisonOperator::LessThanOrEqualTo => ord != Ordering::Greater,
        ComparisonOperator::GreaterThan => ord == Ordering::Greater,
        ComparisonOperator::GreaterThanOrEqualTo => ord != Ordering::Less,
        ComparisonOperator::IsNull | ComparisonOperator::IsNotNull => false,
    }
}

/// Compares every element against `rhs`.
///
/// Ordering operators give null for null rows. `IsNull` and `IsNotNull` always
/// produce a valid boolean and ignore `rhs`.
pub fn compare_scalar(store: &CharacterStore, op: ComparisonOperator, rhs: &str) -> BooleanColumn {
    match op {
        ComparisonOperator::IsNull | ComparisonOperator::IsNotNull => {
            let want_null = op == ComparisonOperator::IsNull;
            BooleanColumn::new(
                BooleanBuffer::collect_bool(store.len(), |i| store.is_null(i) == want_null),
                None,
            )
        }
        _ => BooleanColumn::from_store(store, |v| {
            ordering_holds(op, v.as_bytes().cmp(rhs.as_bytes()))
        }),
    }
}

/// Element-wise comparison of two stores. Null where either side is null.
///
/// # Errors
/// `LengthMismatch` if the stores differ in length.
pub fn compare_str_str(
    lhs: &CharacterStore,
    rhs: &CharacterStore,
    op: ComparisonOperator,
) -> Result<BooleanColumn, KernelError> {
    if lhs.len() != rhs.len() {
        return Err(KernelError::LengthMismatch(log_length_mismatch(
            "compare_str_str",
            lhs.len(),
            rhs.len(),
        )));
    }
    if matches!(op, ComparisonOperator::IsNull | ComparisonOperator::IsNotNull) {
        return Ok(compare_scalar(lhs, op, ""));
    }
    let values = launch_map(lhs.len(), |i| {
        let (l, r) = (lhs.view(i), rhs.view(i));
        l.is_valid() && r.is_valid() && ordering_holds(op, l.as_bytes().cmp(r.as_bytes()))
    });
    Ok(BooleanColumn::new(
        BooleanBuffer::from(values),
        merge_nulls(lhs.nulls().as_ref(), rhs.nulls().as_ref()),
    ))
}

/// Tests membership of every element in `set`. Nulls in `set` are ignored.
pub fn is_in(store: &CharacterStore, set: &CharacterStore) -> BooleanColumn {
    #[cfg(feature = "fast_hash")]
    let lookup: AHashSet<&str> = set.iter().flatten().collect();
    #[cfg(not(feature = "fast_hash"))]
    let lookup: HashSet<&str> = set.iter().flatten().collect();

    BooleanColumn::from_store(store, |v| lookup.contains(v.text()))
}

/// Total order used by the sort kernels.
#[inline]
fn sort_order(a: StrView<'_>, b: StrView<'_>, config: &ArgsortConfig) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => match config.nulls {
            NullOrder::First => Ordering::Less,
            NullOrder::Last => Ordering::Greater,
        },
        (false, true) => match config.nulls {
            NullOrder::First => Ordering::Greater,
            NullOrder::Last => Ordering::Less,
        },
        (false, false) => {
            let ord = a.as_bytes().cmp(b.as_bytes());
            if config.descending { ord.reverse() } else { ord }
        }
    }
}

/// Stable argsort of the store by byte-wise value.
///
/// Equal values keep their original relative order.
pub fn argsort(store: &CharacterStore, config: &ArgsortConfig) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..store.len()).collect();
    sort_indices(&mut indices, |&i, &j| {
        sort_order(store.view(i), store.view(j), config)
    });
    indices
}

/// Returns a sorted copy of the store.
pub fn sort(store: &CharacterStore, config: &ArgsortConfig) -> Result<CharacterStore, KernelError> {
    store.gather(&argsort(store, config))
}
