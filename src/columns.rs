// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Result Columns** - *Fixed-Width and Nested Kernel Outputs*
//!
//! Kernels that do not produce a [`CharacterStore`] return one of these:
//! - [`BooleanColumn`]: predicates and comparisons
//! - [`NumericColumn`]: parsed numbers, lengths, positions, counts and hashes
//! - [`ListColumn`]: a list of strings per row (split, findall)
//! - [`MatchColumn`]: the leftmost match of a pattern per row
//!
//! Validity uses Arrow-compatible bitmaps (1 = valid); `None` means no nulls.

use arrow_buffer::{ArrowNativeType, BooleanBuffer, NullBuffer, ScalarBuffer};

use crate::device::launch_map;
use crate::store::CharacterStore;
use crate::utils::{is_valid_at, validity_from_fn};
use crate::view::StrView;

/// Boolean values with optional validity.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanColumn {
    pub values: BooleanBuffer,
    pub nulls: Option<NullBuffer>,
}

impl BooleanColumn {
    pub fn new(values: BooleanBuffer, nulls: Option<NullBuffer>) -> Self {
        Self { values, nulls }
    }

    /// Predicate pass: one worker per row, null rows stay null.
    pub fn from_store<F>(store: &CharacterStore, f: F) -> Self
    where
        F: Fn(StrView<'_>) -> bool + Sync + Send,
    {
        let values = launch_map(store.len(), |i| {
            let v = store.view(i);
            v.is_valid() && f(v)
        });
        Self {
            values: BooleanBuffer::from(values),
            nulls: store.nulls(),
        }
    }

    pub fn from_options(values: &[Option<bool>]) -> Self {
        Self {
            values: BooleanBuffer::collect_bool(values.len(), |i| values[i].unwrap_or(false)),
            nulls: validity_from_fn(values.len(), |i| values[i].is_some()),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<bool> {
        is_valid_at(self.nulls.as_ref(), i).then(|| self.values.value(i))
    }

    pub fn null_count(&self) -> usize {
        self.nulls.as_ref().map_or(0, |n| n.null_count())
    }

    /// Number of valid `true` values.
    pub fn true_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.get(i) == Some(true)).count()
    }

    pub fn to_vec(&self) -> Vec<Option<bool>> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }
}

/// Fixed-width numeric values with optional validity.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericColumn<T: ArrowNativeType> {
    pub values: ScalarBuffer<T>,
    pub nulls: Option<NullBuffer>,
}

impl<T: ArrowNativeType> NumericColumn<T> {
    pub fn new(values: ScalarBuffer<T>, nulls: Option<NullBuffer>) -> Self {
        Self { values, nulls }
    }

    /// Single fixed-width pass: one worker per row. Null rows and rows where `f`
    /// returns `None` are null.
    pub fn from_store<F>(store: &CharacterStore, f: F) -> Self
    where
        F: Fn(StrView<'_>) -> Option<T> + Sync + Send,
    {
        Self::from_options(launch_map(store.len(), |i| {
            let v = store.view(i);
            if v.is_null() { None } else { f(v) }
        }))
    }

    /// Column from per-row results; `None` rows become null with a default value.
    pub fn from_options(values: Vec<Option<T>>) -> Self {
        let nulls = validity_from_fn(values.len(), |i| values[i].is_some());
        let values: Vec<T> = values.into_iter().map(Option::unwrap_or_default).collect();
        Self {
            values: values.into(),
            nulls,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<T> {
        is_valid_at(self.nulls.as_ref(), i).then(|| self.values[i])
    }

    pub fn null_count(&self) -> usize {
        self.nulls.as_ref().map_or(0, |n| n.null_count())
    }

    pub fn to_vec(&self) -> Vec<Option<T>> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }
}

/// A list of strings per row.
///
/// Row `i` holds pieces `row_offsets[i]..row_offsets[i + 1]` of `values`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListColumn {
    pub values: CharacterStore,
    pub row_offsets: ScalarBuffer<i64>,
    pub nulls: Option<NullBuffer>,
}

impl ListColumn {
    #[inline]
    pub fn len(&self) -> usize {
        self.row_offsets.len().saturating_sub(1)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_null(&self, i: usize) -> bool {
        !is_valid_at(self.nulls.as_ref(), i)
    }

    /// Piece indices of row `i` in `values`.
    #[inline]
    pub fn row_range(&self, i: usize) -> std::ops::Range<usize> {
        self.row_offsets[i] as usize..self.row_offsets[i + 1] as usize
    }

    /// Number of pieces in row `i` (0 for null rows).
    pub fn row_len(&self, i: usize) -> usize {
        self.row_range(i).len()
    }

    /// Pieces of row `i`, or `None` for a null row.
    pub fn row(&self, i: usize) -> Option<Vec<&str>> {
        if self.is_null(i) {
            return None;
        }
        Some(
            self.row_range(i)
                .map(|k| self.values.view(k).text())
                .collect(),
        )
    }

    pub fn to_vec(&self) -> Vec<Option<Vec<String>>> {
        (0..self.len())
            .map(|i| self.row(i).map(|r| r.into_iter().map(str::to_string).collect()))
            .collect()
    }
}

/// Leftmost match per row as a character position and character length.
///
/// Positions use `-1` for rows with no match; null input rows are null.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchColumn {
    pub positions: ScalarBuffer<i32>,
    pub lengths: ScalarBuffer<i32>,
    pub nulls: Option<NullBuffer>,
}

impl MatchColumn {
    pub const NO_MATCH: i32 = -1;

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// `None` for null rows, `Some(None)` when the row did not match,
    /// `Some(Some((position, length)))` otherwise.
    pub fn get(&self, i: usize) -> Option<Option<(usize, usize)>> {
        if !is_valid_at(self.nulls.as_ref(), i) {
            return None;
        }
        let pos = self.positions[i];
        if pos == Self::NO_MATCH {
            Some(None)
        } else {
            Some(Some((pos as usize, self.lengths[i] as usize)))
        }
    }

    pub fn to_vec(&self) -> Vec<Option<Option<(usize, usize)>>> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }
}
