// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Character Store** - *Immutable Columnar String Storage*
//!
//! A column of optional UTF-8 strings held as one contiguous byte buffer plus a
//! per-element `(offset, length)` table. Null elements carry [`NULL_LENGTH`] and
//! contribute no bytes.
//!
//! ## Construction
//! Every store that needs fresh bytes is produced by the same two-pass pattern:
//! sizing pass, exclusive prefix sum, one fallible allocation, parallel fill.
//! See [`CharacterStore::build`].
//!
//! ## Sharing
//! Buffers are reference counted, so [`Clone`] is O(1). Kernels whose results are
//! sub-ranges of their input (strip, substring, split pieces, extracted groups) return
//! stores that point into the parent's buffer instead of copying it. Use
//! [`CharacterStore::compact`] to materialise a dense private copy.
//!
//! ## Invariants
//! - `offsets` are monotonically non-decreasing
//! - `offset[i] + length[i] <= data.len()` for valid elements
//! - null ⇔ `length[i] == NULL_LENGTH`
//! - the bytes of every valid element are valid UTF-8

use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

use arrow_buffer::{Buffer, NullBuffer, ScalarBuffer};
use log::debug;

use crate::device::{exclusive_scan, launch_fill, launch_map, split_disjoint, try_alloc};
use crate::errors::KernelError;
use crate::utils::validity_from_fn;
use crate::view::StrView;

/// Length sentinel marking a null element.
pub const NULL_LENGTH: i32 = -1;

/// Immutable column of optional strings.
#[derive(Clone)]
pub struct CharacterStore {
    data: Buffer,
    offsets: ScalarBuffer<i64>,
    lengths: ScalarBuffer<i32>,
    null_count: usize,
}

impl CharacterStore {
    /// Two-pass construction of a store with `n` elements.
    ///
    /// # Parameters
    /// - `size`: byte length of element `i`, or `None` for a null element
    /// - `write`: fills element `i`; receives a range of exactly the size reported
    ///
    /// `write` is only called for valid elements. Every written element is checked
    /// to be UTF-8 before the store is returned.
    ///
    /// # Errors
    /// - `InvalidArguments` if `write` leaves an element that is not valid UTF-8
    /// - `Overflow` if one element exceeds `i32::MAX` bytes or the total exceeds `i64::MAX`
    /// - `OutOfMemory` if the output buffer cannot be allocated
    pub fn build<S, W>(n: usize, size: S, write: W) -> Result<Self, KernelError>
    where
        S: Fn(usize) -> Option<usize> + Sync + Send,
        W: Fn(usize, &mut [u8]) + Sync + Send,
    {
        let sized = launch_map(n, size);

        let mut lengths = try_alloc(n, NULL_LENGTH)?;
        let mut sizes = try_alloc(n, 0usize)?;
        let mut null_count = 0;
        for (i, s) in sized.into_iter().enumerate() {
            match s {
                Some(len) => {
                    lengths[i] = i32::try_from(len).map_err(|_| {
                        KernelError::Overflow(format!(
                            "element {} is {} bytes, above the {} byte element limit",
                            i,
                            len,
                            i32::MAX
                        ))
                    })?;
                    sizes[i] = len;
                }
                None => null_count += 1,
            }
        }

        let (starts, total) = exclusive_scan(&sizes)?;
        if i64::try_from(total).is_err() {
            return Err(KernelError::Overflow(format!(
                "store of {} bytes exceeds offset range",
                total
            )));
        }

        let mut buf = try_alloc(total, 0u8)?;
        let first_invalid = AtomicUsize::new(usize::MAX);
        {
            let lengths = &lengths;
            let ranges = split_disjoint(&mut buf, sizes.iter().copied());
            launch_fill(ranges, |i, out| {
                if lengths[i] != NULL_LENGTH {
                    write(i, out);
                    if std::str::from_utf8(out).is_err() {
                        first_invalid.fetch_min(i, Ordering::Relaxed);
                    }
                }
            });
        }
        let first_invalid = first_invalid.into_inner();
        if first_invalid != usize::MAX {
            return Err(KernelError::InvalidArguments(format!(
                "element {} was written as invalid UTF-8",
                first_invalid
            )));
        }
        debug!(
            "built store: {} elements, {} nulls, {} bytes",
            n, null_count, total
        );

        Ok(Self {
            data: Buffer::from_vec(buf),
            offsets: starts.into_iter().map(|s| s as i64).collect(),
            lengths: lengths.into(),
            null_count,
        })
    }

    /// Two-pass construction with one output element per element of `self`.
    pub fn transform<S, W>(&self, size: S, write: W) -> Result<Self, KernelError>
    where
        S: Fn(StrView<'_>) -> Option<usize> + Sync + Send,
        W: Fn(StrView<'_>, &mut [u8]) + Sync + Send,
    {
        Self::build(
            self.len(),
            |i| size(self.view(i)),
            |i, out| write(self.view(i), out),
        )
    }

    /// Store sharing this store's buffer, with element `k` spanning `range` inside
    /// row `row` where `span(k) = Some((row, range))`, or null.
    ///
    /// Spans must be produced in buffer order (non-decreasing rows, and non-decreasing
    /// ranges within a row).
    pub(crate) fn share<F>(&self, n: usize, span: F) -> Self
    where
        F: Fn(usize) -> Option<(usize, Range<usize>)> + Sync + Send,
    {
        let spans = launch_map(n, |k| {
            span(k).map(|(row, r)| (self.offsets[row] + r.start as i64, r.len() as i32))
        });
        let mut offsets = Vec::with_capacity(n);
        let mut lengths = Vec::with_capacity(n);
        let mut null_count = 0;
        let mut cursor = 0i64;
        for s in spans {
            match s {
                Some((off, len)) => {
                    debug_assert!(off >= cursor, "shared spans out of buffer order");
                    cursor = off;
                    offsets.push(off);
                    lengths.push(len);
                }
                None => {
                    null_count += 1;
                    offsets.push(cursor);
                    lengths.push(NULL_LENGTH);
                }
            }
        }
        Self {
            data: self.data.clone(),
            offsets: offsets.into(),
            lengths: lengths.into(),
            null_count,
        }
    }

    /// Builds a store from optional host strings.
    pub fn from_values<I, S>(values: I) -> Result<Self, KernelError>
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str> + Sync,
    {
        let values: Vec<Option<S>> = values.into_iter().collect();
        Self::build(
            values.len(),
            |i| values[i].as_ref().map(|s| s.as_ref().len()),
            |i, out| {
                if let Some(s) = &values[i] {
                    out.copy_from_slice(s.as_ref().as_bytes())
                }
            },
        )
    }

    pub fn from_opt_strs(values: &[Option<&str>]) -> Result<Self, KernelError> {
        Self::from_values(values.iter().copied())
    }

    pub fn from_strs(values: &[&str]) -> Result<Self, KernelError> {
        Self::from_values(values.iter().map(|s| Some(*s)))
    }

    /// A store of `n` nulls.
    pub fn new_null(n: usize) -> Self {
        Self {
            data: Buffer::from_vec(Vec::<u8>::new()),
            offsets: vec![0i64; n].into(),
            lengths: vec![NULL_LENGTH; n].into(),
            null_count: n,
        }
    }

    /// An empty store.
    pub fn empty() -> Self {
        Self::new_null(0)
    }

    /// Assembles a store from raw parts, validating every invariant.
    ///
    /// # Errors
    /// `InvalidArguments` on mismatched table lengths, negative or decreasing offsets,
    /// out-of-bounds ranges, bad length sentinels or non-UTF-8 element bytes.
    pub fn from_parts(
        data: Buffer,
        offsets: ScalarBuffer<i64>,
        lengths: ScalarBuffer<i32>,
    ) -> Result<Self, KernelError> {
        let invalid = |msg: String| Err(KernelError::InvalidArguments(msg));
        if offsets.len() != lengths.len() {
            return invalid(format!(
                "from_parts: {} offsets for {} lengths",
                offsets.len(),
                lengths.len()
            ));
        }
        let mut prev = 0i64;
        let mut null_count = 0;
        for (i, (&off, &len)) in offsets.iter().zip(lengths.iter()).enumerate() {
            if off < prev {
                return invalid(format!("from_parts: offset {} at element {} decreases", off, i));
            }
            prev = off;
            if len == NULL_LENGTH {
                null_count += 1;
                continue;
            }
            if len < 0 {
                return invalid(format!("from_parts: length {} at element {}", len, i));
            }
            let end = off as u64 + len as u64;
            if end > data.len() as u64 {
                return invalid(format!(
                    "from_parts: element {} ends at byte {} past buffer of {}",
                    i,
                    end,
                    data.len()
                ));
            }
            let bytes = &data.as_slice()[off as usize..end as usize];
            if let Err(e) = std::str::from_utf8(bytes) {
                return invalid(format!("from_parts: element {} is not UTF-8: {}", i, e));
            }
        }
        Ok(Self {
            data,
            offsets,
            lengths,
            null_count,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    #[inline]
    pub fn null_count(&self) -> usize {
        self.null_count
    }

    #[inline]
    pub fn is_null(&self, i: usize) -> bool {
        self.lengths[i] == NULL_LENGTH
    }

    #[inline]
    pub fn is_valid(&self, i: usize) -> bool {
        !self.is_null(i)
    }

    /// View of element `i`.
    ///
    /// # Panics
    /// If `i >= self.len()`.
    #[inline]
    pub fn view(&self, i: usize) -> StrView<'_> {
        let len = self.lengths[i];
        if len == NULL_LENGTH {
            return StrView::null();
        }
        let start = self.offsets[i] as usize;
        let bytes = &self.data.as_slice()[start..start + len as usize];
        // SAFETY: valid elements are UTF-8, checked by `from_parts` and `build`, or
        // shared sub-ranges of such elements cut on char boundaries.
        StrView::new(unsafe { std::str::from_utf8_unchecked(bytes) })
    }

    /// Text of element `i`, or `None` when null or out of range.
    #[inline]
    pub fn get(&self, i: usize) -> Option<&str> {
        if i >= self.len() {
            return None;
        }
        self.view(i).as_str()
    }

    pub fn views(&self) -> impl ExactSizeIterator<Item = StrView<'_>> + '_ {
        (0..self.len()).map(move |i| self.view(i))
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Option<&str>> + '_ {
        (0..self.len()).map(move |i| self.view(i).as_str())
    }

    /// Reads every element back to host strings.
    pub fn to_vec(&self) -> Vec<Option<String>> {
        self.iter().map(|s| s.map(str::to_string)).collect()
    }

    /// Validity bitmap (1 = valid), or `None` when there are no nulls.
    pub fn nulls(&self) -> Option<NullBuffer> {
        if self.null_count == 0 {
            return None;
        }
        validity_from_fn(self.len(), |i| self.is_valid(i))
    }

    pub fn data(&self) -> &Buffer {
        &self.data
    }

    pub fn offsets(&self) -> &ScalarBuffer<i64> {
        &self.offsets
    }

    pub fn lengths(&self) -> &ScalarBuffer<i32> {
        &self.lengths
    }

    /// Size of the underlying byte buffer, including bytes of a shared parent.
    pub fn buffer_len(&self) -> usize {
        self.data.len()
    }

    /// Sum of the byte lengths of all valid elements.
    pub fn value_bytes(&self) -> usize {
        self.lengths.iter().filter(|&&l| l > 0).map(|&l| l as usize).sum()
    }

    /// True when this store and `other` point at the same byte buffer.
    pub fn shares_buffer_with(&self, other: &CharacterStore) -> bool {
        self.data.as_ptr() == other.data.as_ptr()
    }

    /// Copies the selected elements into a new store.
    ///
    /// # Errors
    /// `OutOfBounds` if any index is past the end.
    pub fn gather(&self, indices: &[usize]) -> Result<Self, KernelError> {
        self.check_indices(indices.iter().copied())?;
        Self::build(
            indices.len(),
            |k| self.view(indices[k]).as_str().map(str::len),
            |k, out| out.copy_from_slice(self.view(indices[k]).as_bytes()),
        )
    }

    /// Like [`gather`](Self::gather); `None` selects a null.
    pub fn gather_opt(&self, indices: &[Option<usize>]) -> Result<Self, KernelError> {
        self.check_indices(indices.iter().flatten().copied())?;
        let pick = |k: usize| indices[k].map_or(StrView::null(), |i| self.view(i));
        Self::build(
            indices.len(),
            |k| pick(k).as_str().map(str::len),
            |k, out| out.copy_from_slice(pick(k).as_bytes()),
        )
    }

    fn check_indices(&self, mut indices: impl Iterator<Item = usize>) -> Result<(), KernelError> {
        match indices.find(|&i| i >= self.len()) {
            Some(i) => Err(KernelError::OutOfBounds(format!(
                "gather: index {} for store of length {}",
                i,
                self.len()
            ))),
            None => Ok(()),
        }
    }

    /// Zero-copy window of `len` elements starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<Self, KernelError> {
        let end = offset.checked_add(len);
        if end.map_or(true, |e| e > self.len()) {
            return Err(KernelError::OutOfBounds(format!(
                "slice: {}..{} of store with length {}",
                offset,
                offset.saturating_add(len),
                self.len()
            )));
        }
        let lengths = self.lengths.slice(offset, len);
        let null_count = lengths.iter().filter(|&&l| l == NULL_LENGTH).count();
        Ok(Self {
            data: self.data.clone(),
            offsets: self.offsets.slice(offset, len),
            lengths,
            null_count,
        })
    }

    /// Appends the stores end to end into one new store.
    pub fn concat(stores: &[&CharacterStore]) -> Result<Self, KernelError> {
        let mut bases = Vec::with_capacity(stores.len());
        let mut n = 0usize;
        for s in stores {
            bases.push(n);
            n += s.len();
        }
        let locate = |k: usize| {
            let part = bases.partition_point(|&b| b <= k) - 1;
            stores[part].view(k - bases[part])
        };
        Self::build(
            n,
            |k| locate(k).as_str().map(str::len),
            |k, out| out.copy_from_slice(locate(k).as_bytes()),
        )
    }

    /// Dense private copy holding only this store's own bytes.
    pub fn compact(&self) -> Result<Self, KernelError> {
        self.transform(|v| v.as_str().map(str::len), |v, out| {
            out.copy_from_slice(v.as_bytes())
        })
    }
}

impl PartialEq for CharacterStore {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.views().zip(other.views()).all(|(a, b)| a == b)
    }
}

impl Eq for CharacterStore {}

impl fmt::Debug for CharacterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharacterStore")
            .field("len", &self.len())
            .field("null_count", &self.null_count)
            .field("values", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}
