// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Device Module** - *Worker Pool and Pass Runtime*
//!
//! Executes bulk passes with one logical worker per element.
//!
//! Every variable-length kernel is built from the same three steps:
//! 1. **Sizing pass**: one worker per element computes its output size ([`launch_map`]).
//! 2. **Scan**: an exclusive prefix sum turns sizes into offsets ([`exclusive_scan`]).
//! 3. **Fill pass**: the output is allocated once ([`try_alloc`]), cut into disjoint
//!    per-element ranges ([`split_disjoint`]) and written in parallel ([`launch_fill`]).
//!
//! Each step completes before the next begins. A fill worker only ever holds the
//! `&mut` range it was handed, so writes need no synchronisation.
//!
//! Passes whose outputs land at computed positions (ranks, compaction targets) use
//! [`launch_scatter`], where each slot is claimed once before it is written.
//!
//! With the `parallel` feature (default) passes run on a `rayon` pool: the global one,
//! or the pool of the [`Device`] whose [`Device::run`] scope the caller is in. Passes
//! over fewer than [`PARALLEL_THRESHOLD`] elements run inline.

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
#[cfg(feature = "parallel")]
use std::sync::Arc;

use log::{debug, trace};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::EngineConfig;
#[cfg(feature = "parallel")]
use crate::config::{MIN_CHUNK, PARALLEL_THRESHOLD};
use crate::errors::KernelError;

/// A worker pool that bulk passes can be scoped to.
///
/// Kernels are free functions; they run on whichever pool the calling thread belongs
/// to. Wrap calls in [`Device::run`] to pin them to this device's workers.
///
/// ```rust,ignore
/// use string_kernels::{config::EngineConfig, device::Device, kernels::case::to_upper};
///
/// let device = Device::new(EngineConfig::new().num_workers(4))?;
/// let upper = device.run(|| to_upper(&store))?;
/// ```
#[derive(Debug, Clone)]
pub struct Device {
    #[cfg(feature = "parallel")]
    pool: Arc<rayon::ThreadPool>,
    config: EngineConfig,
}

impl Device {
    /// Builds a device with its own worker pool.
    pub fn new(config: EngineConfig) -> Result<Self, KernelError> {
        #[cfg(feature = "parallel")]
        {
            let prefix = config.thread_name.clone();
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.num_workers)
                .thread_name(move |i| format!("{}-{}", prefix, i))
                .build()
                .map_err(|e| KernelError::InvalidArguments(format!("worker pool: {}", e)))?;
            debug!(
                "device '{}' started with {} workers",
                config.thread_name,
                pool.current_num_threads()
            );
            Ok(Self {
                pool: Arc::new(pool),
                config,
            })
        }
        #[cfg(not(feature = "parallel"))]
        {
            debug!("device '{}' running passes inline", config.thread_name);
            Ok(Self { config })
        }
    }

    /// Number of workers passes are spread across.
    pub fn num_workers(&self) -> usize {
        #[cfg(feature = "parallel")]
        {
            self.pool.current_num_threads()
        }
        #[cfg(not(feature = "parallel"))]
        {
            1
        }
    }

    /// Configuration this device was built from.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs `f` with every pass it launches scheduled on this device's workers.
    pub fn run<R, F>(&self, f: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        #[cfg(feature = "parallel")]
        {
            self.pool.install(f)
        }
        #[cfg(not(feature = "parallel"))]
        {
            f()
        }
    }
}

/// Runs `f` once per element index and collects the results in element order.
///
/// This is the sizing pass of two-pass kernels, and the only pass of kernels whose
/// output is one fixed-width value per element.
pub fn launch_map<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    trace!("launch_map: {} elements", n);
    #[cfg(feature = "parallel")]
    if n >= PARALLEL_THRESHOLD {
        return (0..n).into_par_iter().with_min_len(MIN_CHUNK).map(f).collect();
    }
    (0..n).map(f).collect()
}

/// Like [`launch_map`], but each worker thread first builds private scratch state
/// with `init` and reuses it across the elements it processes.
///
/// Used by the regex kernels to give every worker its own matcher.
pub fn launch_map_init<S, T, I, F>(n: usize, init: I, f: F) -> Vec<T>
where
    T: Send,
    I: Fn() -> S + Sync + Send,
    F: Fn(&mut S, usize) -> T + Sync + Send,
{
    trace!("launch_map_init: {} elements", n);
    #[cfg(feature = "parallel")]
    if n >= PARALLEL_THRESHOLD {
        return (0..n)
            .into_par_iter()
            .with_min_len(MIN_CHUNK)
            .map_init(&init, |s, i| f(s, i))
            .collect();
    }
    let mut scratch = init();
    (0..n).map(|i| f(&mut scratch, i)).collect()
}

/// Exclusive prefix sum over per-element sizes.
///
/// Returns the start offset of every element and the grand total. Large inputs use a
/// blocked scan: block totals in parallel, a short sequential scan over the blocks,
/// then each block scanned in parallel from its base.
pub fn exclusive_scan(sizes: &[usize]) -> Result<(Vec<usize>, usize), KernelError> {
    let overflow = || KernelError::Overflow(format!("prefix sum over {} sizes", sizes.len()));

    #[cfg(feature = "parallel")]
    if sizes.len() >= PARALLEL_THRESHOLD {
        let blocks = (rayon::current_num_threads() * 4).max(1);
        let block = MIN_CHUNK.max(sizes.len().div_ceil(blocks));
        let totals: Vec<Option<usize>> = sizes
            .par_chunks(block)
            .map(|c| c.iter().try_fold(0usize, |acc, &s| acc.checked_add(s)))
            .collect();

        let mut bases = Vec::with_capacity(totals.len());
        let mut total = 0usize;
        for t in totals {
            bases.push(total);
            total = total.checked_add(t.ok_or_else(overflow)?).ok_or_else(overflow)?;
        }

        let mut out = try_alloc(sizes.len(), 0usize)?;
        out.par_chunks_mut(block)
            .zip(sizes.par_chunks(block))
            .zip(bases.par_iter())
            .for_each(|((dst, src), &base)| {
                let mut acc = base;
                for (d, &s) in dst.iter_mut().zip(src) {
                    *d = acc;
                    acc += s;
                }
            });
        return Ok((out, total));
    }

    let mut out = try_alloc(sizes.len(), 0usize)?;
    let mut total = 0usize;
    for (d, &s) in out.iter_mut().zip(sizes) {
        *d = total;
        total = total.checked_add(s).ok_or_else(overflow)?;
    }
    Ok((out, total))
}

/// Allocates `len` copies of `fill`, reporting allocation failure instead of aborting.
pub fn try_alloc<T: Clone>(len: usize, fill: T) -> Result<Vec<T>, KernelError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|e| {
        KernelError::OutOfMemory(format!(
            "{} elements of {} bytes: {}",
            len,
            std::mem::size_of::<T>(),
            e
        ))
    })?;
    v.resize(len, fill);
    Ok(v)
}

/// Cuts `buf` into consecutive disjoint ranges of the given sizes.
///
/// The sizes must sum to at most `buf.len()`.
pub fn split_disjoint<'a, T, I>(buf: &'a mut [T], sizes: I) -> Vec<&'a mut [T]>
where
    I: IntoIterator<Item = usize>,
{
    let sizes = sizes.into_iter();
    let mut out = Vec::with_capacity(sizes.size_hint().0);
    let mut rest = buf;
    for size in sizes {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(size);
        out.push(head);
        rest = tail;
    }
    out
}

/// Fill pass: worker `i` receives exclusive access to range `i`.
pub fn launch_fill<T, F>(ranges: Vec<&mut [T]>, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    trace!("launch_fill: {} ranges", ranges.len());
    #[cfg(feature = "parallel")]
    if ranges.len() >= PARALLEL_THRESHOLD {
        ranges
            .into_par_iter()
            .with_min_len(MIN_CHUNK)
            .enumerate()
            .for_each(|(i, r)| f(i, r));
        return;
    }
    for (i, r) in ranges.into_iter().enumerate() {
        f(i, r);
    }
}

struct SlotPtr<T>(*mut T);

// Only dereferenced for slots claimed through `claimed`, one writer per slot.
unsafe impl<T: Send> Send for SlotPtr<T> {}
unsafe impl<T: Send> Sync for SlotPtr<T> {}

impl<T> Clone for SlotPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SlotPtr<T> {}

impl<T> SlotPtr<T> {
    #[inline]
    fn get(self) -> *mut T {
        self.0
    }
}

/// Scatter pass: worker `k` writes `value` to `out[slot]` where `f(k) = Some((slot, value))`.
///
/// Intended for permutation targets such as ranks, where every slot is written at most
/// once. A slot is claimed by the first worker to reach it; later writes to the same
/// slot and out-of-range slots are dropped. Returns the number of dropped writes.
///
/// # Errors
/// `OutOfMemory` if the claim table cannot be allocated.
pub fn launch_scatter<T, F>(out: &mut [T], n: usize, f: F) -> Result<usize, KernelError>
where
    T: Send,
    F: Fn(usize) -> Option<(usize, T)> + Sync + Send,
{
    trace!("launch_scatter: {} writes into {} slots", n, out.len());
    let len = out.len();
    let mut claimed = Vec::new();
    claimed.try_reserve_exact(len).map_err(|e| {
        KernelError::OutOfMemory(format!("scatter claim table of {} slots: {}", len, e))
    })?;
    claimed.extend((0..len).map(|_| AtomicBool::new(false)));

    let base = SlotPtr(out.as_mut_ptr());
    let write = |k: usize| -> bool {
        let Some((slot, value)) = f(k) else {
            return true;
        };
        if slot >= len || claimed[slot].swap(true, AtomicOrdering::Relaxed) {
            return false;
        }
        // SAFETY: `slot < len` and the claim above makes this the only write to it.
        unsafe { *base.get().add(slot) = value };
        true
    };

    #[cfg(feature = "parallel")]
    if n >= PARALLEL_THRESHOLD {
        return Ok((0..n)
            .into_par_iter()
            .with_min_len(MIN_CHUNK)
            .filter(|&k| !write(k))
            .count());
    }
    Ok((0..n).filter(|&k| !write(k)).count())
}

/// Parallel stable sort of `indices` by `cmp`.
pub fn sort_indices<F>(indices: &mut [usize], cmp: F)
where
    F: Fn(&usize, &usize) -> std::cmp::Ordering + Sync,
{
    #[cfg(feature = "parallel")]
    if indices.len() >= PARALLEL_THRESHOLD {
        indices.par_sort_by(cmp);
        return;
    }
    indices.sort_by(cmp);
}
