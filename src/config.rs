// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Configuration** - *Limits, Thresholds and Worker Pool Settings*
//!
//! Global configuration constants controlling kernel behaviour, plus the runtime
//! [`EngineConfig`] used to build a [`Device`](crate::device::Device).
//!
//! These parameters should rarely need adjustment.

/// Maximum allowed repetitions for the `repeat` kernel.
///
/// Prevents excessive memory allocation when repeating strings.
/// Calls exceeding this limit return an error rather than allocating unbounded memory.
pub const STRING_REPEAT_LIMIT: usize = 1_000_000;

/// Largest bound accepted in a counted repetition such as `a{2,5}`.
///
/// Counted repetition is expanded into copies of the repeated sub-program, so the
/// bound directly limits program growth.
pub const MAX_REPEAT: u32 = 1_000;

/// Maximum number of instructions in a compiled regex program.
pub const MAX_PROGRAM_LEN: usize = 65_536;

/// Maximum number of capture groups in one pattern.
pub const MAX_CAPTURE_GROUPS: usize = 255;

/// Passes over fewer elements than this run inline on the calling thread.
pub const PARALLEL_THRESHOLD: usize = 1_024;

/// Minimum number of elements handed to one worker task.
pub const MIN_CHUNK: usize = 256;

/// Fixed seeds for the `hash` kernel so that hashes are stable within a build.
pub const HASH_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// Runtime configuration for the worker pool.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of worker threads. `0` lets the pool pick one per logical core.
    pub num_workers: usize,
    /// Prefix for worker thread names.
    pub thread_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_workers: 0,
            thread_name: "string-kernels".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads
    pub fn num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    /// Set the worker thread name prefix
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}
