// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under the Mozilla Public License (MPL) 2.0.
// See LICENSE for details.

//! # **String Kernels** - *Data-Parallel Operations over String Columns*
//!
//! Bulk string processing over immutable, Arrow-compatible character stores.
//!
//! ## Layout
//! - [`store`]: [`CharacterStore`], one shared byte buffer plus per-element offsets
//!   and lengths, and [`view::StrView`] for reading a single element.
//! - [`kernels`]: element-wise operations. Each runs as a sizing pass, a prefix
//!   sum, one allocation and a fill pass, on the worker pool in [`device`].
//! - [`regex`]: a host-side compiler and a Pike VM matcher with bounded memory
//!   per worker, plus the [`PatternRegistry`] of compiled patterns.
//! - [`category`]: dictionary encoding into sorted keys and dense codes.
//! - [`operators`]: the [`StringOp`] enum and [`apply`](operators::apply), a single
//!   dispatch point over all of the above.
//!
//! ## Nulls
//! Nulls propagate: a null input element gives a null output element. Predicates
//! such as `IS NULL` are the exception and always produce a valid value.
//! Sorting and category building place nulls first.
//!
//! ## Features
//! - `parallel` (default): run passes on a `rayon` pool.
//! - `fast_hash` (default): `ahash` maps and sets.

pub mod category;
pub mod columns;
pub mod config;
pub mod device;
pub mod errors;
pub mod operators;
pub mod regex;
pub mod store;
pub mod utils;
pub mod view;

pub mod kernels {
    pub mod case;
    pub mod classify;
    pub mod compare;
    pub mod matching;
    pub mod numeric;
    pub mod replace;
    pub mod search;
    pub mod split;
    pub mod strip;
}

pub use crate::category::{CategoryTable, NULL_CODE};
pub use crate::columns::{BooleanColumn, ListColumn, MatchColumn, NumericColumn};
pub use crate::config::EngineConfig;
pub use crate::device::Device;
pub use crate::errors::KernelError;
pub use crate::operators::{apply, ComparisonOperator, OpOutput, StringOp};
pub use crate::regex::{PatternHandle, PatternRegistry, Regex, RegexFlags};
pub use crate::store::CharacterStore;
pub use crate::view::StrView;
