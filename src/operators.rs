// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! Operator and operation enums for routing bulk string work, plus [`apply`], the
//! single dispatch entry point over every kernel in the crate.

use crate::category::CategoryTable;
use crate::columns::{BooleanColumn, ListColumn, MatchColumn, NumericColumn};
use crate::errors::KernelError;
use crate::kernels::case::{fold_case, CaseMode};
use crate::kernels::classify::{is_class, CharClassKind};
use crate::kernels::compare::{argsort, compare_scalar, compare_str_str, is_in, sort, ArgsortConfig};
use crate::kernels::matching;
use crate::kernels::numeric::{hash, parse_float, parse_int, parse_int_radix};
use crate::kernels::replace::{concat, join, repeat, replace, substring, translate};
use crate::kernels::search;
use crate::kernels::split::{rsplit, split, split_columns};
use crate::kernels::strip::{pad, strip, zfill, PadPolicy, PadSide, StripSide};
use crate::regex::{PatternHandle, PatternRegistry};
use crate::store::CharacterStore;

/// Comparison operators for binary predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    /// Equality comparison (`lhs == rhs`)
    Equals,
    /// Inequality comparison (`lhs != rhs`)
    NotEquals,
    /// Less-than comparison (`lhs < rhs`), byte-wise
    LessThan,
    /// Less-than-or-equal comparison (`lhs <= rhs`), byte-wise
    LessThanOrEqualTo,
    /// Greater-than comparison (`lhs > rhs`), byte-wise
    GreaterThan,
    /// Greater-than-or-equal comparison (`lhs >= rhs`), byte-wise
    GreaterThanOrEqualTo,
    /// Tests if value is null (`lhs IS NULL`)
    ///
    /// Always returns a valid boolean, never null.
    IsNull,
    /// Tests if value is not null (`lhs IS NOT NULL`)
    ///
    /// Always returns a valid boolean, never null.
    IsNotNull,
}

/// A bulk operation and its parameters.
///
/// Regex variants refer to patterns compiled into the [`PatternRegistry`] passed to
/// [`apply`].
#[derive(Debug, Clone)]
pub enum StringOp {
    Case(CaseMode),
    Strip {
        side: StripSide,
        chars: Option<String>,
    },
    Pad {
        width: usize,
        side: PadSide,
        fill: String,
        policy: PadPolicy,
    },
    Zfill {
        width: usize,
    },
    Replace {
        target: String,
        repl: String,
        max: Option<usize>,
    },
    Substring {
        start: usize,
        len: Option<usize>,
    },
    Repeat {
        times: usize,
    },
    Translate {
        table: Vec<(char, Option<char>)>,
    },
    /// Element-wise `lhs + sep + rhs`.
    Concat {
        rhs: CharacterStore,
        sep: String,
    },
    Join {
        sep: String,
    },
    Split {
        delim: Option<String>,
        limit: Option<usize>,
    },
    RSplit {
        delim: Option<String>,
        limit: Option<usize>,
    },
    SplitColumns {
        delim: Option<String>,
        limit: Option<usize>,
    },
    Find {
        needle: String,
    },
    RFind {
        needle: String,
    },
    Count {
        needle: String,
    },
    Contains {
        needle: String,
    },
    StartsWith {
        prefix: String,
    },
    EndsWith {
        suffix: String,
    },
    CharLen,
    ByteLen,
    Classify(CharClassKind),
    /// Base-10 integers into `i64`.
    ParseInt,
    ParseIntRadix {
        radix: u32,
    },
    /// Floats into `f64`.
    ParseFloat,
    Hash,
    Compare {
        op: ComparisonOperator,
        rhs: String,
    },
    CompareStores {
        op: ComparisonOperator,
        rhs: CharacterStore,
    },
    IsIn {
        set: CharacterStore,
    },
    Argsort(ArgsortConfig),
    Sort(ArgsortConfig),
    ContainsRe(PatternHandle),
    MatchRe(PatternHandle),
    FindRe(PatternHandle),
    CountRe(PatternHandle),
    Extract(PatternHandle),
    FindAll(PatternHandle),
    ReplaceRe {
        pattern: PatternHandle,
        repl: String,
        max: Option<usize>,
    },
    ReplaceWithBackrefs {
        pattern: PatternHandle,
        template: String,
        max: Option<usize>,
    },
    SplitRe {
        pattern: PatternHandle,
        limit: Option<usize>,
    },
    SplitReColumns {
        pattern: PatternHandle,
        limit: Option<usize>,
    },
    /// Dictionary encoding.
    Encode,
}

impl StringOp {
    /// Operation name, for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            StringOp::Case(_) => "case",
            StringOp::Strip { .. } => "strip",
            StringOp::Pad { .. } => "pad",
            StringOp::Zfill { .. } => "zfill",
            StringOp::Replace { .. } => "replace",
            StringOp::Substring { .. } => "substring",
            StringOp::Repeat { .. } => "repeat",
            StringOp::Translate { .. } => "translate",
            StringOp::Concat { .. } => "concat",
            StringOp::Join { .. } => "join",
            StringOp::Split { .. } => "split",
            StringOp::RSplit { .. } => "rsplit",
            StringOp::SplitColumns { .. } => "split_columns",
            StringOp::Find { .. } => "find",
            StringOp::RFind { .. } => "rfind",
            StringOp::Count { .. } => "count",
            StringOp::Contains { .. } => "contains",
            StringOp::StartsWith { .. } => "starts_with",
            StringOp::EndsWith { .. } => "ends_with",
            StringOp::CharLen => "char_len",
            StringOp::ByteLen => "byte_len",
            StringOp::Classify(_) => "classify",
            StringOp::ParseInt => "parse_int",
            StringOp::ParseIntRadix { .. } => "parse_int_radix",
            StringOp::ParseFloat => "parse_float",
            StringOp::Hash => "hash",
            StringOp::Compare { .. } => "compare",
            StringOp::CompareStores { .. } => "compare_stores",
            StringOp::IsIn { .. } => "is_in",
            StringOp::Argsort(_) => "argsort",
            StringOp::Sort(_) => "sort",
            StringOp::ContainsRe(_) => "contains_re",
            StringOp::MatchRe(_) => "match_re",
            StringOp::FindRe(_) => "find_re",
            StringOp::CountRe(_) => "count_re",
            StringOp::Extract(_) => "extract",
            StringOp::FindAll(_) => "findall",
            StringOp::ReplaceRe { .. } => "replace_re",
            StringOp::ReplaceWithBackrefs { .. } => "replace_with_backrefs",
            StringOp::SplitRe { .. } => "split_re",
            StringOp::SplitReColumns { .. } => "split_re_columns",
            StringOp::Encode => "encode",
        }
    }
}

/// Result of [`apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum OpOutput {
    Store(CharacterStore),
    Stores(Vec<CharacterStore>),
    Boolean(BooleanColumn),
    Int32(NumericColumn<i32>),
    Int64(NumericColumn<i64>),
    UInt64(NumericColumn<u64>),
    Float64(NumericColumn<f64>),
    List(ListColumn),
    Matches(MatchColumn),
    Category(CategoryTable),
    Indices(Vec<usize>),
}

impl OpOutput {
    /// Short name of the output kind, for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            OpOutput::Store(_) => "store",
            OpOutput::Stores(_) => "stores",
            OpOutput::Boolean(_) => "boolean",
            OpOutput::Int32(_) => "int32",
            OpOutput::Int64(_) => "int64",
            OpOutput::UInt64(_) => "uint64",
            OpOutput::Float64(_) => "float64",
            OpOutput::List(_) => "list",
            OpOutput::Matches(_) => "matches",
            OpOutput::Category(_) => "category",
            OpOutput::Indices(_) => "indices",
        }
    }

    pub fn into_store(self) -> Option<CharacterStore> {
        match self {
            OpOutput::Store(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_boolean(self) -> Option<BooleanColumn> {
        match self {
            OpOutput::Boolean(b) => Some(b),
            _ => None,
        }
    }
}

/// Runs `op` over `store`.
///
/// # Errors
/// Whatever the underlying kernel reports, plus `InvalidArguments` for a pattern
/// handle unknown to `registry`.
pub fn apply(
    store: &CharacterStore,
    op: &StringOp,
    registry: &PatternRegistry,
) -> Result<OpOutput, KernelError> {
    log::trace!("apply {} over {} elements", op.name(), store.len());
    let re = |h: &PatternHandle| registry.get(*h);
    Ok(match op {
        StringOp::Case(mode) => OpOutput::Store(fold_case(store, *mode)?),
        StringOp::Strip { side, chars } => OpOutput::Store(strip(store, *side, chars.as_deref())),
        StringOp::Pad { width, side, fill, policy } => {
            OpOutput::Store(pad(store, *width, *side, fill, *policy)?)
        }
        StringOp::Zfill { width } => OpOutput::Store(zfill(store, *width)?),
        StringOp::Replace { target, repl, max } => {
            OpOutput::Store(replace(store, target, repl, *max)?)
        }
        StringOp::Substring { start, len } => OpOutput::Store(substring(store, *start, *len)),
        StringOp::Repeat { times } => OpOutput::Store(repeat(store, *times)?),
        StringOp::Translate { table } => OpOutput::Store(translate(store, table)?),
        StringOp::Concat { rhs, sep } => OpOutput::Store(concat(store, rhs, sep)?),
        StringOp::Join { sep } => OpOutput::Store(join(store, sep)?),
        StringOp::Split { delim, limit } => OpOutput::List(split(store, delim.as_deref(), *limit)?),
        StringOp::RSplit { delim, limit } => {
            OpOutput::List(rsplit(store, delim.as_deref(), *limit)?)
        }
        StringOp::SplitColumns { delim, limit } => {
            OpOutput::Stores(split_columns(store, delim.as_deref(), *limit)?)
        }
        StringOp::Find { needle } => OpOutput::Int32(search::find(store, needle)),
        StringOp::RFind { needle } => OpOutput::Int32(search::rfind(store, needle)),
        StringOp::Count { needle } => OpOutput::Int32(search::count(store, needle)),
        StringOp::Contains { needle } => OpOutput::Boolean(search::contains(store, needle)),
        StringOp::StartsWith { prefix } => OpOutput::Boolean(search::starts_with(store, prefix)),
        StringOp::EndsWith { suffix } => OpOutput::Boolean(search::ends_with(store, suffix)),
        StringOp::CharLen => OpOutput::Int32(search::char_len(store)),
        StringOp::ByteLen => OpOutput::Int32(search::byte_len(store)),
        StringOp::Classify(kind) => OpOutput::Boolean(is_class(store, *kind)),
        StringOp::ParseInt => OpOutput::Int64(parse_int::<i64>(store)),
        StringOp::ParseIntRadix { radix } => {
            OpOutput::Int64(parse_int_radix::<i64>(store, *radix)?)
        }
        StringOp::ParseFloat => OpOutput::Float64(parse_float::<f64>(store)),
        StringOp::Hash => OpOutput::UInt64(hash(store)),
        StringOp::Compare { op, rhs } => OpOutput::Boolean(compare_scalar(store, *op, rhs)),
        StringOp::CompareStores { op, rhs } => {
            OpOutput::Boolean(compare_str_str(store, rhs, *op)?)
        }
        StringOp::IsIn { set } => OpOutput::Boolean(is_in(store, set)),
        StringOp::Argsort(config) => OpOutput::Indices(argsort(store, config)),
        StringOp::Sort(config) => OpOutput::Store(sort(store, config)?),
        StringOp::ContainsRe(h) => OpOutput::Boolean(matching::contains_re(store, &re(h)?)),
        StringOp::MatchRe(h) => OpOutput::Boolean(matching::match_re(store, &re(h)?)),
        StringOp::FindRe(h) => OpOutput::Matches(matching::find_re(store, &re(h)?)),
        StringOp::CountRe(h) => OpOutput::Int32(matching::count_re(store, &re(h)?)),
        StringOp::Extract(h) => OpOutput::Stores(matching::extract(store, &re(h)?)?),
        StringOp::FindAll(h) => OpOutput::List(matching::findall(store, &re(h)?)?),
        StringOp::ReplaceRe { pattern, repl, max } => {
            OpOutput::Store(matching::replace_re(store, &re(pattern)?, repl, *max)?)
        }
        StringOp::ReplaceWithBackrefs { pattern, template, max } => OpOutput::Store(
            matching::replace_with_backrefs(store, &re(pattern)?, template, *max)?,
        ),
        StringOp::SplitRe { pattern, limit } => {
            OpOutput::List(matching::split_re(store, &re(pattern)?, *limit)?)
        }
        StringOp::SplitReColumns { pattern, limit } => {
            OpOutput::Stores(matching::split_re_columns(store, &re(pattern)?, *limit)?)
        }
        StringOp::Encode => OpOutput::Category(CategoryTable::from_store(store)?),
    })
}
