// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Error Types** - *Kernel Operation Error Handling*
//!
//! Error types for store construction, bulk passes, pattern compilation and
//! dictionary maintenance.
//!
//! ## Error Categories
//! - **Allocation**: the output of a pass could not be allocated, or does not fit
//!   the store's offset/length types. The pass is aborted and nothing is returned.
//! - **Malformed pattern**: a regular expression failed to compile. Raised at
//!   registration time, before any matching pass runs.
//! - **Invalid arguments**: bad parameters detected before a pass launches.
//! - **Shape errors**: length mismatches and out-of-bounds element access.
//!
//! Per-element non-matches (unparsable numbers, unmatched groups) are never errors.
//! They surface as null elements in the output column.

use thiserror::Error;

/// Error type for all kernel operations.
///
/// Each variant carries a contextual message describing the failing call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    /// The output buffer of a pass could not be allocated.
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// Offsets or lengths exceed what the store's index types can address.
    #[error("Overflow: {0}")]
    Overflow(String),

    /// A regular expression failed to compile.
    #[error("Malformed pattern {pattern:?} at byte {position}: {reason}")]
    MalformedPattern {
        pattern: String,
        position: usize,
        reason: String,
    },

    /// Invalid arguments provided to a kernel function.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Array length mismatch between operands.
    #[error("Length mismatch: {0}")]
    LengthMismatch(String),

    /// Element index out of bounds.
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),
}

impl KernelError {
    /// Returns true for errors raised while compiling a pattern.
    #[inline]
    pub fn is_pattern_error(&self) -> bool {
        matches!(self, KernelError::MalformedPattern { .. })
    }
}

/// Creates a formatted error message for length mismatches between left-hand side (LHS) and right-hand side (RHS) columns.
///
/// # Arguments
/// * `fname` - Function name where the mismatch occurred
/// * `lhs` - Length of the left-hand side column
/// * `rhs` - Length of the right-hand side column
pub fn log_length_mismatch(fname: &str, lhs: usize, rhs: usize) -> String {
    format!("{} => Length mismatch: LHS {} RHS {}", fname, lhs, rhs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = KernelError::MalformedPattern {
            pattern: "a(b".into(),
            position: 1,
            reason: "unclosed group".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("a(b"));
        assert!(msg.contains("byte 1"));
        assert!(msg.contains("unclosed group"));
        assert!(err.is_pattern_error());
    }

    #[test]
    fn test_length_mismatch_message() {
        let msg = log_length_mismatch("concat", 3, 4);
        assert_eq!(msg, "concat => Length mismatch: LHS 3 RHS 4");
        assert!(!KernelError::LengthMismatch(msg).is_pattern_error());
    }
}
