// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Utility Functions** - *Validity Bitmaps and Output Writers*
//!
//! Helpers shared by the kernels: Arrow-compatible validity construction and merging,
//! argument checks, and the [`ByteWriter`] each fill worker writes its range through.

use arrow_buffer::{BooleanBuffer, NullBuffer};

use crate::errors::KernelError;

/// Builds a validity bitmap from a per-element predicate (true = valid).
///
/// Returns `None` when every element is valid, so dense columns carry no bitmap.
#[inline]
pub fn validity_from_fn<F: FnMut(usize) -> bool>(len: usize, f: F) -> Option<NullBuffer> {
    let nulls = NullBuffer::new(BooleanBuffer::collect_bool(len, f));
    if nulls.null_count() == 0 { None } else { Some(nulls) }
}

/// Merge two optional validity bitmaps, computing per-row AND.
/// Returns None if both inputs are None (output is dense).
#[inline]
pub fn merge_nulls(lhs: Option<&NullBuffer>, rhs: Option<&NullBuffer>) -> Option<NullBuffer> {
    NullBuffer::union(lhs, rhs).filter(|n| n.null_count() > 0)
}

/// Reads validity for row `i` of an optional bitmap.
#[inline(always)]
pub fn is_valid_at(nulls: Option<&NullBuffer>, i: usize) -> bool {
    nulls.map_or(true, |n| n.is_valid(i))
}

/// Narrows a position or count to the `i32` result width, saturating at `i32::MAX`.
#[inline(always)]
pub fn to_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Validates that a pad/fill argument is exactly one character.
#[inline]
pub fn single_char(label: &str, s: &str) -> Result<char, KernelError> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(KernelError::InvalidArguments(format!(
            "{}: fill must be exactly one character, got {:?}",
            label, s
        ))),
    }
}

/// ASCII word character as used by `\w` and `\b`.
#[inline(always)]
pub fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Sequential writer over the exact output range handed to one fill worker.
///
/// The sizing pass computed the range length, so running past the end is a kernel bug
/// and panics.
pub struct ByteWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> ByteWriter<'a> {
    #[inline]
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        let end = self.pos + bytes.len();
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
    }

    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.push_bytes(s.as_bytes());
    }

    #[inline]
    pub fn push_char(&mut self, c: char) {
        let n = c.len_utf8();
        c.encode_utf8(&mut self.buf[self.pos..self.pos + n]);
        self.pos += n;
    }

    /// Writes `c` `n` times.
    #[inline]
    pub fn push_char_n(&mut self, c: char, n: usize) {
        for _ in 0..n {
            self.push_char(c);
        }
    }

    /// True once the whole range has been written.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.pos == self.buf.len()
    }
}
