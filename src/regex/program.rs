// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! Compiled instruction program.
//!
//! A [`Program`] is an immutable, position-independent vector of instructions plus
//! its character class table. It is built once on the host and then shared
//! read-only by every matching worker.

use crate::utils::is_word_char;

use super::parser::{Assertion, ClassSet};

/// One VM instruction. Control flow targets are indices into [`Program::insts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inst {
    /// Consume `ch`, comparing case-insensitively when `fold` is set.
    Char { ch: char, fold: bool },
    /// Consume any character; `\n` only when `newline` is set.
    Any { newline: bool },
    /// Consume a character in `classes[class]`.
    Class { class: usize, fold: bool },
    /// Zero-width test at the current position.
    Assert(Assertion),
    /// Fork. `primary` has priority.
    Split { primary: usize, secondary: usize },
    Jump(usize),
    /// Record the current position in capture slot `n`.
    Save(usize),
    Match,
}

/// Character class with an ASCII bitmap fast path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClass {
    ranges: Vec<(u32, u32)>,
    negated: bool,
    ascii: [u64; 2],
}

impl CharClass {
    pub fn new(set: &ClassSet) -> Self {
        let mut ascii = [0u64; 2];
        for &(lo, hi) in &set.ranges {
            for cp in lo..=hi.min(127) {
                ascii[(cp >> 6) as usize] |= 1 << (cp & 63);
            }
        }
        Self {
            ranges: set.ranges.clone(),
            negated: set.negated,
            ascii,
        }
    }

    #[inline]
    fn contains(&self, c: char) -> bool {
        let cp = c as u32;
        if cp < 128 {
            return self.ascii[(cp >> 6) as usize] & (1 << (cp & 63)) != 0;
        }
        self.ranges
            .binary_search_by(|&(lo, hi)| {
                if hi < cp {
                    std::cmp::Ordering::Less
                } else if lo > cp {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Case folding applies before negation.
    #[inline]
    pub fn matches(&self, c: char, fold: bool) -> bool {
        let hit = self.contains(c)
            || (fold && {
                let (lower, upper) = (simple_lower(c), simple_upper(c));
                (lower != c && self.contains(lower)) || (upper != c && self.contains(upper))
            });
        hit != self.negated
    }
}

/// Single-character lowercase mapping, or `c` itself.
#[inline]
pub(crate) fn simple_lower(c: char) -> char {
    if c.is_ascii() {
        return c.to_ascii_lowercase();
    }
    let mut it = c.to_lowercase();
    match (it.next(), it.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Single-character uppercase mapping, or `c` itself.
#[inline]
pub(crate) fn simple_upper(c: char) -> char {
    if c.is_ascii() {
        return c.to_ascii_uppercase();
    }
    let mut it = c.to_uppercase();
    match (it.next(), it.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

#[inline]
fn chars_equal(a: char, b: char, fold: bool) -> bool {
    a == b
        || (fold
            && (simple_lower(a) == simple_lower(b) || simple_upper(a) == simple_upper(b)))
}

/// Immutable compiled regex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub insts: Vec<Inst>,
    pub classes: Vec<CharClass>,
    /// Capture slots per thread: two per group including the whole match.
    pub slots: usize,
    pub start: usize,
}

impl Program {
    #[inline]
    pub fn len(&self) -> usize {
        self.insts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    /// Capture groups excluding the implicit whole-match group.
    #[inline]
    pub fn group_count(&self) -> usize {
        self.slots / 2 - 1
    }

    /// Whether the consuming instruction at `pc` accepts `c`.
    #[inline]
    pub(crate) fn accepts(&self, pc: usize, c: char) -> bool {
        match self.insts[pc] {
            Inst::Char { ch, fold } => chars_equal(c, ch, fold),
            Inst::Any { newline } => newline || c != '\n',
            Inst::Class { class, fold } => self.classes[class].matches(c, fold),
            _ => false,
        }
    }

    /// Structural checks run once after compilation.
    pub fn validate(&self) -> Result<(), String> {
        let n = self.insts.len();
        if self.start >= n {
            return Err(format!("start {} outside program of {} instructions", self.start, n));
        }
        if self.slots < 2 || self.slots % 2 != 0 {
            return Err(format!("invalid capture slot count {}", self.slots));
        }
        let matches = self.insts.iter().filter(|i| matches!(i, Inst::Match)).count();
        if matches != 1 {
            return Err(format!("expected one match instruction, found {}", matches));
        }
        for (pc, inst) in self.insts.iter().enumerate() {
            let in_range = |t: usize| t < n;
            let ok = match *inst {
                Inst::Split { primary, secondary } => in_range(primary) && in_range(secondary),
                Inst::Jump(t) => in_range(t),
                Inst::Save(slot) => slot < self.slots && in_range(pc + 1),
                Inst::Class { class, .. } => class < self.classes.len() && in_range(pc + 1),
                Inst::Char { .. } | Inst::Any { .. } | Inst::Assert(_) => in_range(pc + 1),
                Inst::Match => true,
            };
            if !ok {
                return Err(format!("instruction {} ({:?}) has an invalid target", pc, inst));
            }
        }
        Ok(())
    }
}

/// Evaluates a zero-width assertion at byte offset `at` of `text`.
#[inline]
pub(crate) fn assertion_holds(a: Assertion, text: &str, at: usize) -> bool {
    match a {
        Assertion::StartText | Assertion::Caret => at == 0,
        Assertion::EndText | Assertion::Dollar => at == text.len(),
        Assertion::StartLine => at == 0 || text.as_bytes()[at - 1] == b'\n',
        Assertion::EndLine => at == text.len() || text.as_bytes()[at] == b'\n',
        Assertion::WordBoundary | Assertion::NotWordBoundary => {
            let before = text[..at].chars().next_back().is_some_and(is_word_char);
            let after = text[at..].chars().next().is_some_and(is_word_char);
            (before != after) == (a == Assertion::WordBoundary)
        }
    }
}
