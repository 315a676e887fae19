// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Regex Engine** - *Host Compiler, Bounded Matcher and Pattern Registry*
//!
//! A small regular expression engine built for per-element matching over a
//! [`CharacterStore`](crate::store::CharacterStore).
//!
//! Patterns are parsed and compiled once on the host into an immutable [`Program`].
//! Each worker then runs its own [`Matcher`] over that program. Matching is a Pike VM
//! with bounded memory per worker and worst-case time linear in
//! `program length × text length`, so hostile patterns cannot stall a batch.
//!
//! ## Syntax
//! - Literals, `.`, `[...]` / `[^...]` classes with ranges, `\d \D \w \W \s \S`
//! - Groups `(...)` (capturing) and `(?:...)`
//! - Alternation `|`
//! - Quantifiers `* + ? {n} {n,} {n,m}`, each with a lazy `?` form
//! - Anchors `^ $ \A \z \b \B`
//! - Escapes `\n \t \r \f \v \0 \xHH` and escaped metacharacters
//! - A leading `(?ims)` group sets [`RegexFlags`]
//!
//! Semantics are leftmost-first. `\d` and `\w` are ASCII; `\s` is Unicode whitespace.
//! `$` without `multiline` matches only at the end of the text.
//!
//! ## Offsets
//! Every offset returned here is a **byte** offset into the searched text. The
//! column kernels in [`kernels::matching`](crate::kernels::matching) convert to
//! character positions where their outputs require it.

pub mod compiler;
pub mod parser;
pub mod program;
pub mod vm;

#[cfg(feature = "fast_hash")]
use ahash::AHashMap;
#[cfg(not(feature = "fast_hash"))]
use std::collections::HashMap;

use std::ops::Range;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::errors::KernelError;

pub use program::Program;
pub use vm::Cache;

/// Matching options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RegexFlags {
    /// Case-insensitive matching with simple case folding.
    pub ignore_case: bool,
    /// `^` and `$` also match at line boundaries.
    pub multiline: bool,
    /// `.` also matches `\n`.
    pub dot_all: bool,
}

impl RegexFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_case(mut self, yes: bool) -> Self {
        self.ignore_case = yes;
        self
    }

    pub fn multiline(mut self, yes: bool) -> Self {
        self.multiline = yes;
        self
    }

    pub fn dot_all(mut self, yes: bool) -> Self {
        self.dot_all = yes;
        self
    }

    /// Flags set in either operand.
    pub fn union(self, other: RegexFlags) -> Self {
        Self {
            ignore_case: self.ignore_case || other.ignore_case,
            multiline: self.multiline || other.multiline,
            dot_all: self.dot_all || other.dot_all,
        }
    }
}

/// A compiled pattern. Cloning is cheap and shares the program.
#[derive(Debug, Clone)]
pub struct Regex {
    pattern: Arc<str>,
    flags: RegexFlags,
    program: Arc<Program>,
}

impl Regex {
    /// Compiles `pattern` with default flags.
    ///
    /// # Errors
    /// `MalformedPattern` with the failing byte offset and a reason.
    pub fn new(pattern: &str) -> Result<Self, KernelError> {
        Self::with_flags(pattern, RegexFlags::default())
    }

    /// Compiles `pattern` with `flags`.
    pub fn with_flags(pattern: &str, flags: RegexFlags) -> Result<Self, KernelError> {
        let program = compiler::compile(pattern, flags)?;
        Ok(Self {
            pattern: Arc::from(pattern),
            flags,
            program: Arc::new(program),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn flags(&self) -> RegexFlags {
        self.flags
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    /// Number of capturing groups, not counting the whole match.
    pub fn group_count(&self) -> usize {
        self.program.group_count()
    }

    /// New matcher with its own scratch space. One per worker.
    pub fn matcher(&self) -> Matcher {
        Matcher::new(Arc::clone(&self.program))
    }

    /// True if the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.matcher().is_match(text)
    }

    /// True if the pattern matches a prefix of `text`.
    pub fn is_match_at_start(&self, text: &str) -> bool {
        self.matcher().is_match_at_start(text)
    }

    /// Byte range of the leftmost-first match.
    pub fn find(&self, text: &str) -> Option<Range<usize>> {
        self.matcher().find_at(text, 0)
    }

    /// Byte ranges of the whole match (index 0) and every group, `None` for groups
    /// that did not participate.
    pub fn captures(&self, text: &str) -> Option<Vec<Option<Range<usize>>>> {
        let mut m = self.matcher();
        let slots = m.captures_at(text, 0)?;
        Some(slot_ranges(slots))
    }
}

pub(crate) fn slot_ranges(slots: &[Option<usize>]) -> Vec<Option<Range<usize>>> {
    slots
        .chunks_exact(2)
        .map(|pair| match (pair[0], pair[1]) {
            (Some(s), Some(e)) => Some(s..e),
            _ => None,
        })
        .collect()
}

/// Reusable matching state for one program.
#[derive(Debug, Clone)]
pub struct Matcher {
    program: Arc<Program>,
    cache: Cache,
    slots: Vec<Option<usize>>,
}

impl Matcher {
    pub fn new(program: Arc<Program>) -> Self {
        let cache = Cache::new(&program);
        let slots = vec![None; program.slots];
        Self {
            program,
            cache,
            slots,
        }
    }

    #[inline]
    fn run(&mut self, text: &str, start: usize, anchored: bool, earliest: bool) -> bool {
        vm::search(
            &self.program,
            &mut self.cache,
            text,
            start,
            anchored,
            earliest,
            &mut self.slots,
        )
    }

    pub fn is_match(&mut self, text: &str) -> bool {
        self.run(text, 0, false, true)
    }

    pub fn is_match_at_start(&mut self, text: &str) -> bool {
        self.run(text, 0, true, true)
    }

    /// Leftmost-first match starting at or after byte offset `start`.
    ///
    /// `start` must lie on a character boundary. Anchors still refer to the whole
    /// text.
    pub fn find_at(&mut self, text: &str, start: usize) -> Option<Range<usize>> {
        if !self.run(text, start, false, false) {
            return None;
        }
        match (self.slots[0], self.slots[1]) {
            (Some(s), Some(e)) => Some(s..e),
            _ => None,
        }
    }

    /// Like [`find_at`](Self::find_at), returning the raw capture slots: pairs of
    /// start and end offsets, group 0 first.
    pub fn captures_at(&mut self, text: &str, start: usize) -> Option<&[Option<usize>]> {
        if self.run(text, start, false, false) {
            Some(&self.slots)
        } else {
            None
        }
    }

    /// Calls `f` with the capture slots of every successive non-overlapping match
    /// until it returns false.
    ///
    /// After an empty match the search resumes one character further on. An empty
    /// match ending where the previous match ended is skipped.
    pub fn for_each_match<F>(&mut self, text: &str, mut f: F)
    where
        F: FnMut(&[Option<usize>]) -> bool,
    {
        let mut at = 0;
        let mut last_end: Option<usize> = None;
        while at <= text.len() {
            if !self.run(text, at, false, false) {
                break;
            }
            let (Some(s), Some(e)) = (self.slots[0], self.slots[1]) else {
                break;
            };
            if s == e && last_end == Some(e) {
                match next_boundary(text, e) {
                    Some(next) => {
                        at = next;
                        continue;
                    }
                    None => break,
                }
            }
            if !f(&self.slots) {
                break;
            }
            last_end = Some(e);
            at = if s == e {
                match next_boundary(text, e) {
                    Some(next) => next,
                    None => break,
                }
            } else {
                e
            };
        }
    }

    /// Byte ranges of every non-overlapping match, up to `limit`.
    pub fn find_all(&mut self, text: &str, limit: Option<usize>) -> Vec<Range<usize>> {
        let limit = limit.unwrap_or(usize::MAX);
        let mut out = Vec::new();
        if limit == 0 {
            return out;
        }
        self.for_each_match(text, |slots| {
            if let (Some(s), Some(e)) = (slots[0], slots[1]) {
                out.push(s..e);
            }
            out.len() < limit
        });
        out
    }
}

/// Offset just past the character starting at `at`, or `None` at the end.
#[inline]
fn next_boundary(text: &str, at: usize) -> Option<usize> {
    text[at..].chars().next().map(|c| at + c.len_utf8())
}

/// Opaque identifier of a registered pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternHandle(u64);

impl PatternHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[cfg(feature = "fast_hash")]
type Map<K, V> = AHashMap<K, V>;
#[cfg(not(feature = "fast_hash"))]
type Map<K, V> = HashMap<K, V>;

#[derive(Default)]
struct RegistryInner {
    next: u64,
    by_key: Map<(Arc<str>, RegexFlags), PatternHandle>,
    programs: Map<PatternHandle, Regex>,
}

/// Thread-safe table of compiled patterns, keyed by `(pattern, flags)`.
///
/// Registering the same pattern and flags twice returns the same handle and
/// compiles only once.
#[derive(Default)]
pub struct PatternRegistry {
    inner: RwLock<RegistryInner>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `pattern` unless already registered and returns its handle.
    ///
    /// # Errors
    /// `MalformedPattern` if the pattern does not compile; nothing is registered.
    pub fn register(&self, pattern: &str, flags: RegexFlags) -> Result<PatternHandle, KernelError> {
        let key = (Arc::<str>::from(pattern), flags);
        if let Some(&handle) = self.inner.read().by_key.get(&key) {
            return Ok(handle);
        }
        let regex = Regex::with_flags(pattern, flags)?;

        let mut inner = self.inner.write();
        if let Some(&handle) = inner.by_key.get(&key) {
            return Ok(handle);
        }
        let handle = PatternHandle(inner.next);
        inner.next += 1;
        inner.by_key.insert(key, handle);
        inner.programs.insert(handle, regex);
        debug!("registered pattern {:?} as handle {}", pattern, handle.0);
        Ok(handle)
    }

    /// The compiled pattern behind `handle`.
    ///
    /// # Errors
    /// `InvalidArguments` for an unknown or released handle.
    pub fn get(&self, handle: PatternHandle) -> Result<Regex, KernelError> {
        self.inner
            .read()
            .programs
            .get(&handle)
            .cloned()
            .ok_or_else(|| {
                KernelError::InvalidArguments(format!("unknown pattern handle {}", handle.0))
            })
    }

    /// Drops the pattern. Returns false if the handle was unknown.
    ///
    /// Clones of the [`Regex`] already handed out stay usable.
    pub fn release(&self, handle: PatternHandle) -> bool {
        let mut inner = self.inner.write();
        match inner.programs.remove(&handle) {
            Some(regex) => {
                inner.by_key.remove(&(Arc::clone(&regex.pattern), regex.flags));
                debug!("released pattern handle {}", handle.0);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_find_and_captures() {
        let re = Regex::new("(\\w+)@(\\w+)\\.com").unwrap();
        assert_eq!(re.group_count(), 2);
        assert_eq!(re.find("mail bob@site.com now"), Some(5..17));
        let caps = re.captures("bob@site.com").unwrap();
        assert_eq!(caps, vec![Some(0..12), Some(0..3), Some(4..8)]);
        assert!(re.captures("nothing").is_none());
    }

    #[test]
    fn test_match_at_start() {
        let re = Regex::new("\\d+").unwrap();
        assert!(re.is_match("ab12"));
        assert!(!re.is_match_at_start("ab12"));
        assert!(re.is_match_at_start("12ab"));
    }

    #[test]
    fn test_flags() {
        let re = Regex::with_flags("^b.", RegexFlags::new().multiline(true)).unwrap();
        assert_eq!(re.find("a\nbc"), Some(2..4));
        assert!(!Regex::new("^b.").unwrap().is_match("a\nbc"));
        assert!(Regex::new("(?i)HELLO").unwrap().is_match("say hello"));
        assert!(!Regex::new("a.b").unwrap().is_match("a\nb"));
        assert!(Regex::new("(?s)a.b").unwrap().is_match("a\nb"));
    }

    #[test]
    fn test_find_all_empty_matches() {
        let mut m = Regex::new("a*").unwrap().matcher();
        assert_eq!(m.find_all("baaa", None), vec![0..0, 1..4]);
        assert_eq!(m.find_all("aab", None), vec![0..2, 3..3]);
        assert_eq!(m.find_all("", None), vec![0..0]);
        let mut e = Regex::new("").unwrap().matcher();
        assert_eq!(e.find_all("né", None), vec![0..0, 1..1, 3..3]);
        assert_eq!(e.find_all("né", Some(2)), vec![0..0, 1..1]);
    }

    #[test]
    fn test_registry_dedupes_and_releases() {
        let reg = PatternRegistry::new();
        let a = reg.register("ab+", RegexFlags::default()).unwrap();
        let b = reg.register("ab+", RegexFlags::default()).unwrap();
        let c = reg.register("ab+", RegexFlags::new().ignore_case(true)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(reg.len(), 2);

        let re = reg.get(a).unwrap();
        assert!(reg.release(a));
        assert!(!reg.release(a));
        assert!(matches!(reg.get(a), Err(KernelError::InvalidArguments(_))));
        assert!(re.is_match("xabb"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_registry_rejects_bad_pattern() {
        let reg = PatternRegistry::new();
        let err = reg.register("(a", RegexFlags::default()).unwrap_err();
        assert!(err.is_pattern_error());
        assert!(reg.is_empty());
    }
}
