// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! Pike VM executor.
//!
//! Simulates all threads of a [`Program`] in lockstep over the input, one character
//! at a time. Each instruction is entered at most once per position, so a search
//! costs `O(program length × text length)` regardless of pattern shape, and
//! patterns such as `(a*)*b` cannot backtrack catastrophically.
//!
//! Thread lists are sparse sets with a flat capture slot table. The epsilon closure
//! is walked with an explicit work stack whose depth is bounded by the program
//! length, never by recursion. All of it lives in [`Cache`] and is reused across
//! searches, so a worker allocates once per batch rather than once per element.
//!
//! Priority between threads follows list order, giving leftmost-first semantics:
//! earlier alternatives and greedy loop continuations win.

use super::program::{assertion_holds, Inst, Program};

/// Set of program counters with insertion order and `O(1)` clear.
#[derive(Debug, Clone)]
struct SparseSet {
    dense: Vec<usize>,
    sparse: Vec<usize>,
    len: usize,
}

impl SparseSet {
    fn new(capacity: usize) -> Self {
        Self {
            dense: vec![0; capacity],
            sparse: vec![0; capacity],
            len: 0,
        }
    }

    #[inline]
    fn contains(&self, pc: usize) -> bool {
        let i = self.sparse[pc];
        i < self.len && self.dense[i] == pc
    }

    /// Returns false if `pc` was already present.
    #[inline]
    fn insert(&mut self, pc: usize) -> bool {
        if self.contains(pc) {
            return false;
        }
        self.dense[self.len] = pc;
        self.sparse[pc] = self.len;
        self.len += 1;
        true
    }

    #[inline]
    fn clear(&mut self) {
        self.len = 0;
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Live threads at one input position with their capture slots.
#[derive(Debug, Clone)]
struct Threads {
    set: SparseSet,
    caps: Vec<Option<usize>>,
    slots: usize,
}

impl Threads {
    fn new(program: &Program) -> Self {
        Self {
            set: SparseSet::new(program.len()),
            caps: vec![None; program.len() * program.slots],
            slots: program.slots,
        }
    }

    #[inline]
    fn thread(&self, pc: usize) -> &[Option<usize>] {
        &self.caps[pc * self.slots..(pc + 1) * self.slots]
    }

    #[inline]
    fn thread_mut(&mut self, pc: usize) -> &mut [Option<usize>] {
        &mut self.caps[pc * self.slots..(pc + 1) * self.slots]
    }
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    Explore(usize),
    RestoreCapture { slot: usize, old: Option<usize> },
}

/// Per-worker scratch for one program.
#[derive(Debug, Clone)]
pub struct Cache {
    clist: Threads,
    nlist: Threads,
    stack: Vec<Frame>,
    caps: Vec<Option<usize>>,
}

impl Cache {
    pub fn new(program: &Program) -> Self {
        Self {
            clist: Threads::new(program),
            nlist: Threads::new(program),
            stack: Vec::with_capacity(2 * program.len() + 1),
            caps: vec![None; program.slots],
        }
    }
}

/// Follows epsilon transitions from `pc` at offset `at`, adding every reachable
/// consuming instruction (and `Match`) to `list` with the capture state in `caps`.
fn add_thread(
    program: &Program,
    list: &mut Threads,
    stack: &mut Vec<Frame>,
    caps: &mut [Option<usize>],
    text: &str,
    pc: usize,
    at: usize,
) {
    stack.push(Frame::Explore(pc));
    while let Some(frame) = stack.pop() {
        match frame {
            Frame::RestoreCapture { slot, old } => caps[slot] = old,
            Frame::Explore(pc) => {
                if !list.set.insert(pc) {
                    continue;
                }
                match program.insts[pc] {
                    Inst::Jump(target) => stack.push(Frame::Explore(target)),
                    Inst::Split { primary, secondary } => {
                        stack.push(Frame::Explore(secondary));
                        stack.push(Frame::Explore(primary));
                    }
                    Inst::Save(slot) => {
                        stack.push(Frame::RestoreCapture { slot, old: caps[slot] });
                        caps[slot] = Some(at);
                        stack.push(Frame::Explore(pc + 1));
                    }
                    Inst::Assert(a) => {
                        if assertion_holds(a, text, at) {
                            stack.push(Frame::Explore(pc + 1));
                        }
                    }
                    Inst::Char { .. } | Inst::Any { .. } | Inst::Class { .. } | Inst::Match => {
                        list.thread_mut(pc).copy_from_slice(caps);
                    }
                }
            }
        }
    }
}

/// Searches `text` from byte offset `start`.
///
/// With `anchored` the match must begin at `start`. With `earliest` the search stops
/// at the first match state reached, which is enough to answer yes/no questions but
/// does not give leftmost-first bounds. On success `slots` holds the capture
/// offsets (absolute within `text`) of the winning thread.
pub fn search(
    program: &Program,
    cache: &mut Cache,
    text: &str,
    start: usize,
    anchored: bool,
    earliest: bool,
    slots: &mut [Option<usize>],
) -> bool {
    let Cache {
        clist,
        nlist,
        stack,
        caps,
    } = cache;
    clist.set.clear();
    nlist.set.clear();

    let mut matched = false;
    let mut at = start;
    loop {
        if clist.set.is_empty() && (matched || (anchored && at > start)) {
            break;
        }
        if !matched && (!anchored || at == start) {
            caps.fill(None);
            add_thread(program, clist, stack, caps, text, program.start, at);
        }

        let ch = text[at..].chars().next();
        for i in 0..clist.set.len {
            let pc = clist.set.dense[i];
            if let Inst::Match = program.insts[pc] {
                slots.copy_from_slice(clist.thread(pc));
                matched = true;
                if earliest {
                    return true;
                }
                // Lower-priority threads are cut.
                break;
            }
            if let Some(c) = ch {
                if program.accepts(pc, c) {
                    caps.copy_from_slice(clist.thread(pc));
                    add_thread(program, nlist, stack, caps, text, pc + 1, at + c.len_utf8());
                }
            }
        }

        let Some(c) = ch else { break };
        std::mem::swap(clist, nlist);
        nlist.set.clear();
        at += c.len_utf8();
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::compiler::compile;
    use crate::regex::RegexFlags;

    fn run(pattern: &str, text: &str, anchored: bool) -> Option<Vec<Option<usize>>> {
        let p = compile(pattern, RegexFlags::default()).unwrap();
        let mut cache = Cache::new(&p);
        let mut slots = vec![None; p.slots];
        search(&p, &mut cache, text, 0, anchored, false, &mut slots).then_some(slots)
    }

    #[test]
    fn test_leftmost_first_alternation() {
        let s = run("a|ab", "ab", false).unwrap();
        assert_eq!((s[0], s[1]), (Some(0), Some(1)));
        let s = run("ab|a", "ab", false).unwrap();
        assert_eq!((s[0], s[1]), (Some(0), Some(2)));
    }

    #[test]
    fn test_greedy_and_lazy() {
        let s = run("a+", "xaaay", false).unwrap();
        assert_eq!((s[0], s[1]), (Some(1), Some(4)));
        let s = run("a+?", "xaaay", false).unwrap();
        assert_eq!((s[0], s[1]), (Some(1), Some(2)));
    }

    #[test]
    fn test_captures_last_iteration() {
        let s = run("(a|b)+", "abba", false).unwrap();
        assert_eq!(s, vec![Some(0), Some(4), Some(3), Some(4)]);
        let s = run("(x)?y", "y", false).unwrap();
        assert_eq!(s, vec![Some(0), Some(1), None, None]);
    }

    #[test]
    fn test_anchored_search() {
        assert!(run("b", "ab", true).is_none());
        assert!(run("a", "ab", true).is_some());
        assert!(run("b", "ab", false).is_some());
    }

    #[test]
    fn test_nested_star_does_not_blow_up() {
        let text = "a".repeat(5_000);
        assert!(run("(a*)*b", &text, false).is_none());
        let s = run("(a*)*", &text, false).unwrap();
        assert_eq!((s[0], s[1]), (Some(0), Some(5_000)));
    }

    #[test]
    fn test_search_from_offset_keeps_text_anchors() {
        let p = compile("^a", RegexFlags::default()).unwrap();
        let mut cache = Cache::new(&p);
        let mut slots = vec![None; p.slots];
        assert!(!search(&p, &mut cache, "aa", 1, false, false, &mut slots));
        let w = compile("\\bb", RegexFlags::default()).unwrap();
        let mut cache = Cache::new(&w);
        let mut slots = vec![None; w.slots];
        assert!(!search(&w, &mut cache, "ab", 1, false, false, &mut slots));
        assert!(search(&w, &mut cache, "ab b", 1, false, false, &mut slots));
        assert_eq!(slots[0], Some(3));
    }

    #[test]
    fn test_multibyte_positions() {
        let s = run("é+", "caféé!", false).unwrap();
        assert_eq!((s[0], s[1]), (Some(3), Some(7)));
    }
}
