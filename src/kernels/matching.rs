// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Regex Matching Kernels** - *Bulk Match, Extract, Replace and Split*
//!
//! Applies one compiled [`Regex`] to every element of a store.
//!
//! ## Core Operations
//! - **contains_re / match_re**: boolean predicates; `match_re` is anchored at the
//!   start of each element
//! - **find_re / count_re**: leftmost match location and non-overlapping match count
//! - **extract**: one zero-copy store per capture group
//! - **findall**: every non-overlapping match as a list row
//! - **replace_re / replace_with_backrefs**: literal or template substitution
//! - **split_re / split_re_columns**: split on matches
//!
//! Each pass gives every worker its own matcher via `map_init`, so scratch space is
//! allocated once per worker and reused for every element it visits.
//!
//! ## Empty matches
//! After a zero-length match the scan resumes one character further on, and an empty
//! match ending where the previous match ended is not reported. `a*` over `"baaa"`
//! matches at `0..0` and `1..4`.
//!
//! Null elements are null in every output.

use std::ops::Range;

use arrow_buffer::{BooleanBuffer, ScalarBuffer};

use crate::columns::{BooleanColumn, ListColumn, MatchColumn, NumericColumn};
use crate::device::launch_map_init;
use crate::errors::KernelError;
use crate::kernels::split::{list_from_row_spans, list_to_columns};
use crate::regex::{slot_ranges, Regex};
use crate::store::CharacterStore;
use crate::utils::{to_i32, ByteWriter};

/// True where the pattern matches anywhere in the element.
pub fn contains_re(store: &CharacterStore, re: &Regex) -> BooleanColumn {
    let values = launch_map_init(store.len(), || re.matcher(), |m, i| {
        store.view(i).as_str().is_some_and(|t| m.is_match(t))
    });
    BooleanColumn::new(BooleanBuffer::from(values), store.nulls())
}

/// True where the pattern matches a prefix of the element.
pub fn match_re(store: &CharacterStore, re: &Regex) -> BooleanColumn {
    let values = launch_map_init(store.len(), || re.matcher(), |m, i| {
        store.view(i).as_str().is_some_and(|t| m.is_match_at_start(t))
    });
    BooleanColumn::new(BooleanBuffer::from(values), store.nulls())
}

/// Character position and character length of the leftmost match per element.
pub fn find_re(store: &CharacterStore, re: &Regex) -> MatchColumn {
    let found = launch_map_init(store.len(), || re.matcher(), |m, i| {
        let v = store.view(i);
        let r = v.as_str().and_then(|t| m.find_at(t, 0))?;
        let start = v.char_position(r.start);
        Some((to_i32(start), to_i32(v.char_position(r.end) - start)))
    });
    let positions: ScalarBuffer<i32> = found
        .iter()
        .map(|f| f.map_or(MatchColumn::NO_MATCH, |(p, _)| p))
        .collect();
    let lengths: ScalarBuffer<i32> = found.iter().map(|f| f.map_or(0, |(_, l)| l)).collect();
    MatchColumn {
        positions,
        lengths,
        nulls: store.nulls(),
    }
}

/// Number of non-overlapping matches per element.
pub fn count_re(store: &CharacterStore, re: &Regex) -> NumericColumn<i32> {
    let counts = launch_map_init(store.len(), || re.matcher(), |m, i| {
        let Some(text) = store.view(i).as_str() else {
            return 0;
        };
        let mut n = 0i32;
        m.for_each_match(text, |_| {
            n = n.saturating_add(1);
            true
        });
        n
    });
    NumericColumn::new(ScalarBuffer::from(counts), store.nulls())
}

/// Capture groups of the leftmost match, one store per group in group order.
///
/// Rows that do not match, and groups that did not take part in the match, are
/// null. Every output store shares the input buffer.
///
/// # Errors
/// `InvalidArguments` if the pattern has no capturing groups.
pub fn extract(store: &CharacterStore, re: &Regex) -> Result<Vec<CharacterStore>, KernelError> {
    let groups = re.group_count();
    if groups == 0 {
        return Err(KernelError::InvalidArguments(format!(
            "extract: pattern {:?} has no capture groups",
            re.pattern()
        )));
    }
    let caps: Vec<Option<Vec<Option<Range<usize>>>>> =
        launch_map_init(store.len(), || re.matcher(), |m, i| {
            let text = store.view(i).as_str()?;
            m.captures_at(text, 0).map(slot_ranges)
        });
    Ok((1..=groups)
        .map(|k| {
            store.share(store.len(), |i| {
                let span = caps[i].as_ref()?.get(k)?.clone()?;
                Some((i, span))
            })
        })
        .collect())
}

/// Byte ranges of the matches in every element, `None` for null rows.
fn match_spans(
    store: &CharacterStore,
    re: &Regex,
    limit: Option<usize>,
) -> Vec<Option<Vec<Range<usize>>>> {
    launch_map_init(store.len(), || re.matcher(), |m, i| {
        let text = store.view(i).as_str()?;
        Some(m.find_all(text, limit))
    })
}

/// Every non-overlapping whole match per element.
pub fn findall(store: &CharacterStore, re: &Regex) -> Result<ListColumn, KernelError> {
    list_from_row_spans(store, match_spans(store, re, None))
}

/// Replaces up to `max` matches per element with the literal `repl`.
pub fn replace_re(
    store: &CharacterStore,
    re: &Regex,
    repl: &str,
    max: Option<usize>,
) -> Result<CharacterStore, KernelError> {
    if max == Some(0) {
        return Ok(store.clone());
    }
    let spans = match_spans(store, re, max);
    CharacterStore::build(
        store.len(),
        |i| {
            let text = store.view(i).as_str()?;
            let hits = spans[i].as_deref().unwrap_or_default();
            let removed: usize = hits.iter().map(|r| r.len()).sum();
            Some(text.len() - removed + hits.len() * repl.len())
        },
        |i, out| {
            let text = store.view(i).as_bytes();
            let mut w = ByteWriter::new(out);
            let mut last = 0;
            for r in spans[i].as_deref().unwrap_or_default() {
                w.push_bytes(&text[last..r.start]);
                w.push_str(repl);
                last = r.end;
            }
            w.push_bytes(&text[last..]);
        },
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Group(usize),
}

/// Parses a substitution template into literal runs and group references.
///
/// `\N` and `${N}` refer to group `N`; `\\` and `$$` are a literal `\` and `$`.
fn parse_template(template: &str, groups: usize) -> Result<Vec<Piece>, KernelError> {
    let bad = |reason: String| KernelError::InvalidArguments(format!("replace_with_backrefs: {}", reason));
    let mut pieces = Vec::new();
    let mut lit = String::new();
    let mut chars = template.char_indices().peekable();
    while let Some((at, c)) = chars.next() {
        let group = match (c, chars.peek().map(|&(_, n)| n)) {
            ('\\', Some('\\')) | ('$', Some('$')) => {
                chars.next();
                lit.push(c);
                continue;
            }
            ('\\', Some(d)) if d.is_ascii_digit() => {
                let mut n = 0usize;
                while let Some(&(_, d)) = chars.peek() {
                    let Some(v) = d.to_digit(10) else { break };
                    n = n.saturating_mul(10).saturating_add(v as usize);
                    chars.next();
                }
                n
            }
            ('$', Some('{')) => {
                chars.next();
                let mut digits = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, d)) if d.is_ascii_digit() => digits.push(d),
                        _ => return Err(bad(format!("malformed group reference at byte {}", at))),
                    }
                }
                digits
                    .parse::<usize>()
                    .map_err(|_| bad(format!("malformed group reference at byte {}", at)))?
            }
            _ => {
                lit.push(c);
                continue;
            }
        };
        if group > groups {
            return Err(bad(format!(
                "group {} referenced but pattern has {} groups",
                group, groups
            )));
        }
        if !lit.is_empty() {
            pieces.push(Piece::Literal(std::mem::take(&mut lit)));
        }
        pieces.push(Piece::Group(group));
    }
    if !lit.is_empty() {
        pieces.push(Piece::Literal(lit));
    }
    Ok(pieces)
}

/// Replaces up to `max` matches per element with `template`, expanding `\N` and
/// `${N}` to the text of capture group `N` (`0` is the whole match). Groups that
/// did not take part in a match expand to nothing.
///
/// # Errors
/// `InvalidArguments` for a reference to a group the pattern does not have, or a
/// malformed `${...}` reference.
pub fn replace_with_backrefs(
    store: &CharacterStore,
    re: &Regex,
    template: &str,
    max: Option<usize>,
) -> Result<CharacterStore, KernelError> {
    let pieces = parse_template(template, re.group_count())?;
    if max == Some(0) {
        return Ok(store.clone());
    }
    let cap = max.unwrap_or(usize::MAX);

    let matches: Vec<Vec<Vec<Option<Range<usize>>>>> =
        launch_map_init(store.len(), || re.matcher(), |m, i| {
            let mut found = Vec::new();
            if let Some(text) = store.view(i).as_str() {
                m.for_each_match(text, |slots| {
                    found.push(slot_ranges(slots));
                    found.len() < cap
                });
            }
            found
        });

    let expanded_len = |caps: &[Option<Range<usize>>]| -> usize {
        pieces
            .iter()
            .map(|p| match p {
                Piece::Literal(s) => s.len(),
                Piece::Group(g) => caps[*g].as_ref().map_or(0, |r| r.len()),
            })
            .sum()
    };

    CharacterStore::build(
        store.len(),
        |i| {
            let text = store.view(i).as_str()?;
            let mut size = text.len();
            for caps in &matches[i] {
                size -= caps[0].as_ref().map_or(0, |r| r.len());
                size += expanded_len(caps);
            }
            Some(size)
        },
        |i, out| {
            let text = store.view(i).as_bytes();
            let mut w = ByteWriter::new(out);
            let mut last = 0;
            for caps in &matches[i] {
                let Some(whole) = caps[0].as_ref() else { continue };
                w.push_bytes(&text[last..whole.start]);
                for p in &pieces {
                    match p {
                        Piece::Literal(s) => w.push_str(s),
                        Piece::Group(g) => {
                            if let Some(r) = &caps[*g] {
                                w.push_bytes(&text[r.clone()]);
                            }
                        }
                    }
                }
                last = whole.end;
            }
            w.push_bytes(&text[last..]);
        },
    )
}

/// Splits every element on matches of the pattern, using at most `limit` matches.
///
/// Pieces share the input buffer.
pub fn split_re(
    store: &CharacterStore,
    re: &Regex,
    limit: Option<usize>,
) -> Result<ListColumn, KernelError> {
    let spans = match_spans(store, re, limit);
    let rows = spans
        .into_iter()
        .enumerate()
        .map(|(i, hits)| {
            let hits = hits?;
            let len = store.view(i).byte_len();
            let mut pieces = Vec::with_capacity(hits.len() + 1);
            let mut last = 0;
            for r in hits {
                pieces.push(last..r.start);
                last = r.end;
            }
            pieces.push(last..len);
            Some(pieces)
        })
        .collect();
    list_from_row_spans(store, rows)
}

/// Like [`split_re`], returning piece `k` of every row as store `k`.
pub fn split_re_columns(
    store: &CharacterStore,
    re: &Regex,
    limit: Option<usize>,
) -> Result<Vec<CharacterStore>, KernelError> {
    Ok(list_to_columns(&split_re(store, re, limit)?))
}
