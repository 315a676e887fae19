// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Split Kernels** - *Delimiter and Whitespace Tokenisation*
//!
//! Splits every element into pieces. Pieces are zero-copy: the resulting
//! [`ListColumn`] values store points into the input buffer.
//!
//! ## Limits
//! With `limit = Some(n)` at most `n` separators are used, giving at most `n + 1`
//! pieces; the remaining separators stay unsplit in the final piece (or, for the
//! `rsplit` variants, the first piece).
//!
//! ## Whitespace mode
//! `delim = None` splits on runs of Unicode whitespace and drops leading and trailing
//! whitespace, so an empty or blank element has no pieces.

use std::ops::Range;

use memchr::memmem::{Finder, FinderRev};

use crate::columns::ListColumn;
use crate::device::{exclusive_scan, launch_map};
use crate::errors::KernelError;
use crate::store::CharacterStore;
use crate::utils::validity_from_fn;

/// Assembles a list column from per-row byte ranges into `store`.
///
/// Ranges within a row must be ascending and non-overlapping. `None` rows are null.
pub(crate) fn list_from_row_spans(
    store: &CharacterStore,
    rows: Vec<Option<Vec<Range<usize>>>>,
) -> Result<ListColumn, KernelError> {
    let counts: Vec<usize> = rows.iter().map(|r| r.as_ref().map_or(0, Vec::len)).collect();
    let (starts, total) = exclusive_scan(&counts)?;

    let mut flat = Vec::with_capacity(total);
    for (row, spans) in rows.iter().enumerate() {
        if let Some(spans) = spans {
            flat.extend(spans.iter().map(|r| (row, r.clone())));
        }
    }
    let values = store.share(total, |k| Some(flat[k].clone()));

    let mut row_offsets: Vec<i64> = starts.into_iter().map(|s| s as i64).collect();
    row_offsets.push(total as i64);
    Ok(ListColumn {
        values,
        row_offsets: row_offsets.into(),
        nulls: validity_from_fn(rows.len(), |i| rows[i].is_some()),
    })
}

fn validate_delim(fname: &str, delim: Option<&str>) -> Result<(), KernelError> {
    if delim == Some("") {
        return Err(KernelError::InvalidArguments(format!(
            "{}: empty delimiter",
            fname
        )));
    }
    Ok(())
}

/// Start offset of the next non-whitespace character at or after `from`.
#[inline]
fn skip_ws(text: &str, from: usize) -> usize {
    text[from..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map_or(text.len(), |(b, _)| from + b)
}

/// End offset of the last non-whitespace character before `to`.
#[inline]
fn skip_ws_back(text: &str, to: usize) -> usize {
    text[..to]
        .char_indices()
        .rev()
        .find(|(_, c)| !c.is_whitespace())
        .map_or(0, |(b, c)| b + c.len_utf8())
}

fn split_ws(text: &str, limit: usize) -> Vec<Range<usize>> {
    let mut pieces = Vec::new();
    let mut i = skip_ws(text, 0);
    while i < text.len() {
        if pieces.len() == limit {
            pieces.push(i..text.len());
            break;
        }
        let j = text[i..]
            .char_indices()
            .find(|(_, c)| c.is_whitespace())
            .map_or(text.len(), |(b, _)| i + b);
        pieces.push(i..j);
        i = skip_ws(text, j);
    }
    pieces
}

fn rsplit_ws(text: &str, limit: usize) -> Vec<Range<usize>> {
    let mut pieces = Vec::new();
    let mut j = skip_ws_back(text, text.len());
    while j > 0 {
        if pieces.len() == limit {
            pieces.push(0..j);
            break;
        }
        let i = text[..j]
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map_or(0, |(b, c)| b + c.len_utf8());
        pieces.push(i..j);
        j = skip_ws_back(text, i);
    }
    pieces.reverse();
    pieces
}

fn split_delim(text: &[u8], finder: &Finder<'_>, limit: usize) -> Vec<Range<usize>> {
    let dlen = finder.needle().len();
    let mut pieces = Vec::new();
    let mut last = 0;
    for at in finder.find_iter(text).take(limit) {
        pieces.push(last..at);
        last = at + dlen;
    }
    pieces.push(last..text.len());
    pieces
}

fn rsplit_delim(text: &[u8], finder: &FinderRev<'_>, limit: usize) -> Vec<Range<usize>> {
    let dlen = finder.needle().len();
    let mut pieces = Vec::new();
    let mut end = text.len();
    for at in finder.rfind_iter(text).take(limit) {
        pieces.push(at + dlen..end);
        end = at;
    }
    pieces.push(0..end);
    pieces.reverse();
    pieces
}

/// Splits every element on `delim` from the left.
///
/// # Errors
/// `InvalidArguments` for an empty delimiter.
pub fn split(
    store: &CharacterStore,
    delim: Option<&str>,
    limit: Option<usize>,
) -> Result<ListColumn, KernelError> {
    validate_delim("split", delim)?;
    let limit = limit.unwrap_or(usize::MAX);
    let finder = delim.map(Finder::new);
    let rows = launch_map(store.len(), |i| {
        let text = store.view(i).as_str()?;
        Some(match &finder {
            Some(f) => split_delim(text.as_bytes(), f, limit),
            None => split_ws(text, limit),
        })
    });
    list_from_row_spans(store, rows)
}

/// Splits every element on `delim`, counting separators from the right.
///
/// # Errors
/// `InvalidArguments` for an empty delimiter.
pub fn rsplit(
    store: &CharacterStore,
    delim: Option<&str>,
    limit: Option<usize>,
) -> Result<ListColumn, KernelError> {
    validate_delim("rsplit", delim)?;
    let limit = limit.unwrap_or(usize::MAX);
    let finder = delim.map(FinderRev::new);
    let rows = launch_map(store.len(), |i| {
        let text = store.view(i).as_str()?;
        Some(match &finder {
            Some(f) => rsplit_delim(text.as_bytes(), f, limit),
            None => rsplit_ws(text, limit),
        })
    });
    list_from_row_spans(store, rows)
}

/// Spreads a list column into one store per piece position.
///
/// Store `k` holds piece `k` of every row, null where a row is null or has fewer
/// pieces. All stores share the list's buffer.
pub fn list_to_columns(list: &ListColumn) -> Vec<CharacterStore> {
    let n = list.len();
    let width = (0..n).map(|i| list.row_len(i)).max().unwrap_or(0);
    (0..width)
        .map(|k| {
            list.values.share(n, |i| {
                let r = list.row_range(i);
                (k < r.len()).then(|| {
                    let p = r.start + k;
                    (p, 0..list.values.view(p).byte_len())
                })
            })
        })
        .collect()
}

/// Like [`split`], returning piece `k` of every row as store `k`.
pub fn split_columns(
    store: &CharacterStore,
    delim: Option<&str>,
    limit: Option<usize>,
) -> Result<Vec<CharacterStore>, KernelError> {
    Ok(list_to_columns(&split(store, delim, limit)?))
}
