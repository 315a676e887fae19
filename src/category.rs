// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Categorical Encoding** - *Sorted Key Table with Dense Codes*
//!
//! A [`CategoryTable`] dictionary-encodes a store: `keys` holds every distinct
//! non-null value in strictly increasing byte order, and `codes[i]` is the index of
//! element `i`'s value in `keys`, or [`NULL_CODE`] for null elements.
//!
//! ## Encoding
//! 1. Stable parallel argsort, nulls first.
//! 2. Flag each sorted position whose value differs from its predecessor.
//! 3. Exclusive prefix sum over the flags gives every position its rank.
//! 4. Scatter ranks back to the original element order.
//!
//! Keys are gathered from the first occurrence of each distinct value.
//!
//! ## Key maintenance
//! `add_keys`, `remove_keys`, `remove_unused_keys`, `set_keys` and `merge` all build a
//! new key set and then remap every code against it by binary search. Tables are
//! immutable; each operation returns a new one.

#[cfg(feature = "fast_hash")]
use ahash::AHashSet;
#[cfg(not(feature = "fast_hash"))]
use std::collections::HashSet;

use std::cmp::Ordering;

use arrow_buffer::ScalarBuffer;
use log::debug;

use crate::device::{exclusive_scan, launch_map, launch_scatter, try_alloc};
use crate::errors::KernelError;
use crate::kernels::compare::{argsort, ArgsortConfig};
use crate::store::CharacterStore;

/// Code of a null element.
pub const NULL_CODE: i32 = -1;

/// Dictionary encoding of a store.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTable {
    keys: CharacterStore,
    codes: ScalarBuffer<i32>,
}

/// Binary search over a sorted store without nulls.
fn search_sorted(keys: &CharacterStore, needle: &[u8]) -> Result<usize, usize> {
    let (mut lo, mut hi) = (0, keys.len());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match keys.view(mid).as_bytes().cmp(needle) {
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
            Ordering::Equal => return Ok(mid),
        }
    }
    Err(lo)
}

impl CategoryTable {
    /// Encodes `store`.
    ///
    /// # Errors
    /// `Overflow` if the number of distinct values does not fit a code.
    pub fn from_store(store: &CharacterStore) -> Result<Self, KernelError> {
        let order = argsort(store, &ArgsortConfig::new());
        let sorted = &order[store.null_count()..];

        let flags = launch_map(sorted.len(), |k| {
            usize::from(k == 0 || store.view(sorted[k]) != store.view(sorted[k - 1]))
        });
        let (ranks, key_count) = exclusive_scan(&flags)?;
        if key_count > i32::MAX as usize {
            return Err(KernelError::Overflow(format!(
                "category: {} distinct values exceed the code range",
                key_count
            )));
        }

        let mut codes = try_alloc(store.len(), NULL_CODE)?;
        launch_scatter(&mut codes, sorted.len(), |k| {
            Some((sorted[k], (ranks[k] + flags[k] - 1) as i32))
        })?;
        let mut first = try_alloc(key_count, 0usize)?;
        launch_scatter(&mut first, sorted.len(), |k| {
            (flags[k] == 1).then(|| (ranks[k], sorted[k]))
        })?;
        let keys = store.gather(&first)?;
        debug!(
            "category: encoded {} elements into {} keys",
            store.len(),
            key_count
        );
        Ok(Self {
            keys,
            codes: codes.into(),
        })
    }

    /// Assembles a table from a key store and codes.
    ///
    /// # Errors
    /// `InvalidArguments` if the parts fail [`validate`](Self::validate).
    pub fn from_parts(keys: CharacterStore, codes: Vec<i32>) -> Result<Self, KernelError> {
        let table = Self {
            keys,
            codes: codes.into(),
        };
        table.validate()?;
        Ok(table)
    }

    /// Checks that keys are non-null and strictly increasing, and that every code
    /// is [`NULL_CODE`] or a key index.
    pub fn validate(&self) -> Result<(), KernelError> {
        if self.keys.null_count() > 0 {
            return Err(KernelError::InvalidArguments(
                "category: key set contains nulls".to_string(),
            ));
        }
        if let Some(k) = (1..self.keys.len())
            .find(|&k| self.keys.view(k - 1).as_bytes() >= self.keys.view(k).as_bytes())
        {
            return Err(KernelError::InvalidArguments(format!(
                "category: keys not strictly increasing at {}",
                k
            )));
        }
        let n = self.keys.len() as i64;
        if let Some(i) = self
            .codes
            .iter()
            .position(|&c| c != NULL_CODE && (c < 0 || c as i64 >= n))
        {
            return Err(KernelError::InvalidArguments(format!(
                "category: code {} at {} outside {} keys",
                self.codes[i], i, n
            )));
        }
        Ok(())
    }

    pub fn keys(&self) -> &CharacterStore {
        &self.keys
    }

    pub fn codes(&self) -> &ScalarBuffer<i32> {
        &self.codes
    }

    /// Key index of element `i`, `None` if it is null.
    #[inline]
    pub fn code(&self, i: usize) -> Option<usize> {
        let c = self.codes[i];
        (c != NULL_CODE).then_some(c as usize)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    #[inline]
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub fn null_count(&self) -> usize {
        self.codes.iter().filter(|&&c| c == NULL_CODE).count()
    }

    /// Decodes back into a store.
    pub fn to_strings(&self) -> Result<CharacterStore, KernelError> {
        let indices: Vec<Option<usize>> = (0..self.len()).map(|i| self.code(i)).collect();
        self.keys.gather_opt(&indices)
    }

    /// Index of `key` in the key set.
    pub fn key_index(&self, key: &str) -> Option<usize> {
        search_sorted(&self.keys, key.as_bytes()).ok()
    }

    /// Element indices whose value is `key`, ascending.
    pub fn indices_for_key(&self, key: &str) -> Vec<usize> {
        match self.key_index(key) {
            Some(k) => {
                let k = k as i32;
                self.codes
                    .iter()
                    .enumerate()
                    .filter_map(|(i, &c)| (c == k).then_some(i))
                    .collect()
            }
            None => Vec::new(),
        }
    }

    /// Selects elements by index; the key set is shared unchanged.
    ///
    /// # Errors
    /// `OutOfBounds` if an index is past the end.
    pub fn gather(&self, indices: &[usize]) -> Result<Self, KernelError> {
        if let Some(&i) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(KernelError::OutOfBounds(format!(
                "category gather: index {} for table of length {}",
                i,
                self.len()
            )));
        }
        let codes: Vec<i32> = indices.iter().map(|&i| self.codes[i]).collect();
        Ok(Self {
            keys: self.keys.clone(),
            codes: codes.into(),
        })
    }

    /// Codes remapped onto `new_keys`; keys missing there become [`NULL_CODE`].
    fn remapped_codes(&self, new_keys: &CharacterStore) -> Vec<i32> {
        let map = launch_map(self.key_count(), |k| {
            search_sorted(new_keys, self.keys.view(k).as_bytes()).map_or(NULL_CODE, |j| j as i32)
        });
        launch_map(self.len(), |i| match self.codes[i] {
            NULL_CODE => NULL_CODE,
            c => map[c as usize],
        })
    }

    fn with_keys(&self, new_keys: CharacterStore) -> Self {
        let codes = self.remapped_codes(&new_keys);
        Self {
            keys: new_keys,
            codes: codes.into(),
        }
    }

    /// Sorted distinct non-null values of the given stores.
    fn distinct_keys(stores: &[&CharacterStore]) -> Result<CharacterStore, KernelError> {
        let all = CharacterStore::concat(stores)?;
        Ok(Self::from_store(&all)?.keys)
    }

    /// Adds the non-null values of `new` to the key set. Existing elements keep
    /// their values; codes shift to the merged order.
    pub fn add_keys(&self, new: &CharacterStore) -> Result<Self, KernelError> {
        let keys = Self::distinct_keys(&[&self.keys, new])?;
        debug!(
            "category: add_keys {} -> {} keys",
            self.key_count(),
            keys.len()
        );
        Ok(self.with_keys(keys))
    }

    /// Removes the named keys. Elements holding a removed key become null.
    pub fn remove_keys(&self, remove: &CharacterStore) -> Result<Self, KernelError> {
        #[cfg(feature = "fast_hash")]
        let drop: AHashSet<&str> = remove.iter().flatten().collect();
        #[cfg(not(feature = "fast_hash"))]
        let drop: HashSet<&str> = remove.iter().flatten().collect();

        let keep: Vec<usize> = (0..self.key_count())
            .filter(|&k| !drop.contains(self.keys.view(k).text()))
            .collect();
        let keys = self.keys.gather(&keep)?;
        debug!(
            "category: remove_keys {} -> {} keys",
            self.key_count(),
            keys.len()
        );
        Ok(self.with_keys(keys))
    }

    /// Drops keys that no element refers to.
    pub fn remove_unused_keys(&self) -> Result<Self, KernelError> {
        let mut used = try_alloc(self.key_count(), false)?;
        for &c in self.codes.iter() {
            if c != NULL_CODE {
                used[c as usize] = true;
            }
        }
        let keep: Vec<usize> = (0..used.len()).filter(|&k| used[k]).collect();
        if keep.len() == self.key_count() {
            return Ok(self.clone());
        }
        Ok(self.with_keys(self.keys.gather(&keep)?))
    }

    /// Replaces the key set with the distinct non-null values of `keys`. Elements
    /// whose value is not among them become null.
    pub fn set_keys(&self, keys: &CharacterStore) -> Result<Self, KernelError> {
        let keys = Self::distinct_keys(&[keys])?;
        Ok(self.with_keys(keys))
    }

    /// Appends `other`'s elements after this table's, over the union of both key
    /// sets.
    pub fn merge(&self, other: &CategoryTable) -> Result<Self, KernelError> {
        let keys = Self::distinct_keys(&[&self.keys, &other.keys])?;
        let mut codes = self.remapped_codes(&keys);
        codes.extend(other.remapped_codes(&keys));
        debug!(
            "category: merged {} + {} elements over {} keys",
            self.len(),
            other.len(),
            keys.len()
        );
        Ok(Self {
            keys,
            codes: codes.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn str_array(vals: &[Option<&str>]) -> CharacterStore {
        CharacterStore::from_opt_strs(vals).unwrap()
    }

    fn codes(t: &CategoryTable) -> Vec<Option<usize>> {
        (0..t.len()).map(|i| t.code(i)).collect()
    }

    #[test]
    fn test_encode_scenario() {
        let s = str_array(&[Some("b"), Some("a"), Some("b"), None, Some("a")]);
        let t = CategoryTable::from_store(&s).unwrap();
        assert_eq!(t.keys(), &str_array(&[Some("a"), Some("b")]));
        assert_eq!(codes(&t), vec![Some(1), Some(0), Some(1), None, Some(0)]);
        assert_eq!(t.null_count(), 1);
        assert_eq!(t.to_strings().unwrap(), s);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_encode_empty_and_all_null() {
        let t = CategoryTable::from_store(&CharacterStore::empty()).unwrap();
        assert_eq!(t.len(), 0);
        assert_eq!(t.key_count(), 0);
        let n = CategoryTable::from_store(&CharacterStore::new_null(3)).unwrap();
        assert_eq!(n.key_count(), 0);
        assert_eq!(codes(&n), vec![None, None, None]);
    }

    #[test]
    fn test_key_lookup() {
        let s = str_array(&[Some("pear"), Some("apple"), Some("pear"), Some("fig")]);
        let t = CategoryTable::from_store(&s).unwrap();
        assert_eq!(t.key_index("fig"), Some(1));
        assert_eq!(t.key_index("kiwi"), None);
        assert_eq!(t.indices_for_key("pear"), vec![0, 2]);
        assert!(t.indices_for_key("kiwi").is_empty());
        let g = t.gather(&[3, 0]).unwrap();
        assert_eq!(g.to_strings().unwrap(), str_array(&[Some("fig"), Some("pear")]));
        assert!(t.gather(&[9]).is_err());
    }

    #[test]
    fn test_add_and_remove_keys() {
        let s = str_array(&[Some("b"), Some("d"), None]);
        let t = CategoryTable::from_store(&s).unwrap();
        let added = t.add_keys(&str_array(&[Some("a"), Some("c"), None, Some("b")])).unwrap();
        assert_eq!(
            added.keys(),
            &str_array(&[Some("a"), Some("b"), Some("c"), Some("d")])
        );
        assert_eq!(codes(&added), vec![Some(1), Some(3), None]);
        assert_eq!(added.to_strings().unwrap(), s);

        let removed = added.remove_keys(&str_array(&[Some("a"), Some("c")])).unwrap();
        assert_eq!(removed, t);

        let dropped = t.remove_keys(&str_array(&[Some("d")])).unwrap();
        assert_eq!(dropped.to_strings().unwrap(), str_array(&[Some("b"), None, None]));
    }

    #[test]
    fn test_remove_unused_and_set_keys() {
        let s = str_array(&[Some("x"), Some("y")]);
        let t = CategoryTable::from_store(&s)
            .unwrap()
            .add_keys(&str_array(&[Some("z")]))
            .unwrap();
        assert_eq!(t.key_count(), 3);
        let trimmed = t.remove_unused_keys().unwrap();
        assert_eq!(trimmed.key_count(), 2);
        assert_eq!(trimmed.to_strings().unwrap(), s);

        let set = t.set_keys(&str_array(&[Some("y"), Some("w"), Some("y")])).unwrap();
        assert_eq!(set.keys(), &str_array(&[Some("w"), Some("y")]));
        assert_eq!(set.to_strings().unwrap(), str_array(&[None, Some("y")]));
    }

    #[test]
    fn test_merge() {
        let a = CategoryTable::from_store(&str_array(&[Some("b"), None])).unwrap();
        let b = CategoryTable::from_store(&str_array(&[Some("c"), Some("a"), Some("b")])).unwrap();
        let m = a.merge(&b).unwrap();
        assert_eq!(m.keys(), &str_array(&[Some("a"), Some("b"), Some("c")]));
        assert_eq!(
            m.to_strings().unwrap(),
            str_array(&[Some("b"), None, Some("c"), Some("a"), Some("b")])
        );
    }

    #[test]
    fn test_from_parts_validates() {
        let keys = str_array(&[Some("a"), Some("b")]);
        assert!(CategoryTable::from_parts(keys.clone(), vec![0, 1, NULL_CODE]).is_ok());
        assert!(CategoryTable::from_parts(keys.clone(), vec![2]).is_err());
        let unsorted = str_array(&[Some("b"), Some("a")]);
        assert!(CategoryTable::from_parts(unsorted, vec![0]).is_err());
        let dup = str_array(&[Some("a"), Some("a")]);
        assert!(CategoryTable::from_parts(dup, vec![]).is_err());
    }
}
