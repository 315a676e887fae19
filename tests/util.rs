// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! Test helpers shared by the integration tests: seeded data generators, store
//! construction and log capture.
#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use string_kernels::CharacterStore;

/// Routes `log` output through the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn str_array(vals: &[Option<&str>]) -> CharacterStore {
    CharacterStore::from_opt_strs(vals).expect("store construction")
}

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Random string of up to `max_len` characters drawn from `alphabet`.
pub fn random_text(rng: &mut StdRng, alphabet: &[char], max_len: usize) -> String {
    let len = rng.random_range(0..=max_len);
    (0..len)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())])
        .collect()
}

/// Random host column and the store built from it.
pub fn random_column(
    rng: &mut StdRng,
    n: usize,
    null_ratio: f64,
    alphabet: &[char],
    max_len: usize,
) -> (Vec<Option<String>>, CharacterStore) {
    let values: Vec<Option<String>> = (0..n)
        .map(|_| {
            if rng.random_bool(null_ratio) {
                None
            } else {
                Some(random_text(rng, alphabet, max_len))
            }
        })
        .collect();
    let store = CharacterStore::from_values(values.clone()).expect("store construction");
    (values, store)
}
