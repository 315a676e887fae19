// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

mod util;

use string_kernels::kernels::case::{to_upper, CaseMode};
use string_kernels::kernels::compare::{sort, ArgsortConfig, NullOrder};
use string_kernels::kernels::matching::{find_re, replace_re};
use string_kernels::kernels::replace::{replace, substring};
use string_kernels::kernels::split::split;
use string_kernels::{
    apply, CategoryTable, CharacterStore, Device, EngineConfig, KernelError, OpOutput,
    PatternRegistry, Regex, RegexFlags, StringOp, NULL_CODE,
};
use util::{init_logging, random_column, seeded_rng, str_array};

fn owned(vals: &[Option<&str>]) -> Vec<Option<String>> {
    vals.iter().map(|v| v.map(str::to_string)).collect()
}

#[test]
fn find_reports_position_and_length_per_row() {
    init_logging();
    let store = str_array(&[Some("ab"), None, Some("abc"), Some("b")]);
    let re = Regex::new("ab+").unwrap();
    assert_eq!(
        find_re(&store, &re).to_vec(),
        vec![Some(Some((0, 2))), None, Some(Some((0, 2))), Some(None)]
    );
}

#[test]
fn split_with_limit_keeps_remainder() {
    let store = str_array(&[Some("a,b,c"), None, Some("")]);
    let list = split(&store, Some(","), Some(1)).unwrap();
    assert_eq!(
        list.to_vec(),
        vec![
            Some(vec!["a".to_string(), "b,c".to_string()]),
            None,
            Some(vec![String::new()]),
        ]
    );

    let store = str_array(&[Some("x,y"), Some("z"), None]);
    let list = split(&store, Some(","), Some(1)).unwrap();
    assert_eq!(
        list.to_vec(),
        vec![
            Some(vec!["x".to_string(), "y".to_string()]),
            Some(vec!["z".to_string()]),
            None,
        ]
    );
}

#[test]
fn encode_assigns_sorted_codes() {
    let store = str_array(&[Some("b"), Some("a"), Some("b"), None, Some("a")]);
    let table = CategoryTable::from_store(&store).unwrap();
    assert_eq!(table.keys().to_vec(), owned(&[Some("a"), Some("b")]));
    assert_eq!(
        table.codes().iter().copied().collect::<Vec<_>>(),
        vec![1, 0, 1, NULL_CODE, 0]
    );
}

#[test]
fn replace_is_repeatable() {
    let store = str_array(&[Some("aaa"), None]);
    let first = replace(&store, "a", "b", None).unwrap();
    let second = replace(&store, "a", "b", None).unwrap();
    assert_eq!(first.to_vec(), owned(&[Some("bbb"), None]));
    assert_eq!(first.to_vec(), second.to_vec());

    let capped = replace(&store, "a", "b", Some(2)).unwrap();
    assert_eq!(capped.to_vec(), owned(&[Some("bba"), None]));

    let re = Regex::new("a").unwrap();
    let by_pattern = replace_re(&store, &re, "b", None).unwrap();
    assert_eq!(by_pattern.to_vec(), first.to_vec());
}

#[test]
fn nested_star_runs_in_linear_time() {
    init_logging();
    let text = "a".repeat(20_000);
    let store = str_array(&[Some(text.as_str()), Some("aaab")]);
    let re = Regex::new("(a*)*b").unwrap();
    let found = find_re(&store, &re);
    assert_eq!(found.get(0), Some(None));
    assert_eq!(found.get(1), Some(Some((0, 4))));
}

#[test]
fn sorting_places_nulls_first_by_default() {
    let store = str_array(&[Some("b"), None, Some("a"), None, Some("ab")]);
    let sorted = sort(&store, &ArgsortConfig::new()).unwrap();
    assert_eq!(
        sorted.to_vec(),
        owned(&[None, None, Some("a"), Some("ab"), Some("b")])
    );

    let config = ArgsortConfig::new().descending(true).nulls(NullOrder::Last);
    let sorted = sort(&store, &config).unwrap();
    assert_eq!(
        sorted.to_vec(),
        owned(&[Some("b"), Some("ab"), Some("a"), None, None])
    );
}

#[test]
fn views_share_the_input_buffer() {
    let store = str_array(&[Some("hello world"), Some("héllo"), None]);
    let sub = substring(&store, 1, Some(3));
    assert!(sub.shares_buffer_with(&store));
    assert_eq!(sub.to_vec(), owned(&[Some("ell"), Some("éll"), None]));

    let list = split(&store, Some(" "), None).unwrap();
    assert!(list.values.shares_buffer_with(&store));
}

#[test]
fn device_runs_passes_on_its_pool() {
    init_logging();
    let mut rng = seeded_rng(0xd0_0001);
    let (_, store) = random_column(&mut rng, 20_000, 0.05, &['a', 'ß', 'Z', ' '], 8);
    let inline = to_upper(&store).unwrap();

    let device = Device::new(EngineConfig::new().num_workers(2).thread_name("scenario")).unwrap();
    assert_eq!(device.config().thread_name, "scenario");
    let pooled = device.run(|| to_upper(&store)).unwrap();
    assert_eq!(pooled.to_vec(), inline.to_vec());
}

#[test]
fn apply_dispatches_through_the_registry() {
    init_logging();
    let registry = PatternRegistry::new();
    let swap = registry.register("(\\d+)-(\\d+)", RegexFlags::new()).unwrap();
    let store = str_array(&[Some("10-20"), Some("x"), None]);

    let out = apply(
        &store,
        &StringOp::ReplaceWithBackrefs {
            pattern: swap,
            template: "\\2-\\1".to_string(),
            max: None,
        },
        &registry,
    )
    .unwrap();
    assert_eq!(out.kind(), "store");
    assert_eq!(
        out.into_store().unwrap().to_vec(),
        owned(&[Some("20-10"), Some("x"), None])
    );

    let upper = apply(&store, &StringOp::Case(CaseMode::Upper), &registry)
        .unwrap()
        .into_store()
        .unwrap();
    assert_eq!(upper.to_vec(), owned(&[Some("10-20"), Some("X"), None]));

    match apply(&store, &StringOp::Encode, &registry).unwrap() {
        OpOutput::Category(table) => assert_eq!(table.key_count(), 2),
        other => panic!("unexpected output {}", other.kind()),
    }

    let matched = apply(&store, &StringOp::MatchRe(swap), &registry)
        .unwrap()
        .into_boolean()
        .unwrap();
    assert_eq!(matched.to_vec(), vec![Some(true), Some(false), None]);

    assert!(registry.release(swap));
    let err = apply(&store, &StringOp::FindRe(swap), &registry).unwrap_err();
    assert!(matches!(err, KernelError::InvalidArguments(_)));
}

#[test]
fn registry_is_shared_across_threads() {
    init_logging();
    let registry = PatternRegistry::new();
    let handles: Vec<_> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..4)
            .map(|_| s.spawn(|| registry.register("[a-z]+\\d", RegexFlags::new()).unwrap()))
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });
    assert!(handles.iter().all(|h| *h == handles[0]));
    assert_eq!(registry.len(), 1);

    let other = registry
        .register("[a-z]+\\d", RegexFlags::new().ignore_case(true))
        .unwrap();
    assert_ne!(other, handles[0]);
    assert_eq!(registry.len(), 2);
}

#[test]
fn malformed_pattern_reports_offset() {
    let registry = PatternRegistry::new();
    match registry.register("ab(c", RegexFlags::new()) {
        Err(KernelError::MalformedPattern { .. }) => {}
        other => panic!("unexpected {:?}", other),
    }
    assert!(registry.is_empty());
}

#[test]
fn unparsable_rows_become_null_without_failing_the_pass() {
    init_logging();
    let registry = PatternRegistry::new();
    let store = str_array(&[Some("1"), Some("x"), Some("99999999999999999999"), None, Some("-5")]);
    match apply(&store, &StringOp::ParseInt, &registry).unwrap() {
        OpOutput::Int64(col) => {
            assert_eq!(col.to_vec(), vec![Some(1), None, None, None, Some(-5)])
        }
        other => panic!("unexpected output {}", other.kind()),
    }
    match apply(&store, &StringOp::ParseFloat, &registry).unwrap() {
        OpOutput::Float64(col) => {
            assert_eq!(col.get(0), Some(1.0));
            assert_eq!(col.get(1), None);
            assert_eq!(col.get(3), None);
        }
        other => panic!("unexpected output {}", other.kind()),
    }
}

#[test]
fn stores_never_hold_invalid_utf8() {
    let err = CharacterStore::build(1, |_| Some(2), |_, out| {
        out[0] = 0xff;
        out[1] = 0xfe;
    })
    .unwrap_err();
    assert!(matches!(err, KernelError::InvalidArguments(_)));

    let store = str_array(&[Some("ok"), None, Some("fine")]);
    let err = store
        .transform(
            |v| v.as_str().map(str::len),
            |v, out| {
                out.copy_from_slice(v.as_bytes());
                out[0] = 0xc3;
            },
        )
        .unwrap_err();
    assert!(matches!(err, KernelError::InvalidArguments(_)));

    let copied = store
        .transform(|v| v.as_str().map(str::len), |v, out| out.copy_from_slice(v.as_bytes()))
        .unwrap();
    assert_eq!(copied.to_vec(), store.to_vec());
}

#[test]
fn removing_then_adding_a_used_key_restores_keys_but_not_codes() {
    let store = str_array(&[Some("x"), Some("y"), None, Some("x"), Some("z")]);
    let table = CategoryTable::from_store(&store).unwrap();
    let original: Vec<i32> = table.codes().iter().copied().collect();
    assert_eq!(original, vec![0, 1, NULL_CODE, 0, 2]);

    let removed = table.remove_keys(&str_array(&[Some("x")])).unwrap();
    assert_eq!(removed.null_count(), 3);
    let restored = removed.add_keys(&str_array(&[Some("x")])).unwrap();
    assert_eq!(restored.keys().to_vec(), table.keys().to_vec());
    assert_eq!(
        restored.codes().iter().copied().collect::<Vec<_>>(),
        vec![NULL_CODE, 1, NULL_CODE, NULL_CODE, 2]
    );
    assert_eq!(
        restored.to_strings().unwrap().to_vec(),
        owned(&[None, Some("y"), None, None, Some("z")])
    );
    restored.validate().unwrap();
}
