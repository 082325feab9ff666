// Property-based tests for keyed join and snapshot diff.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::{BTreeMap, HashSet};

use proptest::prelude::*;
use snapdiff_recon::diff::*;
use snapdiff_recon::join::{zip_by, KeyedPair};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Row {
    id: String,
    fields: BTreeMap<String, i64>,
}

fn arb_fields() -> impl Strategy<Value = BTreeMap<String, i64>> {
    proptest::collection::btree_map(r"[a-c]", -3i64..3, 0..3)
}

/// Which side(s) a key lands on.
#[derive(Debug, Clone, Copy, PartialEq)]
enum KeyCategory {
    Same,       // both sides, identical
    Changed,    // both sides, one field differs
    BeforeOnly,
    AfterOnly,
}

fn arb_category() -> impl Strategy<Value = KeyCategory> {
    prop_oneof![
        Just(KeyCategory::Same),
        Just(KeyCategory::Changed),
        Just(KeyCategory::BeforeOnly),
        Just(KeyCategory::AfterOnly),
    ]
}

/// Snapshots with unique keys plus the category each key was built with.
fn arb_snapshots(
    max_keys: usize,
) -> impl Strategy<Value = (Vec<Row>, Vec<Row>, Vec<(String, KeyCategory)>)> {
    proptest::collection::hash_set(r"[A-Za-z0-9]{1,8}", 0..=max_keys)
        .prop_flat_map(|keys| {
            let keys: Vec<String> = keys.into_iter().collect();
            let n = keys.len();
            (
                Just(keys),
                proptest::collection::vec(arb_category(), n),
                proptest::collection::vec(arb_fields(), n),
                any::<bool>(),
            )
        })
        .prop_map(|(keys, cats, fields, reverse_after)| {
            let mut before = Vec::new();
            let mut after = Vec::new();
            let mut categories = Vec::new();
            for ((key, cat), fields) in keys.into_iter().zip(cats).zip(fields) {
                let row = Row { id: key.clone(), fields };
                match cat {
                    KeyCategory::Same => {
                        before.push(row.clone());
                        after.push(row);
                    }
                    KeyCategory::Changed => {
                        let mut changed = row.clone();
                        *changed.fields.entry("z".into()).or_insert(0) += 1;
                        before.push(row);
                        after.push(changed);
                    }
                    KeyCategory::BeforeOnly => before.push(row),
                    KeyCategory::AfterOnly => after.push(row),
                }
                categories.push((key, cat));
            }
            if reverse_after {
                after.reverse();
            }
            (before, after, categories)
        })
}

fn id(row: &Row) -> String {
    row.id.clone()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn every_input_lands_in_exactly_one_sequence((before, after, cats) in arb_snapshots(16)) {
        let d = diff(before.clone(), after.clone(), id);

        let created: HashSet<String> = d.creates.iter().map(id).collect();
        let updated: HashSet<String> = d.updates.iter().map(|(b, _)| id(b)).collect();
        let deleted: HashSet<String> = d.deletes.iter().map(id).collect();

        prop_assert_eq!(created.len(), d.creates.len());
        prop_assert_eq!(updated.len(), d.updates.len());
        prop_assert_eq!(deleted.len(), d.deletes.len());
        prop_assert!(created.is_disjoint(&updated));
        prop_assert!(created.is_disjoint(&deleted));
        prop_assert!(updated.is_disjoint(&deleted));

        for (key, cat) in &cats {
            let expected = match cat {
                KeyCategory::Same => (false, false, false),
                KeyCategory::Changed => (false, true, false),
                KeyCategory::BeforeOnly => (false, false, true),
                KeyCategory::AfterOnly => (true, false, false),
            };
            let actual = (created.contains(key), updated.contains(key), deleted.contains(key));
            prop_assert_eq!(actual, expected, "key {:?} ({:?})", key, cat);
        }
    }

    #[test]
    fn update_pairs_are_before_then_after((before, after, _) in arb_snapshots(16)) {
        let d = diff(before.clone(), after.clone(), id);
        for (b, a) in &d.updates {
            prop_assert!(before.contains(b));
            prop_assert!(after.contains(a));
            prop_assert_eq!(&b.id, &a.id);
            prop_assert_ne!(b, a);
        }
    }

    #[test]
    fn identical_snapshots_diff_empty((before, _, _) in arb_snapshots(16)) {
        let d = diff(before.clone(), before, id);
        prop_assert!(d.is_empty());
    }

    #[test]
    fn disjoint_snapshots_are_all_creates_and_deletes(
        (before, _, _) in arb_snapshots(8),
        (after, _, _) in arb_snapshots(8),
    ) {
        let before: Vec<Row> = before.into_iter().map(|mut r| { r.id = format!("b-{}", r.id); r }).collect();
        let after: Vec<Row> = after.into_iter().map(|mut r| { r.id = format!("a-{}", r.id); r }).collect();
        let d = diff(before.clone(), after.clone(), id);
        prop_assert_eq!(d.creates, after);
        prop_assert_eq!(d.deletes, before);
        prop_assert!(d.updates.is_empty());
    }

    #[test]
    fn apply_reproduces_after_as_a_set((before, after, _) in arb_snapshots(16)) {
        let d = diff(before.clone(), after.clone(), id);
        let applied = d.apply(&before, id);

        let mut got: Vec<(String, Vec<(String, i64)>)> = applied
            .iter()
            .map(|r| (r.id.clone(), r.fields.clone().into_iter().collect()))
            .collect();
        let mut want: Vec<(String, Vec<(String, i64)>)> = after
            .iter()
            .map(|r| (r.id.clone(), r.fields.clone().into_iter().collect()))
            .collect();
        got.sort();
        want.sort();
        prop_assert_eq!(got, want);
    }

    #[test]
    fn invert_then_apply_restores_before((before, after, _) in arb_snapshots(16)) {
        let d = diff(before.clone(), after.clone(), id).invert();
        let mut restored = d.apply(&after, id);
        let mut want = before.clone();
        restored.sort_by(|a, b| a.id.cmp(&b.id));
        want.sort_by(|a, b| a.id.cmp(&b.id));
        prop_assert_eq!(restored, want);
    }

    #[test]
    fn zip_by_emits_one_pair_per_distinct_key(
        lefts in proptest::collection::vec(0u8..20, 0..30),
        rights in proptest::collection::vec(0u8..20, 0..30),
    ) {
        let pairs = zip_by(lefts.clone(), rights.clone(), |a| *a, |b| *b);
        let distinct: HashSet<u8> = lefts.iter().chain(rights.iter()).copied().collect();
        prop_assert_eq!(pairs.len(), distinct.len());

        // First-seen order across lefts then rights.
        let mut expected_order = Vec::new();
        let mut seen = HashSet::new();
        for k in lefts.iter().chain(rights.iter()) {
            if seen.insert(*k) {
                expected_order.push(*k);
            }
        }
        let order: Vec<u8> = pairs
            .iter()
            .map(|p| match p {
                KeyedPair::Left(a) | KeyedPair::Both(a, _) => *a,
                KeyedPair::Right(b) => *b,
            })
            .collect();
        prop_assert_eq!(order, expected_order);
    }
}
