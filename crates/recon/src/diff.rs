// Snapshot reconciliation: classify keyed pairs into creates, updates, deletes.
// Pure functions: two snapshots in, a fresh Diff out.

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::join::{try_zip_by, KeyedPair};

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Changes that turn a "before" snapshot into an "after" snapshot.
///
/// Each input entity lands in at most one sequence: `creates` holds
/// after-only entities, `updates` holds `(before, after)` pairs that differ,
/// `deletes` holds before-only entities. Unchanged entities appear nowhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff<T> {
    pub creates: Vec<T>,
    pub updates: Vec<(T, T)>,
    pub deletes: Vec<T>,
}

impl<T> Default for Diff<T> {
    fn default() -> Self {
        Self {
            creates: Vec::new(),
            updates: Vec::new(),
            deletes: Vec::new(),
        }
    }
}

impl<T> Diff<T> {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Total number of changes across all three sequences.
    pub fn len(&self) -> usize {
        self.creates.len() + self.updates.len() + self.deletes.len()
    }

    /// The diff that turns "after" back into "before".
    pub fn invert(self) -> Diff<T> {
        Diff {
            creates: self.deletes,
            updates: self.updates.into_iter().map(|(b, a)| (a, b)).collect(),
            deletes: self.creates,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Diff<U> {
        Diff {
            creates: self.creates.into_iter().map(&mut f).collect(),
            updates: self.updates.into_iter().map(|(b, a)| (f(b), f(a))).collect(),
            deletes: self.deletes.into_iter().map(&mut f).collect(),
        }
    }

    /// Re-apply this diff on top of `before`.
    ///
    /// `before` keeps its order; deleted keys are dropped, updated keys take
    /// the after-side value, and creates are appended. Entities are matched
    /// by `key`, so `before` need not be the exact snapshot the diff came
    /// from. On a different snapshot an update whose key is absent is
    /// skipped, and a create whose key is already present is appended
    /// alongside the existing entity.
    pub fn apply<K, F>(&self, before: &[T], key: F) -> Vec<T>
    where
        T: Clone,
        K: Hash + Eq,
        F: Fn(&T) -> K,
    {
        let deleted: HashSet<K> = self.deletes.iter().map(&key).collect();
        let replaced: HashMap<K, &T> = self.updates.iter().map(|(_, a)| (key(a), a)).collect();

        let mut out: Vec<T> = before
            .iter()
            .filter(|entity| !deleted.contains(&key(*entity)))
            .map(|entity| match replaced.get(&key(entity)) {
                Some(after) => (*after).clone(),
                None => entity.clone(),
            })
            .collect();
        out.extend(self.creates.iter().cloned());
        out
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Diff two snapshots keyed by `key`, comparing paired entities with `==`.
pub fn diff<T, K, F>(
    before: impl IntoIterator<Item = T>,
    after: impl IntoIterator<Item = T>,
    key: F,
) -> Diff<T>
where
    T: PartialEq,
    K: Hash + Eq,
    F: Fn(&T) -> K,
{
    diff_by(before, after, key, |b, a| b == a)
}

/// Like [`diff`], with a caller-supplied equality for paired entities.
pub fn diff_by<T, K, F, E>(
    before: impl IntoIterator<Item = T>,
    after: impl IntoIterator<Item = T>,
    key: F,
    eq: E,
) -> Diff<T>
where
    K: Hash + Eq,
    F: Fn(&T) -> K,
    E: FnMut(&T, &T) -> bool,
{
    let outcome = try_diff_by(
        before,
        after,
        |entity| Ok::<_, Infallible>(key(entity)),
        eq,
    );
    match outcome {
        Ok(diff) => diff,
        Err(never) => match never {},
    }
}

/// Fallible [`diff`]: a key-function error aborts the whole call and is
/// returned unchanged. No partial result is produced.
pub fn try_diff<T, K, F, Er>(
    before: impl IntoIterator<Item = T>,
    after: impl IntoIterator<Item = T>,
    key: F,
) -> Result<Diff<T>, Er>
where
    T: PartialEq,
    K: Hash + Eq,
    F: Fn(&T) -> Result<K, Er>,
{
    try_diff_by(before, after, key, |b, a| b == a)
}

fn try_diff_by<T, K, F, E, Er>(
    before: impl IntoIterator<Item = T>,
    after: impl IntoIterator<Item = T>,
    key: F,
    mut eq: E,
) -> Result<Diff<T>, Er>
where
    K: Hash + Eq,
    F: Fn(&T) -> Result<K, Er>,
    E: FnMut(&T, &T) -> bool,
{
    let pairs = try_zip_by(before, after, &key, &key)?;
    Ok(classify(pairs, &mut eq))
}

/// Sort keyed pairs into the three sequences, keeping pair order.
fn classify<T, E>(pairs: Vec<KeyedPair<T, T>>, eq: &mut E) -> Diff<T>
where
    E: FnMut(&T, &T) -> bool,
{
    let mut result = Diff::default();
    for pair in pairs {
        match pair {
            KeyedPair::Right(a) => result.creates.push(a),
            KeyedPair::Both(b, a) => {
                if !eq(&b, &a) {
                    result.updates.push((b, a));
                }
            }
            KeyedPair::Left(b) => result.deletes.push(b),
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq)]
    struct Entity {
        id: u32,
        foo: Option<&'static str>,
    }

    fn e(id: u32, foo: &'static str) -> Entity {
        Entity { id, foo: Some(foo) }
    }

    fn bare(id: u32) -> Entity {
        Entity { id, foo: None }
    }

    #[test]
    fn create_and_update_from_mixed_snapshots() {
        let before = vec![e(1, "a")];
        let after = vec![e(1, "b"), e(2, "c")];
        let d = diff(before, after, |x| x.id);
        assert_eq!(d.creates, vec![e(2, "c")]);
        assert_eq!(d.updates, vec![(e(1, "a"), e(1, "b"))]);
        assert!(d.deletes.is_empty());
    }

    #[test]
    fn empty_after_deletes_everything() {
        let d = diff(vec![bare(1), bare(2)], Vec::new(), |x| x.id);
        assert!(d.creates.is_empty());
        assert!(d.updates.is_empty());
        assert_eq!(d.deletes, vec![bare(1), bare(2)]);
    }

    #[test]
    fn identical_snapshots_produce_empty_diff() {
        let snap = vec![e(1, "a"), e(2, "b"), bare(3)];
        let d = diff(snap.clone(), snap, |x| x.id);
        assert!(d.is_empty());
        assert_eq!(d.len(), 0);
    }

    #[test]
    fn empty_inputs_produce_empty_diff() {
        let d = diff(Vec::<Entity>::new(), Vec::new(), |x| x.id);
        assert_eq!(d, Diff::default());
    }

    #[test]
    fn unchanged_entity_is_omitted_among_changes() {
        let before = vec![e(1, "same"), e(2, "old"), e(3, "gone")];
        let after = vec![e(1, "same"), e(2, "new"), e(4, "fresh")];
        let d = diff(before, after, |x| x.id);
        assert_eq!(d.creates, vec![e(4, "fresh")]);
        assert_eq!(d.updates, vec![(e(2, "old"), e(2, "new"))]);
        assert_eq!(d.deletes, vec![e(3, "gone")]);
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn outputs_follow_union_key_order() {
        let before = vec![e(5, "x"), e(1, "x"), e(3, "x")];
        let after = vec![e(9, "y"), e(3, "y"), e(7, "y"), e(1, "y")];
        let d = diff(before, after, |x| x.id);
        let created: Vec<u32> = d.creates.iter().map(|x| x.id).collect();
        let updated: Vec<u32> = d.updates.iter().map(|(b, _)| b.id).collect();
        let deleted: Vec<u32> = d.deletes.iter().map(|x| x.id).collect();
        assert_eq!(created, vec![9, 7]);
        assert_eq!(updated, vec![1, 3]);
        assert_eq!(deleted, vec![5]);
    }

    #[test]
    fn map_valued_entities_compare_structurally() {
        let mut left = BTreeMap::new();
        left.insert("id", "1");
        left.insert("foo", "a");
        let mut right = BTreeMap::new();
        right.insert("foo", "a");
        right.insert("id", "1");
        let d = diff(vec![left], vec![right], |m| m["id"]);
        assert!(d.is_empty());
    }

    #[test]
    fn diff_by_uses_custom_equality() {
        let before = vec![e(1, "A")];
        let after = vec![e(1, "a")];
        let d = diff_by(before, after, |x| x.id, |b, a| {
            b.foo.map(str::to_lowercase) == a.foo.map(str::to_lowercase)
        });
        assert!(d.is_empty());
    }

    #[test]
    fn try_diff_propagates_key_error_untranslated() {
        #[derive(Debug, PartialEq)]
        struct NoKey(u32);

        let before = vec![bare(1), bare(0)];
        let after = vec![bare(2)];
        let result = try_diff(before, after, |x| if x.id == 0 { Err(NoKey(x.id)) } else { Ok(x.id) });
        assert_eq!(result.unwrap_err(), NoKey(0));
    }

    #[test]
    fn try_diff_succeeds_like_diff() {
        let result: Result<Diff<Entity>, String> =
            try_diff(vec![e(1, "a")], vec![e(1, "b")], |x| Ok(x.id));
        assert_eq!(result.unwrap().updates.len(), 1);
    }

    #[test]
    fn apply_reproduces_after() {
        let before = vec![e(1, "a"), e(2, "b"), e(3, "c")];
        let after = vec![e(2, "B"), e(3, "c"), e(4, "d")];
        let d = diff(before.clone(), after.clone(), |x| x.id);
        let applied = d.apply(&before, |x| x.id);
        assert_eq!(applied, after);
    }

    #[test]
    fn apply_on_a_different_snapshot_skips_orphan_updates() {
        let d = Diff {
            creates: vec![e(1, "new")],
            updates: vec![(e(9, "x"), e(9, "y"))],
            deletes: vec![e(7, "gone")],
        };
        let applied = d.apply(&[e(1, "old"), e(2, "kept")], |x| x.id);
        assert_eq!(applied, vec![e(1, "old"), e(2, "kept"), e(1, "new")]);
    }

    #[test]
    fn invert_swaps_direction() {
        let before = vec![e(1, "a"), e(2, "b")];
        let after = vec![e(2, "B"), e(3, "c")];
        let forward = diff(before.clone(), after.clone(), |x| x.id);
        let inverted = forward.invert();
        assert_eq!(inverted.creates, vec![e(1, "a")]);
        assert_eq!(inverted.updates, vec![(e(2, "B"), e(2, "b"))]);
        assert_eq!(inverted.deletes, vec![e(3, "c")]);

        let mut restored = inverted.apply(&after, |x| x.id);
        restored.sort_by_key(|x| x.id);
        assert_eq!(restored, before);
    }

    #[test]
    fn map_keeps_structure() {
        let d = diff(vec![e(1, "a"), e(2, "b")], vec![e(1, "z")], |x| x.id);
        let ids = d.map(|x| x.id);
        assert_eq!(ids.updates, vec![(1, 1)]);
        assert_eq!(ids.deletes, vec![2]);
        assert!(ids.creates.is_empty());
    }

    #[test]
    fn diff_serializes_with_named_sequences() {
        let d = diff(vec![1u8], vec![2u8], |x| *x);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json, serde_json::json!({ "creates": [2], "updates": [], "deletes": [1] }));
        let back: Diff<u8> = serde_json::from_value(json).unwrap();
        assert_eq!(back, d);
    }
}
