// Keyed outer join of two collections.
// Pure functions: two collections in, aligned pairs out.

use std::collections::HashMap;
use std::convert::Infallible;
use std::hash::Hash;

// ---------------------------------------------------------------------------
// Pair
// ---------------------------------------------------------------------------

/// One row of a keyed join. At least one side is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyedPair<A, B> {
    Left(A),
    Right(B),
    Both(A, B),
}

impl<A, B> KeyedPair<A, B> {
    fn from_options(left: Option<A>, right: Option<B>) -> Option<Self> {
        match (left, right) {
            (Some(a), Some(b)) => Some(Self::Both(a, b)),
            (Some(a), None) => Some(Self::Left(a)),
            (None, Some(b)) => Some(Self::Right(b)),
            (None, None) => None,
        }
    }

    pub fn left(&self) -> Option<&A> {
        match self {
            Self::Left(a) | Self::Both(a, _) => Some(a),
            Self::Right(_) => None,
        }
    }

    pub fn right(&self) -> Option<&B> {
        match self {
            Self::Right(b) | Self::Both(_, b) => Some(b),
            Self::Left(_) => None,
        }
    }

    /// Split into the `(before, after)` option view.
    pub fn into_options(self) -> (Option<A>, Option<B>) {
        match self {
            Self::Left(a) => (Some(a), None),
            Self::Right(b) => (None, Some(b)),
            Self::Both(a, b) => (Some(a), Some(b)),
        }
    }
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Align `lefts` and `rights` on the keys produced by `key_a` / `key_b`.
///
/// One pair is emitted per distinct key, in the order keys were first seen
/// across `lefts` then `rights`. A key repeated within one collection keeps
/// its first position but the later element replaces the earlier one
/// (last write wins).
pub fn zip_by<A, B, K, FA, FB>(
    lefts: impl IntoIterator<Item = A>,
    rights: impl IntoIterator<Item = B>,
    key_a: FA,
    key_b: FB,
) -> Vec<KeyedPair<A, B>>
where
    K: Hash + Eq,
    FA: FnMut(&A) -> K,
    FB: FnMut(&B) -> K,
{
    zip_keyed(lefts, rights, key_a, key_b)
        .into_iter()
        .map(|(_, pair)| pair)
        .collect()
}

/// Like [`zip_by`], returning each pair together with its key.
pub fn zip_keyed<A, B, K, FA, FB>(
    lefts: impl IntoIterator<Item = A>,
    rights: impl IntoIterator<Item = B>,
    mut key_a: FA,
    mut key_b: FB,
) -> Vec<(K, KeyedPair<A, B>)>
where
    K: Hash + Eq,
    FA: FnMut(&A) -> K,
    FB: FnMut(&B) -> K,
{
    let joined = try_zip_keyed(
        lefts,
        rights,
        |a| Ok::<_, Infallible>(key_a(a)),
        |b| Ok::<_, Infallible>(key_b(b)),
    );
    match joined {
        Ok(pairs) => pairs,
        Err(never) => match never {},
    }
}

/// Fallible [`zip_by`]: the first key-function error aborts the join and
/// is returned unchanged.
pub fn try_zip_by<A, B, K, E, FA, FB>(
    lefts: impl IntoIterator<Item = A>,
    rights: impl IntoIterator<Item = B>,
    key_a: FA,
    key_b: FB,
) -> Result<Vec<KeyedPair<A, B>>, E>
where
    K: Hash + Eq,
    FA: FnMut(&A) -> Result<K, E>,
    FB: FnMut(&B) -> Result<K, E>,
{
    Ok(try_zip_keyed(lefts, rights, key_a, key_b)?
        .into_iter()
        .map(|(_, pair)| pair)
        .collect())
}

fn try_zip_keyed<A, B, K, E, FA, FB>(
    lefts: impl IntoIterator<Item = A>,
    rights: impl IntoIterator<Item = B>,
    mut key_a: FA,
    mut key_b: FB,
) -> Result<Vec<(K, KeyedPair<A, B>)>, E>
where
    K: Hash + Eq,
    FA: FnMut(&A) -> Result<K, E>,
    FB: FnMut(&B) -> Result<K, E>,
{
    // Slot order is the union of keys in first-seen order.
    let mut slot_of: HashMap<K, usize> = HashMap::new();
    let mut keys: Vec<Option<K>> = Vec::new();
    let mut slots: Vec<(Option<A>, Option<B>)> = Vec::new();

    for a in lefts {
        let key = key_a(&a)?;
        match slot_of.get(&key) {
            Some(&i) => slots[i].0 = Some(a),
            None => {
                slot_of.insert(key, slots.len());
                keys.push(None);
                slots.push((Some(a), None));
            }
        }
    }

    for b in rights {
        let key = key_b(&b)?;
        match slot_of.get(&key) {
            Some(&i) => slots[i].1 = Some(b),
            None => {
                slot_of.insert(key, slots.len());
                keys.push(None);
                slots.push((None, Some(b)));
            }
        }
    }

    // Move the keys out of the lookup into their slots.
    for (key, i) in slot_of {
        keys[i] = Some(key);
    }

    Ok(keys
        .into_iter()
        .zip(slots)
        .filter_map(|(key, (a, b))| Some((key?, KeyedPair::from_options(a, b)?)))
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
