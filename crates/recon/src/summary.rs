use serde::Serialize;

use crate::diff::Diff;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub before_rows: usize,
    pub after_rows: usize,
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
    /// Keys present on both sides with equal records.
    pub unchanged: usize,
    pub duplicate_keys: usize,
}

/// Count a finished diff.
///
/// `distinct_before` is the number of distinct keys in the before snapshot;
/// every such key is either updated, deleted, or unchanged.
pub fn compute_summary<T>(
    diff: &Diff<T>,
    before_rows: usize,
    after_rows: usize,
    distinct_before: usize,
    duplicate_keys: usize,
) -> DiffSummary {
    DiffSummary {
        before_rows,
        after_rows,
        creates: diff.creates.len(),
        updates: diff.updates.len(),
        deletes: diff.deletes.len(),
        unchanged: distinct_before.saturating_sub(diff.updates.len() + diff.deletes.len()),
        duplicate_keys,
    }
}
