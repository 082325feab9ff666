use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

use crate::config::{DuplicatePolicy, ReconConfig};
use crate::diff::{diff_by, Diff};
use crate::equality::{changed_fields, integral, json_eq_ignoring, FieldChange};
use crate::error::{DuplicateKey, ReconError, Side};
use crate::summary::{compute_summary, DiffSummary};

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub summary: DiffSummary,
    pub diff: Diff<Value>,
    /// Field-level changes, one entry per `diff.updates` pair, same order.
    pub updates_detail: Vec<UpdateDetail>,
    pub duplicate_keys: Vec<DuplicateKey>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub key: Vec<String>,
    pub on_duplicate: DuplicatePolicy,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateDetail {
    pub key: String,
    pub changes: Vec<FieldChange>,
}

/// A record paired with its extracted key.
pub type KeyedRecord = (String, Value);

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Reconcile two record snapshots per config.
pub fn run(config: &ReconConfig, before: Vec<Value>, after: Vec<Value>) -> Result<ReconReport, ReconError> {
    config.validate()?;

    let before_rows = before.len();
    let after_rows = after.len();

    let before_keyed = keyed_entities(Side::Before, before, &config.key)?;
    let after_keyed = keyed_entities(Side::After, after, &config.key)?;

    let mut duplicate_keys = find_duplicates(Side::Before, &before_keyed);
    duplicate_keys.extend(find_duplicates(Side::After, &after_keyed));
    if !duplicate_keys.is_empty() {
        match config.on_duplicate {
            DuplicatePolicy::Error => return Err(ReconError::DuplicateKeys(duplicate_keys)),
            DuplicatePolicy::LastWriteWins => {
                warn!(
                    "{} duplicated key(s); keeping the last record for each",
                    duplicate_keys.len()
                );
            }
        }
    }

    let distinct_before = before_keyed
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<HashSet<_>>()
        .len();

    let keyed = diff_by(
        before_keyed,
        after_keyed,
        |(k, _)| k.clone(),
        |(_, b), (_, a)| json_eq_ignoring(b, a, &config.ignore),
    );

    let updates_detail = keyed
        .updates
        .iter()
        .map(|((key, b), (_, a))| UpdateDetail {
            key: key.clone(),
            changes: changed_fields(b, a, &config.ignore),
        })
        .collect();

    let diff = keyed.map(|(_, record)| record);
    let summary = compute_summary(&diff, before_rows, after_rows, distinct_before, duplicate_keys.len());

    debug!(
        "{}: {} before / {} after -> {} create(s), {} update(s), {} delete(s), {} unchanged",
        config.name,
        summary.before_rows,
        summary.after_rows,
        summary.creates,
        summary.updates,
        summary.deletes,
        summary.unchanged
    );

    Ok(ReconReport {
        meta: ReconMeta {
            config_name: config.name.clone(),
            key: config.key.clone(),
            on_duplicate: config.on_duplicate,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        diff,
        updates_detail,
        duplicate_keys,
    })
}

/// Re-apply `diff` on top of `before`, keying every record by `config.key`.
pub fn apply_records(config: &ReconConfig, before: Vec<Value>, diff: Diff<Value>) -> Result<Vec<Value>, ReconError> {
    config.validate()?;

    let before_keyed = keyed_entities(Side::Before, before, &config.key)?;
    let keyed_diff = Diff {
        creates: keyed_entities(Side::After, diff.creates, &config.key)?,
        updates: diff
            .updates
            .into_iter()
            .enumerate()
            .map(|(i, (b, a))| -> Result<(KeyedRecord, KeyedRecord), ReconError> {
                Ok((
                    (record_key(Side::Before, i, &b, &config.key)?, b),
                    (record_key(Side::After, i, &a, &config.key)?, a),
                ))
            })
            .collect::<Result<Vec<_>, _>>()?,
        deletes: keyed_entities(Side::Before, diff.deletes, &config.key)?,
    };

    let (missing_updates, present_creates) = stale_entries(&before_keyed, &keyed_diff);
    for key in &missing_updates {
        warn!("update for key {key:?} has no record to replace; skipped");
    }
    for key in &present_creates {
        warn!("create for key {key:?} already has a record; both are kept");
    }

    let applied = keyed_diff.apply(&before_keyed, |(k, _)| k.clone());
    debug!("applied {} change(s) to {} record(s)", keyed_diff.len(), before_keyed.len());
    Ok(applied.into_iter().map(|(_, record)| record).collect())
}

/// Keys of updates with no record in `before`, and of creates that already
/// have one. Both happen when a diff is applied to a different snapshot.
fn stale_entries<'a>(before: &[KeyedRecord], diff: &'a Diff<KeyedRecord>) -> (Vec<&'a str>, Vec<&'a str>) {
    let present: HashSet<&str> = before.iter().map(|(k, _)| k.as_str()).collect();
    let missing_updates = diff
        .updates
        .iter()
        .map(|((k, _), _)| k.as_str())
        .filter(|k| !present.contains(*k))
        .collect();
    let present_creates = diff
        .creates
        .iter()
        .map(|(k, _)| k.as_str())
        .filter(|k| present.contains(*k))
        .collect();
    (missing_updates, present_creates)
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Pair every record with its key. Fails on the first record without one.
pub fn keyed_entities(side: Side, records: Vec<Value>, fields: &[String]) -> Result<Vec<KeyedRecord>, ReconError> {
    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| -> Result<KeyedRecord, ReconError> {
            let key = record_key(side, i, &record, fields)?;
            Ok((key, record))
        })
        .collect()
}

/// Extract the identity of one record.
///
/// A single string field is used as-is, any other scalar by its JSON text.
/// Composite keys are the JSON text of the array of field values. Numbers
/// are written in canonical form first, so `1` and `1.0` name the same
/// record. Missing and null fields have no identity.
pub fn record_key(side: Side, index: usize, record: &Value, fields: &[String]) -> Result<String, ReconError> {
    let lookup = |field: &String| match record.get(field.as_str()) {
        Some(Value::Null) | None => Err(ReconError::MissingKey {
            side,
            index,
            field: field.clone(),
        }),
        Some(value) => Ok(value),
    };

    match fields {
        [field] => Ok(match lookup(field)? {
            Value::String(s) => s.clone(),
            other => canonical_key_part(other).to_string(),
        }),
        _ => {
            let parts = fields
                .iter()
                .map(|f| lookup(f).map(canonical_key_part))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(parts).to_string())
        }
    }
}

/// Integral floats become integers; everything else is kept.
fn canonical_key_part(value: &Value) -> Value {
    let Value::Number(n) = value else {
        return value.clone();
    };
    let Some(i) = integral(n) else {
        return value.clone();
    };
    i64::try_from(i)
        .map(Value::from)
        .or_else(|_| u64::try_from(i).map(Value::from))
        .unwrap_or_else(|_| value.clone())
}

fn find_duplicates(side: Side, keyed: &[KeyedRecord]) -> Vec<DuplicateKey> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for (key, _) in keyed {
        let count = counts.entry(key.as_str()).or_insert(0);
        if *count == 0 {
            order.push(key.as_str());
        }
        *count += 1;
    }
    order
        .into_iter()
        .filter_map(|key| {
            let count = counts[key];
            (count > 1).then(|| DuplicateKey {
                side,
                key: key.to_string(),
                count,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
