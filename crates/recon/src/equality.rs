use serde::Serialize;
use serde_json::{Number, Value};

/// One field that differs between two records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    /// Dotted path from the record root (`address.city`).
    pub path: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

/// Structural equality on JSON values.
///
/// Object key order never matters. Numbers compare by value, so `1` and
/// `1.0` are equal.
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => number_eq(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, x)| ym.get(k).is_some_and(|y| json_eq(x, y)))
        }
        _ => false,
    }
}

/// [`json_eq`], skipping the named top-level fields when both sides are
/// objects.
pub fn json_eq_ignoring(a: &Value, b: &Value, ignore: &[String]) -> bool {
    if ignore.is_empty() {
        return json_eq(a, b);
    }
    match (a, b) {
        (Value::Object(xm), Value::Object(ym)) => {
            let kept = |k: &String| !ignore.iter().any(|i| i == k);
            let xs = xm.iter().filter(|(k, _)| kept(*k));
            let y_count = ym.keys().filter(|k| kept(*k)).count();
            let mut x_count = 0;
            for (k, x) in xs {
                x_count += 1;
                match ym.get(k) {
                    Some(y) if json_eq(x, y) => {}
                    _ => return false,
                }
            }
            x_count == y_count
        }
        _ => json_eq(a, b),
    }
}

/// Integers compare exactly, also against an integral float, so
/// `9007199254740993` and `9007199254740992.0` differ. Two non-integral
/// floats compare as `f64`.
fn number_eq(x: &Number, y: &Number) -> bool {
    match (integral(x), integral(y)) {
        (Some(a), Some(b)) => a == b,
        (None, None) => x.as_f64() == y.as_f64(),
        _ => false,
    }
}

// Floats beyond the u64 range cannot equal any JSON integer.
const INTEGRAL_FLOAT_LIMIT: f64 = 18_446_744_073_709_551_616.0;

/// The exact integer value of `n`, if it has one.
pub(crate) fn integral(n: &Number) -> Option<i128> {
    if let Some(i) = n.as_i64() {
        return Some(i128::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(i128::from(u));
    }
    let f = n.as_f64()?;
    (f.fract() == 0.0 && f.abs() <= INTEGRAL_FLOAT_LIMIT).then_some(f as i128)
}

/// List the fields that differ between `before` and `after`, sorted by
/// path.
///
/// Nested objects are walked; arrays and scalars are compared whole.
/// Top-level fields in `ignore` are skipped.
pub fn changed_fields(before: &Value, after: &Value, ignore: &[String]) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    match (before, after) {
        (Value::Object(_), Value::Object(_)) => {
            walk("", before, after, ignore, &mut changes);
        }
        _ => {
            if !json_eq(before, after) {
                changes.push(FieldChange {
                    path: String::new(),
                    before: Some(before.clone()),
                    after: Some(after.clone()),
                });
            }
        }
    }
    changes.sort_by(|a, b| a.path.cmp(&b.path));
    changes
}

fn walk(prefix: &str, before: &Value, after: &Value, ignore: &[String], out: &mut Vec<FieldChange>) {
    let (Value::Object(bm), Value::Object(am)) = (before, after) else {
        if !json_eq(before, after) {
            out.push(FieldChange {
                path: prefix.to_string(),
                before: Some(before.clone()),
                after: Some(after.clone()),
            });
        }
        return;
    };

    let top_level = prefix.is_empty();
    let skip = |k: &str| top_level && ignore.iter().any(|i| i == k);
    let path_of = |k: &str| {
        if top_level {
            k.to_string()
        } else {
            format!("{prefix}.{k}")
        }
    };

    for (k, b) in bm {
        if skip(k.as_str()) {
            continue;
        }
        match am.get(k) {
            Some(a) => walk(&path_of(k.as_str()), b, a, &[], out),
            None => out.push(FieldChange {
                path: path_of(k.as_str()),
                before: Some(b.clone()),
                after: None,
            }),
        }
    }
    for (k, a) in am {
        if skip(k.as_str()) || bm.contains_key(k) {
            continue;
        }
        out.push(FieldChange {
            path: path_of(k.as_str()),
            before: None,
            after: Some(a.clone()),
        });
    }
}
