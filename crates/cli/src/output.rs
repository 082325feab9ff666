// Output formatting for `snapdiff diff`.
// Report in, bytes out. No IO.

use serde_json::{Map, Value};
use snapdiff_recon::engine::{record_key, ReconReport};
use snapdiff_recon::Side;

use crate::CliError;

pub const DIFF_CONTRACT_VERSION: u32 = 1;

/// Pretty JSON report with `contract_version` as the first field.
pub fn format_report_json(report: &ReconReport) -> Result<Vec<u8>, CliError> {
    let body = serde_json::to_value(report).map_err(|e| CliError::io(e.to_string()))?;

    let mut top = Map::new();
    top.insert("contract_version".to_string(), Value::from(DIFF_CONTRACT_VERSION));
    if let Value::Object(fields) = body {
        top.extend(fields);
    }

    let mut bytes = serde_json::to_vec_pretty(&Value::Object(top)).map_err(|e| CliError::io(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Line-oriented report: `+ key` for creates, `~ key` with one indented
/// line per changed field for updates, `- key` for deletes.
pub fn format_report_text(report: &ReconReport) -> Vec<u8> {
    let fields = &report.meta.key;
    let key_of = |side: Side, i: usize, record: &Value| {
        record_key(side, i, record, fields).unwrap_or_else(|_| "?".to_string())
    };

    let mut out = String::new();
    for (i, record) in report.diff.creates.iter().enumerate() {
        out.push_str(&format!("+ {}\n", key_of(Side::After, i, record)));
    }
    for detail in &report.updates_detail {
        out.push_str(&format!("~ {}\n", detail.key));
        for change in &detail.changes {
            out.push_str(&format!(
                "    {}: {} -> {}\n",
                if change.path.is_empty() { "." } else { change.path.as_str() },
                show(change.before.as_ref()),
                show(change.after.as_ref()),
            ));
        }
    }
    for (i, record) in report.diff.deletes.iter().enumerate() {
        out.push_str(&format!("- {}\n", key_of(Side::Before, i, record)));
    }
    out.into_bytes()
}

fn show(value: Option<&Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "(absent)".to_string(),
    }
}

/// Counts printed to stderr by `--summary stderr`.
pub fn summary_lines(report: &ReconReport, before_label: &str, after_label: &str) -> Vec<String> {
    let s = &report.summary;
    let mut lines = vec![
        format!("before: {} rows ({})", s.before_rows, before_label),
        format!("after:  {} rows ({})", s.after_rows, after_label),
        format!("creates: {}", s.creates),
        format!("updates: {}", s.updates),
        format!("deletes: {}", s.deletes),
        format!("unchanged: {}", s.unchanged),
    ];
    if s.duplicate_keys > 0 {
        lines.push(format!("duplicate_keys: {}", s.duplicate_keys));
    }
    lines
}
