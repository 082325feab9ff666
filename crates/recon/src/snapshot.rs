use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{ReconError, Side};

/// Text encoding of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// A single JSON array of objects.
    Json,
    /// One JSON object per line.
    Jsonl,
    /// Header row plus records; every field is a string.
    Csv,
}

impl SnapshotFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Jsonl => "jsonl",
            Self::Csv => "csv",
        }
    }

    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "ndjson" => Some(Self::Jsonl),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Parse snapshot text into records. Every record is a JSON object.
pub fn parse_snapshot(side: Side, data: &str, format: SnapshotFormat) -> Result<Vec<Value>, ReconError> {
    let parse_err = |message: String| ReconError::SnapshotParse { side, message };

    match format {
        SnapshotFormat::Json => {
            let value: Value = serde_json::from_str(data).map_err(|e| parse_err(e.to_string()))?;
            let Value::Array(items) = value else {
                return Err(parse_err("expected a JSON array of objects".into()));
            };
            for (i, item) in items.iter().enumerate() {
                if !item.is_object() {
                    return Err(parse_err(format!("element {i} is not an object")));
                }
            }
            Ok(items)
        }
        SnapshotFormat::Jsonl => {
            let mut records = Vec::new();
            for (i, line) in data.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let value: Value = serde_json::from_str(line)
                    .map_err(|e| parse_err(format!("line {}: {e}", i + 1)))?;
                if !value.is_object() {
                    return Err(parse_err(format!("line {}: not an object", i + 1)));
                }
                records.push(value);
            }
            Ok(records)
        }
        SnapshotFormat::Csv => {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .from_reader(data.as_bytes());

            let headers: Vec<String> = reader
                .headers()
                .map_err(|e| parse_err(e.to_string()))?
                .iter()
                .map(|h| h.to_string())
                .collect();

            let mut records = Vec::new();
            for record in reader.records() {
                let record = record.map_err(|e| parse_err(e.to_string()))?;
                let mut obj = Map::new();
                for (i, header) in headers.iter().enumerate() {
                    let cell = record.get(i).unwrap_or("");
                    obj.insert(header.clone(), Value::String(cell.to_string()));
                }
                records.push(Value::Object(obj));
            }
            Ok(records)
        }
    }
}
