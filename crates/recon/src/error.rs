use std::fmt;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// Which snapshot a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Before,
    After,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Before => "before",
            Side::After => "after",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key that occurs more than once within one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DuplicateKey {
    pub side: Side,
    pub key: String,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty key, ignored key field, etc.).
    ConfigValidation(String),
    /// Snapshot text could not be parsed into records.
    SnapshotParse { side: Side, message: String },
    /// A record has no usable value for a key field.
    MissingKey { side: Side, index: usize, field: String },
    /// Duplicate keys found while `on_duplicate = "error"`.
    DuplicateKeys(Vec<DuplicateKey>),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::SnapshotParse { side, message } => {
                write!(f, "{side} snapshot: {message}")
            }
            Self::MissingKey { side, index, field } => {
                write!(f, "{side} record #{index}: missing key field '{field}'")
            }
            Self::DuplicateKeys(dups) => {
                write!(f, "duplicate keys found:")?;
                for dup in dups {
                    write!(f, "\n  {} key {:?} appears {} times", dup.side, dup.key, dup.count)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ReconError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_keys_message_lists_every_key() {
        let err = ReconError::DuplicateKeys(vec![
            DuplicateKey { side: Side::Before, key: "1".into(), count: 2 },
            DuplicateKey { side: Side::After, key: "7".into(), count: 3 },
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("duplicate keys found:"));
        assert!(msg.contains("before key \"1\" appears 2 times"));
        assert!(msg.contains("after key \"7\" appears 3 times"));
    }

    #[test]
    fn missing_key_names_side_and_field() {
        let err = ReconError::MissingKey { side: Side::After, index: 4, field: "sku".into() };
        assert_eq!(err.to_string(), "after record #4: missing key field 'sku'");
    }
}
