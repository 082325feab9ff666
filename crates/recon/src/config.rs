use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Top-level fields whose values form the record identity.
    pub key: Vec<String>,
    /// Top-level fields left out of the equality check.
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,
}

fn default_name() -> String {
    "snapdiff".to_string()
}

// ---------------------------------------------------------------------------
// Duplicate policy
// ---------------------------------------------------------------------------

/// What to do when a key occurs more than once within one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the last record for the key, at the key's first position.
    #[default]
    LastWriteWins,
    /// Fail the run and report every duplicated key.
    Error,
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastWriteWins => write!(f, "last_write_wins"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    /// Config keyed by `key` with every other setting at its default.
    pub fn new(key: Vec<String>) -> Self {
        Self {
            name: default_name(),
            key,
            ignore: Vec::new(),
            on_duplicate: DuplicatePolicy::default(),
        }
    }

    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.key.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one key field is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for field in &self.key {
            if field.trim().is_empty() {
                return Err(ReconError::ConfigValidation("key field names must not be empty".into()));
            }
            if !seen.insert(field.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "key field '{field}' listed more than once"
                )));
            }
        }

        for field in &self.ignore {
            if field.trim().is_empty() {
                return Err(ReconError::ConfigValidation("ignored field names must not be empty".into()));
            }
            if seen.contains(field.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "field '{field}' cannot be both a key and ignored"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
