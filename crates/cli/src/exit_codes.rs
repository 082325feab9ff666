//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | diff             | Snapshots differ                         |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | diff             | Reconciliation-specific codes            |
//! | 10-19   | apply            | Diff re-application codes                |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use snapdiff_recon::ReconError;

// =============================================================================
// Universal (0, 2)
// =============================================================================

/// Success - command completed, and for `diff`, the snapshots are equal.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Diff (1, 3-9)
// =============================================================================

/// Snapshots differ (at least one create, update or delete).
/// Like `diff(1)`, exit 1 means "inputs differ."
pub const EXIT_DIFF_CHANGES: u8 = 1;

/// Duplicate keys found while `on_duplicate = "error"`.
pub const EXIT_DIFF_DUPLICATE: u8 = 3;

/// Config file could not be parsed or failed validation.
pub const EXIT_DIFF_CONFIG: u8 = 4;

/// Parse error reading a snapshot.
pub const EXIT_DIFF_PARSE: u8 = 5;

/// A record has no value for a key field.
pub const EXIT_DIFF_MISSING_KEY: u8 = 6;

/// Cannot read an input or write the output.
pub const EXIT_IO: u8 = 7;

// =============================================================================
// Apply (10-19)
// =============================================================================

/// The diff file is not a diff (nor a `snapdiff diff` JSON report).
pub const EXIT_APPLY_BAD_DIFF: u8 = 10;

// =============================================================================
// Engine errors
// =============================================================================

/// Map a ReconError to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_DIFF_CONFIG,
        ReconError::SnapshotParse { .. } => EXIT_DIFF_PARSE,
        ReconError::MissingKey { .. } => EXIT_DIFF_MISSING_KEY,
        ReconError::DuplicateKeys(_) => EXIT_DIFF_DUPLICATE,
    }
}
