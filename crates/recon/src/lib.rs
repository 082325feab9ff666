//! `snapdiff-recon`: keyed snapshot reconciliation engine.
//!
//! Pure engine crate: receives two snapshots, returns the creates, updates
//! and deletes between them. No CLI or IO dependencies.

pub mod config;
pub mod diff;
pub mod engine;
pub mod equality;
pub mod error;
pub mod join;
pub mod snapshot;
pub mod summary;

pub use config::{DuplicatePolicy, ReconConfig};
pub use diff::{diff, diff_by, try_diff, Diff};
pub use engine::{apply_records, run, ReconReport};
pub use error::{DuplicateKey, ReconError, Side};
pub use join::{try_zip_by, zip_by, zip_keyed, KeyedPair};
pub use snapshot::{parse_snapshot, SnapshotFormat};
pub use summary::DiffSummary;
