//! Fatal error taxonomy for the extraction engine.
//!
//! Only structural, snapshot-level failures surface as errors. Per-record
//! problems (a malformed value shape, a store no marker matches) are skipped,
//! counted into [`crate::models::ExtractStats`], and logged; one bad record
//! must never abort extraction of the rest of the snapshot.

use std::path::PathBuf;

use thiserror::Error;

/// Errors an extraction pass can fail with.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The collaborator could not provide a readable snapshot. No partial
    /// result is returned.
    #[error("snapshot unavailable at {path}: {reason}")]
    SnapshotUnavailable { path: PathBuf, reason: String },

    /// The record source failed while iterating a store pattern.
    #[error("record source failed for pattern '{pattern}': {reason}")]
    Source { pattern: String, reason: String },

    /// The resolution tie-break chain compared two distinct candidates as
    /// equal. The ordering is a strict total order, so this is an internal
    /// defect and is reported rather than swallowed.
    #[error("ambiguous resolution for logical id '{id}'")]
    AmbiguousResolution { id: String },
}

impl ExtractError {
    pub fn snapshot(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        ExtractError::SnapshotUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn source(pattern: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ExtractError::Source {
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }
}
