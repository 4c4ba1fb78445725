//! Error types for the merge engine.

use crate::{GameCode, MatchKey, RecordId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which apply batch a store failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchKind {
    Upsert,
    Delete,
}

impl std::fmt::Display for BatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchKind::Upsert => write!(f, "upsert"),
            BatchKind::Delete => write!(f, "delete"),
        }
    }
}

/// Errors reported by [`RecordStore`](crate::RecordStore) implementations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(RecordId),

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// All possible errors from the merge engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Snapshot validation
    #[error("schema mismatch: expected game year {expected}, got {actual}")]
    SchemaMismatch { expected: GameCode, actual: GameCode },

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("duplicate business key in snapshot: {0}")]
    DuplicateKey(MatchKey),

    // Resolution errors
    #[error("unresolved merge items: {}", format_keys(.keys))]
    UnresolvedMerge { keys: Vec<MatchKey> },

    #[error("contradictory resolution for {key}: {reason}")]
    ContradictoryResolution { key: MatchKey, reason: String },

    #[error("record key {actual} does not match merge item {expected}")]
    KeyMismatch { expected: MatchKey, actual: MatchKey },

    #[error("merge item {0} cannot take that resolution")]
    NotMergeable(MatchKey),

    // Registry
    #[error("no game registered for code {0}")]
    UnknownGame(GameCode),

    // Store errors
    #[error(
        "{batch} batch failed for {} record(s){}: {message}",
        .keys.len(),
        partial_note(.partially_applied)
    )]
    StoreIo {
        batch: BatchKind,
        keys: Vec<MatchKey>,
        partially_applied: bool,
        message: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn format_keys(keys: &[MatchKey]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn partial_note(partially_applied: &bool) -> &'static str {
    if *partially_applied {
        " (merge partially applied)"
    } else {
        ""
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
