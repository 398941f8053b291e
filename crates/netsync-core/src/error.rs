// ── Core error types ──
//
// Errors surfaced by the reconciliation core. Destination-client failures
// arrive as `DestinationError` and are wrapped with the kind and natural key
// of the object being written, so a failed device sync names what broke.

use thiserror::Error;

use crate::model::{ObjectKind, RemoteId};

/// Failure reported by a destination inventory client.
#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("{kind} {id} not found")]
    NotFound { kind: ObjectKind, id: RemoteId },

    #[error("rejected by destination: {message}")]
    Rejected { message: String },

    #[error("transport failure: {message}")]
    Transport { message: String },
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors ─────────────────────────────────────────
    #[error("invalid relation rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("invalid subnet '{subnet}': {reason}")]
    InvalidSubnet { subnet: String, reason: String },

    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    // ── Source data errors ───────────────────────────────────────────
    #[error("failed to read source snapshot {path}: {reason}")]
    Snapshot { path: String, reason: String },

    // ── Destination errors ───────────────────────────────────────────
    #[error("{kind} '{key}': {source}")]
    Destination {
        kind: ObjectKind,
        key: String,
        #[source]
        source: DestinationError,
    },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn destination(kind: ObjectKind, key: impl Into<String>, source: DestinationError) -> Self {
        Self::Destination {
            kind,
            key: key.into(),
            source,
        }
    }
}
