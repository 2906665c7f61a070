//! Service error taxonomy.
//!
//! Validation failures are rejected before any persistence and carry a
//! description; ownership and existence failures collapse into a single
//! access-denied condition so callers cannot enumerate foreign documents.
//! Version conflicts are *not* errors — they come back as a structured
//! response from the patch endpoint.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or oversized payload; nothing was persisted.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The document does not exist or belongs to someone else.
    #[error("access denied")]
    AccessDenied,

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Delta(#[from] kioku_delta::DeltaError),
}
