//! Client error types.

use kioku_types::DocumentId;
use thiserror::Error;

/// Errors surfaced by the sync session and scheduler.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Store(#[from] kioku_store::StoreError),

    #[error(transparent)]
    Transport(#[from] kioku_types::wire::TransportError),

    #[error(transparent)]
    Delta(#[from] kioku_delta::DeltaError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("document not found locally: {0}")]
    NotFound(DocumentId),

    #[error("scheduler shut down")]
    Shutdown,
}
