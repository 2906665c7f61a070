//! Store error types.

use thiserror::Error;

/// Errors from local persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Block validation failed at the store boundary.
    #[error("invalid blocks: {0}")]
    InvalidBlocks(#[from] kioku_types::BlockError),

    /// A stored row no longer decodes — schema drift or manual edits.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}
