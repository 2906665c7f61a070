//! Error types for the delta engine.

use kioku_types::PatchOp;
use thiserror::Error;

/// Errors from patch application.
///
/// These indicate malformed patches or a base list the patches were not
/// generated for — programming errors under valid input, caught and logged
/// at the scheduler boundary in production.
#[derive(Debug, Error)]
pub enum DeltaError {
    /// `add`/`replace` patches must carry a value.
    #[error("{0:?} patch has no value")]
    MissingValue(PatchOp),

    /// Positional operation outside the current list bounds.
    #[error("patch index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
}
