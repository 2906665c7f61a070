//! Block delta engine for kioku.
//!
//! Everything the sync layer needs to move content changes around:
//! [`diff_blocks`] turns before/after block lists into patches,
//! [`apply_patches`] replays them, [`optimize_patches`] collapses a debounce
//! window's worth of edits, and [`should_use_patch`] decides between patch
//! and full-content wire shapes.

pub mod apply;
pub mod diff;
pub mod error;
pub mod heuristic;
pub mod optimize;

pub use apply::apply_patches;
pub use diff::diff_blocks;
pub use error::DeltaError;
pub use heuristic::{LARGE_CONTENT_BYTES, PATCH_SIZE_RATIO, should_use_patch};
pub use optimize::optimize_patches;
