//! Shared types for kioku — the offline-first note/project manager core.
//!
//! This crate is the relational foundation the other crates build on:
//! typed ids (with offline temp-id support), the document/block model,
//! patches, the pending-change queue, and the logical RPC wire contracts.

pub mod block;
pub mod change;
pub mod document;
pub mod ids;
pub mod patch;
pub mod wire;

pub use block::{
    Block, BlockError, BlockKind, InlineSpan, InlineStyle, MAX_BLOCK_DEPTH, validate_blocks,
};
pub use change::{ChangeKind, PendingChange};
pub use document::{
    CardPriority, Document, DocumentStatus, KanbanCard, Task, now_millis,
};
pub use ids::{BlockId, CardId, ChangeId, DocumentId, TEMP_ID_PREFIX, TaskId, UserId};
pub use patch::{Patch, PatchOp, PatchSet};
pub use wire::{
    BulkSyncRequest, BulkSyncResponse, CardSyncRecord, PatchRequest, PatchResponse,
    ProjectSyncRecord, SyncResults, SyncTransport, TaskSyncRecord, TransportError, UpdateRequest,
};
