//! Durable local persistence for kioku.
//!
//! Every mutation lands here before any network traffic, which is what makes
//! the client offline-first: the store holds the full document set, the queue
//! of changes not yet acknowledged by the server, and a handful of metadata
//! scalars (last successful sync timestamp, last opened document).
//!
//! [`LocalDb`] is the SQLite-backed production store; [`MemoryStore`] backs
//! sessions where opening the database fails (the data lives only as long as
//! the process, but the app keeps working).

pub mod db;
pub mod error;
pub mod memory;

pub use db::LocalDb;
pub use error::StoreError;
pub use memory::MemoryStore;

use kioku_types::{ChangeId, Document, DocumentId, PendingChange};

/// Metadata key for the last successful bulk-sync timestamp.
pub const META_LAST_SYNC_AT: &str = "last_sync_at";

/// Metadata key for the document to reopen on next launch.
pub const META_LAST_OPENED_DOCUMENT: &str = "last_opened_document";

/// Local persistence surface consumed by the sync session.
///
/// Methods are synchronous; callers on async runtimes wrap them at their own
/// boundary. Implementations must be shareable across threads.
pub trait LocalStore: Send + Sync {
    /// All stored documents, most recently updated first.
    fn documents(&self) -> Result<Vec<Document>, StoreError>;

    fn get(&self, id: &DocumentId) -> Result<Option<Document>, StoreError>;

    /// Insert or overwrite a document. Blocks are validated here — the
    /// store boundary — so everything past it can assume well-formed
    /// content.
    fn put(&self, doc: &Document) -> Result<(), StoreError>;

    fn remove(&self, id: &DocumentId) -> Result<(), StoreError>;

    /// Replace the entire document set with `docs` (bulk-sync adoption).
    fn replace_documents(&self, docs: &[Document]) -> Result<(), StoreError>;

    /// Append a change to the pending queue.
    fn enqueue_change(&self, change: &PendingChange) -> Result<(), StoreError>;

    /// Pending changes in queue order (oldest first).
    fn pending_changes(&self) -> Result<Vec<PendingChange>, StoreError>;

    fn remove_change(&self, id: &ChangeId) -> Result<(), StoreError>;

    fn clear_changes(&self) -> Result<(), StoreError>;

    /// Read a metadata scalar.
    fn get_meta(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a metadata scalar (upsert).
    fn set_meta(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Timestamp (ms) of the last successful bulk sync, if any.
    fn last_sync_at(&self) -> Result<Option<i64>, StoreError> {
        Ok(self.get_meta(META_LAST_SYNC_AT)?.and_then(|v| v.parse().ok()))
    }

    fn set_last_sync_at(&self, at: i64) -> Result<(), StoreError> {
        self.set_meta(META_LAST_SYNC_AT, &at.to_string())
    }

    /// The document the user had open most recently, if recorded.
    fn last_opened_document(&self) -> Result<Option<DocumentId>, StoreError> {
        Ok(self
            .get_meta(META_LAST_OPENED_DOCUMENT)?
            .map(DocumentId::from))
    }

    fn set_last_opened_document(&self, id: &DocumentId) -> Result<(), StoreError> {
        self.set_meta(META_LAST_OPENED_DOCUMENT, id.as_str())
    }
}
