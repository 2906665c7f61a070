//! In-memory fallback store.
//!
//! Used when the SQLite database cannot be opened. Same contract as
//! [`LocalDb`](crate::LocalDb), no durability: everything vanishes with the
//! process, but the session keeps functioning offline-first.

use indexmap::IndexMap;
use parking_lot::Mutex;

use kioku_types::{ChangeId, Document, DocumentId, PendingChange};

use crate::error::StoreError;
use crate::LocalStore;

#[derive(Default)]
struct Inner {
    documents: IndexMap<DocumentId, Document>,
    changes: Vec<PendingChange>,
    meta: IndexMap<String, String>,
}

/// Volatile [`LocalStore`] with the same semantics as the SQLite store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn documents(&self) -> Result<Vec<Document>, StoreError> {
        let inner = self.inner.lock();
        let mut docs: Vec<Document> = inner.documents.values().cloned().collect();
        docs.sort_by_key(|d| std::cmp::Reverse(d.updated_at));
        Ok(docs)
    }

    fn get(&self, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        Ok(self.inner.lock().documents.get(id).cloned())
    }

    fn put(&self, doc: &Document) -> Result<(), StoreError> {
        kioku_types::validate_blocks(&doc.blocks)?;
        self.inner
            .lock()
            .documents
            .insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    fn remove(&self, id: &DocumentId) -> Result<(), StoreError> {
        self.inner.lock().documents.shift_remove(id);
        Ok(())
    }

    fn replace_documents(&self, docs: &[Document]) -> Result<(), StoreError> {
        for doc in docs {
            kioku_types::validate_blocks(&doc.blocks)?;
        }
        let mut inner = self.inner.lock();
        inner.documents = docs.iter().map(|d| (d.id.clone(), d.clone())).collect();
        Ok(())
    }

    fn enqueue_change(&self, change: &PendingChange) -> Result<(), StoreError> {
        self.inner.lock().changes.push(change.clone());
        Ok(())
    }

    fn pending_changes(&self) -> Result<Vec<PendingChange>, StoreError> {
        let mut changes = self.inner.lock().changes.clone();
        changes.sort_by_key(|c| c.queued_at);
        Ok(changes)
    }

    fn remove_change(&self, id: &ChangeId) -> Result<(), StoreError> {
        self.inner.lock().changes.retain(|c| &c.id != id);
        Ok(())
    }

    fn clear_changes(&self) -> Result<(), StoreError> {
        self.inner.lock().changes.clear();
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.lock().meta.get(key).cloned())
    }

    fn set_meta(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner
            .lock()
            .meta
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
