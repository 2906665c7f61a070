//! SQLite persistence.
//!
//! Documents are stored as JSON bodies with the columns the store itself
//! queries on (id, owner, updated_at) pulled out. The pending-change queue
//! and the meta key/value table live alongside them so one file holds the
//! whole offline state.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use kioku_types::{ChangeId, ChangeKind, Document, DocumentId, PendingChange, validate_blocks};

use crate::error::StoreError;
use crate::LocalStore;

const SCHEMA: &str = r#"
-- Documents, body as JSON; owner/updated_at duplicated for indexing
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    updated_at INTEGER NOT NULL,
    body TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(owner);
CREATE INDEX IF NOT EXISTS idx_documents_updated ON documents(updated_at DESC);

-- Offline change queue, replayed oldest-first on reconnect
CREATE TABLE IF NOT EXISTS pending_changes (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    document_id TEXT NOT NULL,
    payload TEXT NOT NULL,
    queued_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_pending_queued ON pending_changes(queued_at ASC);
CREATE INDEX IF NOT EXISTS idx_pending_document ON pending_changes(document_id);

-- Small key/value state (last_sync_at lives here)
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// SQLite-backed [`LocalStore`].
pub struct LocalDb {
    conn: Mutex<Connection>,
}

impl LocalDb {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(path = %path.as_ref().display(), "opened local database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl LocalStore for LocalDb {
    fn documents(&self) -> Result<Vec<Document>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT body FROM documents ORDER BY updated_at DESC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut docs = Vec::new();
        for body in rows {
            docs.push(serde_json::from_str(&body?)?);
        }
        Ok(docs)
    }

    fn get(&self, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        let conn = self.conn.lock();
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    fn put(&self, doc: &Document) -> Result<(), StoreError> {
        validate_blocks(&doc.blocks)?;
        let body = serde_json::to_string(doc)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO documents (id, owner, updated_at, body) VALUES (?1, ?2, ?3, ?4)",
            params![doc.id.as_str(), doc.owner.as_str(), doc.updated_at, body],
        )?;
        Ok(())
    }

    fn remove(&self, id: &DocumentId) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM documents WHERE id = ?1",
            params![id.as_str()],
        )?;
        Ok(())
    }

    fn replace_documents(&self, docs: &[Document]) -> Result<(), StoreError> {
        let mut rows = Vec::with_capacity(docs.len());
        for doc in docs {
            validate_blocks(&doc.blocks)?;
            rows.push((doc, serde_json::to_string(doc)?));
        }

        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM documents", [])?;
        for (doc, body) in rows {
            tx.execute(
                "INSERT INTO documents (id, owner, updated_at, body) VALUES (?1, ?2, ?3, ?4)",
                params![doc.id.as_str(), doc.owner.as_str(), doc.updated_at, body],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn enqueue_change(&self, change: &PendingChange) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&change.payload)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO pending_changes (id, kind, document_id, payload, queued_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                change.id.as_str(),
                change.kind.as_str(),
                change.document_id.as_str(),
                payload,
                change.queued_at,
            ],
        )?;
        Ok(())
    }

    fn pending_changes(&self) -> Result<Vec<PendingChange>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, kind, document_id, payload, queued_at
             FROM pending_changes ORDER BY queued_at ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut changes = Vec::new();
        for row in rows {
            let (id, kind, document_id, payload, queued_at) = row?;
            let kind = ChangeKind::from_str(&kind)
                .ok_or_else(|| StoreError::Corrupt(format!("unknown change kind {kind:?}")))?;
            changes.push(PendingChange {
                id: ChangeId::from(id),
                kind,
                document_id: DocumentId::from(document_id),
                payload: serde_json::from_str(&payload)?,
                queued_at,
            });
        }
        Ok(changes)
    }

    fn remove_change(&self, id: &ChangeId) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM pending_changes WHERE id = ?1",
            params![id.as_str()],
        )?;
        Ok(())
    }

    fn clear_changes(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM pending_changes", [])?;
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_meta(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}
