//! Offline-first sync session.
//!
//! Every mutation lands in the local store first and queues a
//! [`PendingChange`]; the server hears about it later, through the scheduler
//! (per-document flushes) or through [`SyncSession::sync_all`] (bulk
//! reconciliation, typically on app launch or reconnect).
//!
//! Documents created offline carry a temp id. They never sync individually;
//! bulk sync submits them flagged `_isNew`, the server mints real ids, and
//! the session promotes them by zipping its submitted temp ids against
//! `results.created` (the server preserves submission order).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use kioku_store::{LocalDb, LocalStore, MemoryStore};
use kioku_types::{
    BulkSyncRequest, CardId, CardSyncRecord, ChangeKind, Document, DocumentId, KanbanCard,
    PendingChange, ProjectSyncRecord, SyncResults, SyncTransport, Task, TaskId, TaskSyncRecord,
    UserId, now_millis,
};

use crate::error::ClientError;
use crate::pending::PendingEdit;

/// What a bulk sync accomplished, from the client's point of view.
#[derive(Clone, Debug)]
pub struct SyncOutcome {
    /// Temp id → server id, for documents created this round.
    pub promoted: Vec<(DocumentId, DocumentId)>,
    pub results: SyncResults,
    pub synced_at: i64,
}

/// Local-first document session bound to one user.
pub struct SyncSession {
    store: Arc<dyn LocalStore>,
    transport: Arc<dyn SyncTransport>,
    user: UserId,
}

impl SyncSession {
    pub fn new(
        store: Arc<dyn LocalStore>,
        transport: Arc<dyn SyncTransport>,
        user: UserId,
    ) -> Self {
        Self {
            store,
            transport,
            user,
        }
    }

    /// Open the SQLite store at `path`, degrading to a volatile in-memory
    /// store when it cannot be opened. The session stays usable either way;
    /// with the fallback, a restart loses unsynced work.
    pub fn open_store<P: AsRef<Path>>(path: P) -> Arc<dyn LocalStore> {
        match LocalDb::open(&path) {
            Ok(db) => Arc::new(db),
            Err(err) => {
                tracing::warn!(
                    path = %path.as_ref().display(),
                    %err,
                    "local database unavailable, using in-memory store"
                );
                Arc::new(MemoryStore::new())
            }
        }
    }

    pub fn store(&self) -> &Arc<dyn LocalStore> {
        &self.store
    }

    pub fn documents(&self) -> Result<Vec<Document>, ClientError> {
        Ok(self.store.documents()?)
    }

    pub fn get(&self, id: &DocumentId) -> Result<Option<Document>, ClientError> {
        Ok(self.store.get(id)?)
    }

    /// Load a document and remember it as the most recently opened one.
    pub fn open_document(&self, id: &DocumentId) -> Result<Document, ClientError> {
        let doc = self
            .store
            .get(id)?
            .ok_or_else(|| ClientError::NotFound(id.clone()))?;
        self.store.set_last_opened_document(id)?;
        Ok(doc)
    }

    /// The document to restore on launch: the last one opened, if it still
    /// exists locally.
    pub fn resume_document(&self) -> Result<Option<Document>, ClientError> {
        match self.store.last_opened_document()? {
            Some(id) => Ok(self.store.get(&id)?),
            None => Ok(None),
        }
    }

    // ========================================================================
    // Local-first mutations
    // ========================================================================

    /// Create a document locally. It gets a temp id and stays client-only
    /// until the next bulk sync promotes it.
    pub fn create_document(&self, title: impl Into<String>) -> Result<Document, ClientError> {
        let doc = Document::new(self.user.clone(), title);
        self.store.put(&doc)?;
        self.enqueue(
            ChangeKind::Create,
            doc.id.clone(),
            serde_json::to_value(&doc)?,
        )?;
        tracing::debug!(doc = %doc.id, "created local document");
        Ok(doc)
    }

    /// Apply a field-level edit locally and queue it for sync.
    pub fn update_document(
        &self,
        id: &DocumentId,
        edit: &PendingEdit,
    ) -> Result<Document, ClientError> {
        let mut doc = self
            .store
            .get(id)?
            .ok_or_else(|| ClientError::NotFound(id.clone()))?;
        edit.apply_to(&mut doc);
        self.store.put(&doc)?;
        self.enqueue(
            ChangeKind::Update,
            id.clone(),
            serde_json::to_value(edit.to_update_request(id.clone()))?,
        )?;
        Ok(doc)
    }

    /// Delete a document locally. Temp documents just evaporate (the server
    /// never knew about them, so their queued changes are dropped too);
    /// synced documents queue a deletion for the next bulk sync.
    pub fn delete_document(&self, id: &DocumentId) -> Result<(), ClientError> {
        self.store.remove(id)?;
        if id.is_temp() {
            for change in self.store.pending_changes()? {
                if &change.document_id == id {
                    self.store.remove_change(&change.id)?;
                }
            }
            return Ok(());
        }
        self.enqueue(
            ChangeKind::Delete,
            id.clone(),
            serde_json::json!({ "document": true }),
        )
    }

    /// Append a task to a document.
    pub fn add_task(&self, id: &DocumentId, text: impl Into<String>) -> Result<Task, ClientError> {
        let mut doc = self
            .store
            .get(id)?
            .ok_or_else(|| ClientError::NotFound(id.clone()))?;
        let task = Task::new(id.clone(), text, doc.tasks.len() as i64);
        doc.tasks.push(task.clone());
        doc.touch();
        self.store.put(&doc)?;
        self.enqueue(ChangeKind::Update, id.clone(), serde_json::json!({}))?;
        Ok(task)
    }

    /// Remove a task, leaving a tombstone so the next bulk sync deletes it
    /// server-side (absent child records are left alone, only flagged ones
    /// are deleted).
    pub fn remove_task(&self, id: &DocumentId, task_id: &TaskId) -> Result<(), ClientError> {
        let mut doc = self
            .store
            .get(id)?
            .ok_or_else(|| ClientError::NotFound(id.clone()))?;
        doc.tasks.retain(|t| &t.id != task_id);
        doc.touch();
        self.store.put(&doc)?;
        if task_id.is_temp() {
            return Ok(()); // never reached the server
        }
        self.enqueue(
            ChangeKind::Delete,
            id.clone(),
            serde_json::json!({ "task_id": task_id.as_str() }),
        )
    }

    /// Append a kanban card to a document's board column.
    pub fn add_card(
        &self,
        id: &DocumentId,
        column: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<KanbanCard, ClientError> {
        let mut doc = self
            .store
            .get(id)?
            .ok_or_else(|| ClientError::NotFound(id.clone()))?;
        let column = column.into();
        let order = doc.sorted_cards(&column).len() as i64;
        let card = KanbanCard::new(id.clone(), column, text, order);
        doc.kanban_cards.push(card.clone());
        doc.touch();
        self.store.put(&doc)?;
        self.enqueue(ChangeKind::Update, id.clone(), serde_json::json!({}))?;
        Ok(card)
    }

    /// Remove a card, tombstoned like [`Self::remove_task`].
    pub fn remove_card(&self, id: &DocumentId, card_id: &CardId) -> Result<(), ClientError> {
        let mut doc = self
            .store
            .get(id)?
            .ok_or_else(|| ClientError::NotFound(id.clone()))?;
        doc.kanban_cards.retain(|c| &c.id != card_id);
        doc.touch();
        self.store.put(&doc)?;
        if card_id.is_temp() {
            return Ok(());
        }
        self.enqueue(
            ChangeKind::Delete,
            id.clone(),
            serde_json::json!({ "card_id": card_id.as_str() }),
        )
    }

    fn enqueue(
        &self,
        kind: ChangeKind,
        document_id: DocumentId,
        payload: serde_json::Value,
    ) -> Result<(), ClientError> {
        let change = PendingChange::new(kind, document_id, payload);
        self.store.enqueue_change(&change)?;
        Ok(())
    }

    // ========================================================================
    // Bulk sync
    // ========================================================================

    /// Reconcile the full local document set with the server.
    ///
    /// Submits every local document (temp ones flagged `_isNew`), plus
    /// deletion tombstones from the pending queue, then adopts the server's
    /// returned project list wholesale — last-write-wins already happened
    /// server-side. On success the pending queue is cleared and
    /// `last_sync_at` advances. On transport failure nothing local changes.
    pub async fn sync_all(&self) -> Result<SyncOutcome, ClientError> {
        let docs = self.store.documents()?;
        let changes = self.store.pending_changes()?;

        // Child tombstones, folded into their document's record below.
        let mut deleted_tasks: HashMap<DocumentId, Vec<TaskId>> = HashMap::new();
        let mut deleted_cards: HashMap<DocumentId, Vec<CardId>> = HashMap::new();
        let mut deleted_docs: Vec<DocumentId> = Vec::new();
        for change in &changes {
            if change.kind != ChangeKind::Delete {
                continue;
            }
            if let Some(task_id) = change.payload.get("task_id").and_then(|v| v.as_str()) {
                deleted_tasks
                    .entry(change.document_id.clone())
                    .or_default()
                    .push(TaskId::from(task_id));
            } else if let Some(card_id) = change.payload.get("card_id").and_then(|v| v.as_str()) {
                deleted_cards
                    .entry(change.document_id.clone())
                    .or_default()
                    .push(CardId::from(card_id));
            } else if !deleted_docs.contains(&change.document_id) {
                deleted_docs.push(change.document_id.clone());
            }
        }

        let mut projects = Vec::with_capacity(docs.len() + deleted_docs.len());
        let mut temp_ids = Vec::new();
        for doc in &docs {
            let mut record = ProjectSyncRecord::from_document(doc);
            if let Some(tasks) = deleted_tasks.remove(&doc.id) {
                let list = record.tasks.get_or_insert_with(Vec::new);
                list.extend(tasks.into_iter().map(task_tombstone));
            }
            if let Some(cards) = deleted_cards.remove(&doc.id) {
                let list = record.kanban_cards.get_or_insert_with(Vec::new);
                list.extend(cards.into_iter().map(card_tombstone));
            }
            if record.is_new {
                temp_ids.push(doc.id.clone());
            }
            projects.push(record);
        }
        for id in deleted_docs {
            projects.push(ProjectSyncRecord::deletion(id));
        }

        let req = BulkSyncRequest {
            last_sync_at: self.store.last_sync_at()?,
            projects,
        };
        let resp = self.transport.bulk_sync(&self.user, req).await?;

        // `results.created` preserves submission order, which is the only
        // correlation we have between temp ids and their server ids.
        let promoted: Vec<(DocumentId, DocumentId)> = temp_ids
            .into_iter()
            .zip(resp.results.created.iter().cloned())
            .collect();

        self.store.replace_documents(&resp.projects)?;
        self.store.set_last_sync_at(resp.synced_at)?;
        self.store.clear_changes()?;

        tracing::info!(
            created = resp.results.created.len(),
            updated = resp.results.updated.len(),
            deleted = resp.results.deleted.len(),
            "bulk sync complete"
        );

        Ok(SyncOutcome {
            promoted,
            results: resp.results,
            synced_at: resp.synced_at,
        })
    }
}

fn task_tombstone(id: TaskId) -> TaskSyncRecord {
    TaskSyncRecord {
        id,
        text: String::new(),
        tag: None,
        order: 0,
        updated_at: now_millis(),
        deleted: true,
    }
}

fn card_tombstone(id: CardId) -> CardSyncRecord {
    CardSyncRecord {
        id,
        column: String::new(),
        text: String::new(),
        priority: None,
        order: 0,
        updated_at: now_millis(),
        deleted: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use kioku_types::{
        BulkSyncResponse, PatchRequest, PatchResponse, TransportError, UpdateRequest,
    };

    /// Bulk-sync mock: captures the request, replays a scripted response.
    #[derive(Default)]
    struct BulkMock {
        requests: Mutex<Vec<BulkSyncRequest>>,
        response: Mutex<Option<BulkSyncResponse>>,
        fail: Mutex<bool>,
    }

    impl BulkMock {
        fn respond(&self, resp: BulkSyncResponse) {
            *self.response.lock().unwrap() = Some(resp);
        }

        fn last_request(&self) -> BulkSyncRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl SyncTransport for BulkMock {
        async fn apply_patches(
            &self,
            _user: &UserId,
            _req: PatchRequest,
        ) -> Result<PatchResponse, TransportError> {
            unimplemented!("session tests only exercise bulk sync")
        }

        async fn update_document(
            &self,
            _user: &UserId,
            _req: UpdateRequest,
        ) -> Result<Document, TransportError> {
            unimplemented!("session tests only exercise bulk sync")
        }

        async fn bulk_sync(
            &self,
            _user: &UserId,
            req: BulkSyncRequest,
        ) -> Result<BulkSyncResponse, TransportError> {
            if *self.fail.lock().unwrap() {
                return Err(TransportError::Network("offline".into()));
            }
            self.requests.lock().unwrap().push(req);
            Ok(self
                .response
                .lock()
                .unwrap()
                .clone()
                .unwrap_or(BulkSyncResponse {
                    projects: Vec::new(),
                    synced_at: 1_000,
                    results: SyncResults::default(),
                }))
        }

        async fn delete_document(
            &self,
            _user: &UserId,
            _id: &DocumentId,
        ) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn session() -> (SyncSession, Arc<BulkMock>) {
        let transport = Arc::new(BulkMock::default());
        let session = SyncSession::new(
            Arc::new(kioku_store::MemoryStore::new()),
            transport.clone(),
            UserId::from("u1"),
        );
        (session, transport)
    }

    #[test]
    fn test_create_is_local_and_queued() {
        let (session, _) = session();
        let doc = session.create_document("offline note").unwrap();

        assert!(doc.id.is_temp());
        assert_eq!(session.documents().unwrap().len(), 1);
        let changes = session.store().pending_changes().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Create);
    }

    #[test]
    fn test_update_missing_document_errors() {
        let (session, _) = session();
        let err = session
            .update_document(&DocumentId::new(), &PendingEdit::title("x"))
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }

    #[test]
    fn test_delete_temp_document_purges_its_queue() {
        let (session, _) = session();
        let doc = session.create_document("never synced").unwrap();
        session
            .update_document(&doc.id, &PendingEdit::title("renamed"))
            .unwrap();

        session.delete_document(&doc.id).unwrap();

        assert!(session.get(&doc.id).unwrap().is_none());
        assert!(session.store().pending_changes().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sync_submits_new_flag_and_promotes_temp_ids() {
        let (session, transport) = session();
        let doc = session.create_document("offline note").unwrap();

        let server_id = DocumentId::new();
        let mut server_doc = doc.clone();
        server_doc.id = server_id.clone();
        transport.respond(BulkSyncResponse {
            projects: vec![server_doc],
            synced_at: 2_000,
            results: SyncResults {
                created: vec![server_id.clone()],
                ..Default::default()
            },
        });

        let outcome = session.sync_all().await.unwrap();

        let req = transport.last_request();
        assert!(req.projects[0].is_new);
        assert_eq!(outcome.promoted, vec![(doc.id.clone(), server_id.clone())]);

        // Local set adopted the server list: temp id gone, server id present.
        assert!(session.get(&doc.id).unwrap().is_none());
        assert!(session.get(&server_id).unwrap().is_some());
        assert_eq!(session.store().last_sync_at().unwrap(), Some(2_000));
        assert!(session.store().pending_changes().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sync_submits_deletion_tombstones() {
        let (session, transport) = session();

        // A document that already has a server id.
        let mut doc = Document::new(UserId::from("u1"), "synced");
        doc.id = DocumentId::new();
        session.store().put(&doc).unwrap();

        session.delete_document(&doc.id).unwrap();
        session.sync_all().await.unwrap();

        let req = transport.last_request();
        assert_eq!(req.projects.len(), 1);
        assert!(req.projects[0].deleted);
        assert_eq!(req.projects[0].id, doc.id);
    }

    #[tokio::test]
    async fn test_sync_folds_child_tombstones_into_record() {
        let (session, transport) = session();

        let mut doc = Document::new(UserId::from("u1"), "with children");
        doc.id = DocumentId::new();
        let mut task = Task::new(doc.id.clone(), "done already", 0);
        task.id = TaskId::new(); // server-assigned
        doc.tasks.push(task.clone());
        session.store().put(&doc).unwrap();

        session.remove_task(&doc.id, &task.id).unwrap();
        session.sync_all().await.unwrap();

        let req = transport.last_request();
        let tasks = req.projects[0].tasks.as_ref().unwrap();
        let tombstone = tasks.iter().find(|t| t.id == task.id).unwrap();
        assert!(tombstone.deleted);
    }

    #[tokio::test]
    async fn test_failed_sync_changes_nothing_locally() {
        let (session, transport) = session();
        let doc = session.create_document("kept").unwrap();
        *transport.fail.lock().unwrap() = true;

        let err = session.sync_all().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));

        assert!(session.get(&doc.id).unwrap().is_some());
        assert_eq!(session.store().pending_changes().unwrap().len(), 1);
        assert!(session.store().last_sync_at().unwrap().is_none());
    }

    #[test]
    fn test_removing_temp_task_leaves_no_tombstone() {
        let (session, _) = session();
        let doc = session.create_document("doc").unwrap();
        let task = session.add_task(&doc.id, "scratch").unwrap();
        assert!(task.id.is_temp());

        let before = session.store().pending_changes().unwrap().len();
        session.remove_task(&doc.id, &task.id).unwrap();
        let after = session.store().pending_changes().unwrap().len();

        assert_eq!(before, after);
        assert!(session.get(&doc.id).unwrap().unwrap().tasks.is_empty());
    }

    #[test]
    fn test_resume_restores_last_opened_document() {
        let (session, _) = session();
        assert!(session.resume_document().unwrap().is_none());

        let first = session.create_document("first").unwrap();
        let second = session.create_document("second").unwrap();
        session.open_document(&first.id).unwrap();
        session.open_document(&second.id).unwrap();

        let resumed = session.resume_document().unwrap().unwrap();
        assert_eq!(resumed.id, second.id);

        // A vanished document resumes to nothing rather than an error.
        session.delete_document(&second.id).unwrap();
        assert!(session.resume_document().unwrap().is_none());
    }

    #[test]
    fn test_open_store_degrades_to_memory() {
        // A directory path cannot be opened as a database file; the session
        // must still come up with a working (volatile) store.
        let dir = tempfile::tempdir().unwrap();
        let store = SyncSession::open_store(dir.path());

        let doc = Document::new(UserId::from("u1"), "volatile");
        store.put(&doc).unwrap();
        assert!(store.get(&doc.id).unwrap().is_some());
    }

    #[test]
    fn test_card_ordering_within_column() {
        let (session, _) = session();
        let doc = session.create_document("board").unwrap();
        let a = session.add_card(&doc.id, "todo", "first").unwrap();
        let b = session.add_card(&doc.id, "todo", "second").unwrap();
        let other = session.add_card(&doc.id, "done", "elsewhere").unwrap();

        assert_eq!(a.order, 0);
        assert_eq!(b.order, 1);
        assert_eq!(other.order, 0);
    }
}
