//! The reconciliation service.
//!
//! Two entry points mutate documents: versioned patch application (one
//! document, optimistic concurrency via `content_version`) and bulk sync
//! (the whole project list, last-write-wins on `updated_at`). Both scope
//! every read and write to the authenticated owner; a document that is
//! missing or foreign looks identical to the caller.

use kioku_delta::apply_patches;
use kioku_types::{
    BulkSyncRequest, BulkSyncResponse, CardId, CardSyncRecord, Document, DocumentId, KanbanCard,
    PatchRequest, PatchResponse, ProjectSyncRecord, SyncResults, Task, TaskId, TaskSyncRecord,
    UpdateRequest, UserId, now_millis,
};

use crate::db::ProjectDb;
use crate::error::ServiceError;
use crate::validate;

pub struct ReconcileService {
    db: ProjectDb,
}

impl ReconcileService {
    pub fn new(db: ProjectDb) -> Self {
        Self { db }
    }

    /// In-memory service, for tests and single-process embedding.
    pub fn in_memory() -> Result<Self, ServiceError> {
        Ok(Self::new(ProjectDb::in_memory()?))
    }

    fn load_owned(&self, user: &UserId, id: &DocumentId) -> Result<Document, ServiceError> {
        match self.db.load(id)? {
            Some(doc) if &doc.owner == user => Ok(doc),
            _ => Err(ServiceError::AccessDenied),
        }
    }

    // ========================================================================
    // Patch application
    // ========================================================================

    /// Apply a patch batch under optimistic concurrency.
    ///
    /// A `base_version` that does not match the stored `content_version`
    /// returns a conflict response carrying the server's current state and
    /// mutates nothing; the client is expected to fall back to a full
    /// update. On success the version advances by exactly 1.
    pub fn apply_patches(
        &self,
        user: &UserId,
        req: PatchRequest,
    ) -> Result<PatchResponse, ServiceError> {
        validate::check_patch_request(&req)?;
        let doc = self.load_owned(user, &req.id)?;

        if req.base_version != doc.content_version {
            tracing::debug!(
                doc = %req.id,
                base = req.base_version,
                current = doc.content_version,
                "patch version conflict"
            );
            return Ok(PatchResponse::conflicted(doc.content_version, doc.blocks));
        }

        let blocks = apply_patches(doc.blocks, &req.patches)?;
        let next_version = doc.content_version + 1;
        self.db.set_content(
            &req.id,
            &serde_json::to_string(&blocks)?,
            next_version,
            now_millis(),
        )?;
        tracing::debug!(doc = %req.id, version = next_version, "patches applied");
        Ok(PatchResponse::applied(next_version))
    }

    // ========================================================================
    // Full update
    // ========================================================================

    /// Replace changed fields (and optionally the full content) outright.
    /// Content replacement bumps the version by 1 so a patch writer racing
    /// this update conflicts instead of applying against stale blocks.
    pub fn update_document(
        &self,
        user: &UserId,
        req: UpdateRequest,
    ) -> Result<Document, ServiceError> {
        validate::check_update_request(&req)?;
        let mut doc = self.load_owned(user, &req.id)?;

        if let Some(title) = req.title {
            doc.title = title;
        }
        if let Some(description) = req.description {
            doc.description = description;
        }
        if let Some(status) = req.status {
            doc.status = status;
        }
        if let Some(favorite) = req.favorite {
            doc.favorite = favorite;
        }
        if let Some(due_date) = req.due_date {
            doc.due_date = due_date;
        }
        if let Some(content) = req.content {
            doc.blocks = content;
            doc.content_version += 1;
        }
        doc.touch();

        self.db.save(&doc)?;
        Ok(doc)
    }

    // ========================================================================
    // Bulk sync
    // ========================================================================

    /// Reconcile a client's project list, last-write-wins per document.
    ///
    /// Record handling, in submission order:
    /// - `_deleted` with a real id: delete, record in `deleted`.
    /// - temp id or `_isNew`: create under a fresh server id (the client id
    ///   is never persisted), record in `created` — order here is the
    ///   client's only way to correlate temp ids with server ids.
    /// - otherwise: skip unless the incoming `updated_at` is strictly newer
    ///   than the stored row's; if newer, apply fields and reconcile child
    ///   collections by id, record in `updated`.
    pub fn bulk_sync(
        &self,
        user: &UserId,
        req: BulkSyncRequest,
    ) -> Result<BulkSyncResponse, ServiceError> {
        validate::check_bulk_request(&req)?;
        let mut results = SyncResults::default();

        for record in req.projects {
            if record.deleted {
                if record.id.is_temp() {
                    continue; // never existed server-side
                }
                match self.db.load(&record.id)? {
                    Some(doc) if &doc.owner == user => {
                        self.db.delete(&record.id)?;
                        results.deleted.push(record.id);
                    }
                    _ => {
                        tracing::debug!(doc = %record.id, "deletion for unknown document, skipped");
                    }
                }
                continue;
            }

            if record.id.is_temp() || record.is_new {
                let doc = self.create_from_record(user, record)?;
                results.created.push(doc.id.clone());
                self.db.save(&doc)?;
                continue;
            }

            let Some(stored) = self.db.load(&record.id)? else {
                tracing::debug!(doc = %record.id, "update for unknown document, skipped");
                continue;
            };
            if &stored.owner != user {
                tracing::warn!(doc = %record.id, "update for foreign document, skipped");
                continue;
            }
            if record.updated_at <= stored.updated_at {
                continue; // stored copy is at least as fresh
            }

            let merged = merge_record(stored, record);
            self.db.save(&merged)?;
            results.updated.push(merged.id);
        }

        Ok(BulkSyncResponse {
            projects: self.db.list_for_owner(user)?,
            synced_at: now_millis(),
            results,
        })
    }

    /// Delete one document for its owner.
    pub fn delete_document(&self, user: &UserId, id: &DocumentId) -> Result<(), ServiceError> {
        self.load_owned(user, id)?;
        self.db.delete(id)?;
        Ok(())
    }

    /// Materialize a brand-new document from a sync record. The client's id
    /// (temp or otherwise) is discarded; children submitted with temp ids
    /// get fresh server ids too.
    fn create_from_record(
        &self,
        user: &UserId,
        record: ProjectSyncRecord,
    ) -> Result<Document, ServiceError> {
        let id = DocumentId::new();
        let now = now_millis();
        let tasks = record
            .tasks
            .unwrap_or_default()
            .into_iter()
            .filter(|t| !t.deleted)
            .map(|t| task_from_record(t, &id, true))
            .collect();
        let kanban_cards = record
            .kanban_cards
            .unwrap_or_default()
            .into_iter()
            .filter(|c| !c.deleted)
            .map(|c| card_from_record(c, &id, true))
            .collect();

        Ok(Document {
            id,
            title: record.title,
            description: record.description,
            blocks: record.content.unwrap_or_default(),
            content_version: 0,
            status: record.status,
            favorite: record.favorite,
            due_date: record.due_date,
            created_at: now,
            updated_at: record.updated_at,
            owner: user.clone(),
            tasks,
            kanban_cards,
        })
    }
}

/// Fold a newer sync record into the stored document.
fn merge_record(mut stored: Document, record: ProjectSyncRecord) -> Document {
    stored.title = record.title;
    stored.description = record.description;
    stored.status = record.status;
    stored.favorite = record.favorite;
    stored.due_date = record.due_date;
    stored.updated_at = record.updated_at;
    if let Some(content) = record.content {
        if content != stored.blocks {
            stored.blocks = content;
            // Bulk sync carries no version token; bump so a concurrent patch
            // writer conflicts rather than applying against stale blocks.
            stored.content_version += 1;
        }
    }
    if let Some(tasks) = record.tasks {
        stored.tasks = merge_tasks(std::mem::take(&mut stored.tasks), tasks, &stored.id);
    }
    if let Some(cards) = record.kanban_cards {
        stored.kanban_cards =
            merge_cards(std::mem::take(&mut stored.kanban_cards), cards, &stored.id);
    }
    stored
}

/// Reconcile task records by id: flagged-deleted rows drop, temp-id rows
/// become fresh tasks, known ids update in place, and stored tasks the
/// client did not mention survive untouched.
fn merge_tasks(stored: Vec<Task>, incoming: Vec<TaskSyncRecord>, doc_id: &DocumentId) -> Vec<Task> {
    let mut tasks = stored;
    let mut created = Vec::new();

    for record in incoming {
        if record.deleted {
            tasks.retain(|t| t.id != record.id);
            continue;
        }
        let fresh_id = record.id.is_temp();
        if let Some(existing) = tasks.iter_mut().find(|t| t.id == record.id) {
            existing.text = record.text;
            existing.tag = record.tag;
            existing.order = record.order;
            existing.updated_at = record.updated_at;
        } else {
            created.push(task_from_record(record, doc_id, fresh_id));
        }
    }

    tasks.extend(created);
    tasks
}

fn merge_cards(
    stored: Vec<KanbanCard>,
    incoming: Vec<CardSyncRecord>,
    doc_id: &DocumentId,
) -> Vec<KanbanCard> {
    let mut cards = stored;
    let mut created = Vec::new();

    for record in incoming {
        if record.deleted {
            cards.retain(|c| c.id != record.id);
            continue;
        }
        let fresh_id = record.id.is_temp();
        if let Some(existing) = cards.iter_mut().find(|c| c.id == record.id) {
            existing.column = record.column;
            existing.text = record.text;
            existing.priority = record.priority;
            existing.order = record.order;
            existing.updated_at = record.updated_at;
        } else {
            created.push(card_from_record(record, doc_id, fresh_id));
        }
    }

    cards.extend(created);
    cards
}

fn task_from_record(record: TaskSyncRecord, doc_id: &DocumentId, fresh_id: bool) -> Task {
    Task {
        id: if fresh_id { TaskId::new() } else { record.id },
        document_id: doc_id.clone(),
        text: record.text,
        tag: record.tag,
        order: record.order,
        created_at: now_millis(),
        updated_at: record.updated_at,
    }
}

fn card_from_record(record: CardSyncRecord, doc_id: &DocumentId, fresh_id: bool) -> KanbanCard {
    KanbanCard {
        id: if fresh_id { CardId::new() } else { record.id },
        document_id: doc_id.clone(),
        column: record.column,
        text: record.text,
        priority: record.priority,
        order: record.order,
        created_at: now_millis(),
        updated_at: record.updated_at,
    }
}
