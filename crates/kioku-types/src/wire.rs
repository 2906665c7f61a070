//! Logical RPC contracts between client and reconciliation service.
//!
//! Three endpoints, all carried by [`SyncTransport`]:
//!
//! - **Patch**: `(id, patches, base_version)` → success or a structured
//!   conflict carrying the server's current version and content.
//! - **Full update**: changed fields (optionally full content) → updated
//!   document.
//! - **Bulk sync**: the client's project list with `_deleted`/`_isNew`
//!   markers → the server's full project list plus created/updated/deleted
//!   id sets. `results.created` preserves request submission order, which is
//!   how clients correlate their temp ids with the server-assigned ids.
//!
//! Transport is deliberately abstract: tests and single-process deployments
//! use an in-process implementation, a real deployment puts HTTP or similar
//! behind the same trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block::Block;
use crate::document::{CardPriority, Document, DocumentStatus, now_millis};
use crate::ids::{CardId, DocumentId, TaskId, UserId};
use crate::patch::Patch;

// ============================================================================
// Patch endpoint
// ============================================================================

/// Request for optimistic-concurrency patch application.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PatchRequest {
    pub id: DocumentId,
    pub patches: Vec<Patch>,
    /// The content version the patches were generated against.
    pub base_version: u64,
}

/// Patch endpoint response.
///
/// A version conflict is not an error: `success: false, conflict: true`
/// plus the server's current version and content, so the caller can fall
/// back to a full-content update without another round trip.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PatchResponse {
    pub success: bool,
    pub conflict: bool,
    pub current_version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<Block>>,
}

impl PatchResponse {
    pub fn applied(current_version: u64) -> Self {
        Self {
            success: true,
            conflict: false,
            current_version,
            content: None,
        }
    }

    pub fn conflicted(current_version: u64, content: Vec<Block>) -> Self {
        Self {
            success: false,
            conflict: true,
            current_version,
            content: Some(content),
        }
    }
}

// ============================================================================
// Full update endpoint
// ============================================================================

/// Field-level document update. `None` means "unchanged"; `due_date` uses a
/// double Option so `Some(None)` can clear the date.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DocumentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<i64>>,
    /// Full replacement content. Bumps the content version by 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<Block>>,
}

impl UpdateRequest {
    pub fn for_document(id: DocumentId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// True when no field is set — nothing to send.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.favorite.is_none()
            && self.due_date.is_none()
            && self.content.is_none()
    }
}

// ============================================================================
// Bulk sync endpoint
// ============================================================================

/// A task as submitted in a bulk sync record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskSyncRecord {
    pub id: TaskId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub order: i64,
    pub updated_at: i64,
    #[serde(default, rename = "_deleted", skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

/// A kanban card as submitted in a bulk sync record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CardSyncRecord {
    pub id: CardId,
    pub column: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<CardPriority>,
    pub order: i64,
    pub updated_at: i64,
    #[serde(default, rename = "_deleted", skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

/// One project's client-side state as submitted for reconciliation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectSyncRecord {
    pub id: DocumentId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<Block>>,
    #[serde(default)]
    pub content_version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<TaskSyncRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kanban_cards: Option<Vec<CardSyncRecord>>,
    pub updated_at: i64,
    #[serde(default, rename = "_deleted", skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
    #[serde(default, rename = "_isNew", skip_serializing_if = "std::ops::Not::not")]
    pub is_new: bool,
}

impl ProjectSyncRecord {
    /// Build a sync record from a local document, including children.
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            title: doc.title.clone(),
            description: doc.description.clone(),
            status: doc.status,
            favorite: doc.favorite,
            due_date: doc.due_date,
            content: Some(doc.blocks.clone()),
            content_version: doc.content_version,
            tasks: Some(
                doc.tasks
                    .iter()
                    .map(|t| TaskSyncRecord {
                        id: t.id.clone(),
                        text: t.text.clone(),
                        tag: t.tag.clone(),
                        order: t.order,
                        updated_at: t.updated_at,
                        deleted: false,
                    })
                    .collect(),
            ),
            kanban_cards: Some(
                doc.kanban_cards
                    .iter()
                    .map(|c| CardSyncRecord {
                        id: c.id.clone(),
                        column: c.column.clone(),
                        text: c.text.clone(),
                        priority: c.priority,
                        order: c.order,
                        updated_at: c.updated_at,
                        deleted: false,
                    })
                    .collect(),
            ),
            updated_at: doc.updated_at,
            deleted: false,
            is_new: doc.id.is_temp(),
        }
    }

    /// Mark a deletion-only record (no field content needed).
    pub fn deletion(id: DocumentId) -> Self {
        Self {
            id,
            title: String::new(),
            description: String::new(),
            status: DocumentStatus::default(),
            favorite: false,
            due_date: None,
            content: None,
            content_version: 0,
            tasks: None,
            kanban_cards: None,
            updated_at: now_millis(),
            deleted: true,
            is_new: false,
        }
    }
}

/// Bulk sync request: the client's view of its projects.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BulkSyncRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<i64>,
    pub projects: Vec<ProjectSyncRecord>,
}

/// Id sets describing what the reconciliation actually did.
///
/// `created` is in request submission order so callers can zip their
/// submitted temp ids against the fresh server ids.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SyncResults {
    pub created: Vec<DocumentId>,
    pub updated: Vec<DocumentId>,
    pub deleted: Vec<DocumentId>,
}

/// Bulk sync response: the authoritative project list plus result sets.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BulkSyncResponse {
    pub projects: Vec<Document>,
    pub synced_at: i64,
    pub results: SyncResults,
}

// ============================================================================
// Transport seam
// ============================================================================

/// Errors crossing the transport boundary.
///
/// Version conflicts are *not* transport errors — they come back as a
/// structured [`PatchResponse`]. These are the failures that leave pending
/// changes queued for the next flush.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level failure; the change stays queued and retries next cycle.
    #[error("network error: {0}")]
    Network(String),
    /// Server rejected the payload before persistence (4xx-equivalent).
    #[error("request rejected: {0}")]
    Rejected(String),
    /// Ownership or existence check failed; surfaced as a generic failure.
    #[error("access denied")]
    Denied,
}

/// The sync endpoints as consumed by the client.
///
/// The caller supplies the authenticated [`UserId`] — session issuance is an
/// external collaborator, not part of this system.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Patch endpoint (§optimistic concurrency).
    async fn apply_patches(
        &self,
        user: &UserId,
        req: PatchRequest,
    ) -> Result<PatchResponse, TransportError>;

    /// Full-update endpoint.
    async fn update_document(
        &self,
        user: &UserId,
        req: UpdateRequest,
    ) -> Result<Document, TransportError>;

    /// Bulk sync endpoint (last-write-wins reconciliation).
    async fn bulk_sync(
        &self,
        user: &UserId,
        req: BulkSyncRequest,
    ) -> Result<BulkSyncResponse, TransportError>;

    /// Delete a document server-side.
    async fn delete_document(
        &self,
        user: &UserId,
        id: &DocumentId,
    ) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_record_flags_use_underscore_names() {
        let mut record = ProjectSyncRecord::deletion(DocumentId::new());
        record.is_new = true;
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["_deleted"], true);
        assert_eq!(json["_isNew"], true);
    }

    #[test]
    fn test_sync_record_flags_default_false() {
        let json = serde_json::json!({
            "id": "abc",
            "title": "t",
            "updated_at": 5,
        });
        let record: ProjectSyncRecord = serde_json::from_value(json).unwrap();
        assert!(!record.deleted);
        assert!(!record.is_new);
        assert!(record.tasks.is_none());
    }

    #[test]
    fn test_from_document_marks_temp_as_new() {
        let doc = Document::new(UserId::from("u"), "local only");
        let record = ProjectSyncRecord::from_document(&doc);
        assert!(record.is_new);
        assert!(!record.deleted);
        assert_eq!(record.content_version, 0);
    }

    #[test]
    fn test_update_request_due_date_double_option() {
        let mut req = UpdateRequest::for_document(DocumentId::new());
        assert!(req.is_empty());
        req.due_date = Some(None); // explicit clear
        assert!(!req.is_empty());
        let json = serde_json::to_value(&req).unwrap();
        assert!(json["due_date"].is_null());
    }

    #[test]
    fn test_patch_response_constructors() {
        let ok = PatchResponse::applied(7);
        assert!(ok.success && !ok.conflict);
        assert_eq!(ok.current_version, 7);

        let conflict = PatchResponse::conflicted(5, Vec::new());
        assert!(!conflict.success && conflict.conflict);
        assert_eq!(conflict.current_version, 5);
        assert!(conflict.content.is_some());
    }
}
