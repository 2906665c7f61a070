//! Field-level pending edit state.
//!
//! Edits accumulate here between flushes. Content edits additionally carry
//! the full new block list so the scheduler can regenerate patches against
//! the last server-acknowledged base — never against the previous edit —
//! which is what lets a burst of keystrokes collapse to one wire call.

use kioku_types::{Block, Document, DocumentId, DocumentStatus, UpdateRequest};

/// Changed fields awaiting a flush. `None` means untouched; `due_date` uses
/// a double Option so an edit can clear the date.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PendingEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<DocumentStatus>,
    pub favorite: Option<bool>,
    pub due_date: Option<Option<i64>>,
    /// Full post-edit content. Always the latest; patches are derived from
    /// it at flush time, not stored per keystroke.
    pub content: Option<Vec<Block>>,
}

impl PendingEdit {
    pub fn content(blocks: Vec<Block>) -> Self {
        Self {
            content: Some(blocks),
            ..Default::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Fold a newer edit into this one. Later values win per field.
    pub fn merge(&mut self, newer: PendingEdit) {
        if newer.title.is_some() {
            self.title = newer.title;
        }
        if newer.description.is_some() {
            self.description = newer.description;
        }
        if newer.status.is_some() {
            self.status = newer.status;
        }
        if newer.favorite.is_some() {
            self.favorite = newer.favorite;
        }
        if newer.due_date.is_some() {
            self.due_date = newer.due_date;
        }
        if newer.content.is_some() {
            self.content = newer.content;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.favorite.is_none()
            && self.due_date.is_none()
            && self.content.is_none()
    }

    /// Wire form for the full-update endpoint.
    pub fn to_update_request(&self, id: DocumentId) -> UpdateRequest {
        UpdateRequest {
            id,
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status,
            favorite: self.favorite,
            due_date: self.due_date,
            content: self.content.clone(),
        }
    }

    /// Apply the edit to a local document (the local-first half of a
    /// mutation, done before any network traffic).
    pub fn apply_to(&self, doc: &mut Document) {
        if let Some(title) = &self.title {
            doc.title = title.clone();
        }
        if let Some(description) = &self.description {
            doc.description = description.clone();
        }
        if let Some(status) = self.status {
            doc.status = status;
        }
        if let Some(favorite) = self.favorite {
            doc.favorite = favorite;
        }
        if let Some(due_date) = self.due_date {
            doc.due_date = due_date;
        }
        if let Some(content) = &self.content {
            doc.blocks = content.clone();
        }
        doc.touch();
    }
}

/// Last content the server has confirmed for a document, and the version it
/// confirmed it at. Patches are always generated from here.
#[derive(Clone, Debug, Default)]
pub struct AckedBase {
    pub blocks: Vec<Block>,
    pub version: u64,
}
