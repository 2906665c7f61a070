//! Documents ("projects") and their child collections.
//!
//! A document owns an ordered block list guarded by a monotonic
//! `content_version` (the optimistic-concurrency token for patch
//! application), plus tasks and kanban cards which reconcile by id during
//! bulk sync.

use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::block::Block;
use crate::ids::{CardId, DocumentId, TaskId, UserId};

/// Current wall-clock time in unix milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Document lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum DocumentStatus {
    #[default]
    Active,
    Archived,
    Done,
}

impl DocumentStatus {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Active => "active",
            DocumentStatus::Archived => "archived",
            DocumentStatus::Done => "done",
        }
    }
}

/// Card priority for kanban cards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum CardPriority {
    Low,
    Medium,
    High,
}

/// A checklist task belonging to a document.
///
/// `order` is relative sequencing only — values need not be contiguous, and
/// ties are broken by stable array position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub document_id: DocumentId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub order: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    /// Create a task with a temp id (offline/optimistic creation).
    pub fn new(document_id: DocumentId, text: impl Into<String>, order: i64) -> Self {
        let now = now_millis();
        Self {
            id: TaskId::temp(),
            document_id,
            text: text.into(),
            tag: None,
            order,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A kanban card belonging to a document, sequenced within its column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KanbanCard {
    pub id: CardId,
    pub document_id: DocumentId,
    pub column: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<CardPriority>,
    pub order: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl KanbanCard {
    /// Create a card with a temp id (offline/optimistic creation).
    pub fn new(
        document_id: DocumentId,
        column: impl Into<String>,
        text: impl Into<String>,
        order: i64,
    ) -> Self {
        let now = now_millis();
        Self {
            id: CardId::temp(),
            document_id,
            column: column.into(),
            text: text.into(),
            priority: None,
            order,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A document — the top-level "project" entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Ordered rich-text content. Block ids are unique within this list.
    #[serde(default)]
    pub blocks: Vec<Block>,
    /// Monotonic optimistic-concurrency token: +1 per applied patch batch,
    /// never decreases or skips.
    #[serde(default)]
    pub content_version: u64,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub owner: UserId,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub kanban_cards: Vec<KanbanCard>,
}

impl Document {
    /// Create a fresh local document: temp id, version 0, empty content.
    ///
    /// This is what "new document" does the instant the user asks — no
    /// network involved. The temp id is retired on first successful sync.
    pub fn new(owner: UserId, title: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: DocumentId::temp(),
            title: title.into(),
            description: String::new(),
            blocks: Vec::new(),
            content_version: 0,
            status: DocumentStatus::default(),
            favorite: false,
            due_date: None,
            created_at: now,
            updated_at: now,
            owner,
            tasks: Vec::new(),
            kanban_cards: Vec::new(),
        }
    }

    /// Bump `updated_at` to now.
    pub fn touch(&mut self) {
        self.updated_at = now_millis();
    }

    /// Tasks in manual order (stable sort: ties keep array position).
    pub fn sorted_tasks(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().collect();
        tasks.sort_by_key(|t| t.order);
        tasks
    }

    /// Cards for one column in manual order (stable sort).
    pub fn sorted_cards(&self, column: &str) -> Vec<&KanbanCard> {
        let mut cards: Vec<&KanbanCard> =
            self.kanban_cards.iter().filter(|c| c.column == column).collect();
        cards.sort_by_key(|c| c.order);
        cards
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_is_temp_version_zero() {
        let doc = Document::new(UserId::from("user-1"), "Notes");
        assert!(doc.id.is_temp());
        assert_eq!(doc.content_version, 0);
        assert_eq!(doc.status, DocumentStatus::Active);
        assert!(doc.blocks.is_empty());
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            DocumentStatus::Active,
            DocumentStatus::Archived,
            DocumentStatus::Done,
        ] {
            assert_eq!(DocumentStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_sorted_tasks_stable_on_ties() {
        let doc_id = DocumentId::new();
        let mut doc = Document::new(UserId::from("user-1"), "p");
        let mut first = Task::new(doc_id.clone(), "first", 5);
        let mut second = Task::new(doc_id.clone(), "second", 5);
        let mut third = Task::new(doc_id, "third", 1);
        first.order = 5;
        second.order = 5;
        third.order = 1;
        doc.tasks = vec![first, second, third];

        let sorted = doc.sorted_tasks();
        assert_eq!(sorted[0].text, "third");
        // Equal order values keep their array positions
        assert_eq!(sorted[1].text, "first");
        assert_eq!(sorted[2].text, "second");
    }

    #[test]
    fn test_sorted_cards_filters_by_column() {
        let doc_id = DocumentId::new();
        let mut doc = Document::new(UserId::from("user-1"), "board");
        doc.kanban_cards = vec![
            KanbanCard::new(doc_id.clone(), "doing", "b", 2),
            KanbanCard::new(doc_id.clone(), "todo", "a", 1),
            KanbanCard::new(doc_id, "doing", "c", 1),
        ];

        let doing = doc.sorted_cards("doing");
        assert_eq!(doing.len(), 2);
        assert_eq!(doing[0].text, "c");
        assert_eq!(doing[1].text, "b");
    }
}
