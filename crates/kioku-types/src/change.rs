//! Pending changes — the offline mutation queue.
//!
//! Every local mutation that has not been confirmed by the server is queued
//! as a [`PendingChange`] and replayed on the next successful sync. This is
//! the command-log form of the "apply locally first, reconcile later"
//! pattern: the local store is mutated immediately, the queue remembers what
//! the server still needs to hear about.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::document::now_millis;
use crate::ids::{ChangeId, DocumentId};

/// What kind of mutation is queued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

impl ChangeKind {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

/// A queued local mutation awaiting server confirmation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingChange {
    pub id: ChangeId,
    pub kind: ChangeKind,
    pub document_id: DocumentId,
    /// Mutation payload — the changed fields, shape depends on `kind`.
    pub payload: serde_json::Value,
    pub queued_at: i64,
}

impl PendingChange {
    pub fn new(kind: ChangeKind, document_id: DocumentId, payload: serde_json::Value) -> Self {
        Self {
            id: ChangeId::new(),
            kind,
            document_id,
            payload,
            queued_at: now_millis(),
        }
    }
}
