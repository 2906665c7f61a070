//! Typed identifiers for documents, blocks, tasks, cards, users, and queued
//! changes.
//!
//! Server-assigned ids are UUIDv7 hex (time-ordered, globally unique). Ids
//! minted while offline use [`temp()`](DocumentId::temp) instead: a UUIDv4
//! behind the reserved `temp-` prefix. A temp id is a client-only placeholder
//! — it never reaches another client, and on first successful creation sync
//! it is permanently replaced by a server id and never reused.
//!
//! All ids are opaque strings on the wire. The `short()` form (first 8
//! chars) is for log/UI display only, never a lookup key.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved prefix marking client-generated placeholder ids.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// A document ("project") identifier.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

/// A block identifier — stable across edits; the unit the differ keys on.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

/// A task identifier.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

/// A kanban card identifier.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

/// A user identifier, issued by the (external) authentication collaborator.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

/// Synthetic identifier for a queued pending change.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(String);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_typed_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Mint a new server-grade id (UUIDv7 hex, time-ordered).
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7().as_simple().to_string())
            }

            /// Mint a client-only placeholder id behind [`TEMP_ID_PREFIX`].
            pub fn temp() -> Self {
                Self(format!(
                    "{}{}",
                    TEMP_ID_PREFIX,
                    uuid::Uuid::new_v4().as_simple()
                ))
            }

            /// Whether this id carries the reserved temp prefix.
            pub fn is_temp(&self) -> bool {
                self.0.starts_with(TEMP_ID_PREFIX)
            }

            /// The full id string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// First 8 characters — for human display only, not lookup.
            pub fn short(&self) -> &str {
                let end = self.0.len().min(8);
                &self.0[..end]
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<String> for $T {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $T {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<$T> for String {
            fn from(id: $T) -> String {
                id.0
            }
        }

        impl AsRef<str> for $T {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.short())
            }
        }
    };
}

impl_typed_id!(DocumentId, "DocumentId");
impl_typed_id!(BlockId, "BlockId");
impl_typed_id!(TaskId, "TaskId");
impl_typed_id!(CardId, "CardId");
impl_typed_id!(UserId, "UserId");
impl_typed_id!(ChangeId, "ChangeId");

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_unique() {
        let a = DocumentId::new();
        let b = DocumentId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_new_is_not_temp() {
        assert!(!DocumentId::new().is_temp());
        assert!(!BlockId::new().is_temp());
    }

    #[test]
    fn test_temp_carries_prefix() {
        let id = DocumentId::temp();
        assert!(id.is_temp());
        assert!(id.as_str().starts_with(TEMP_ID_PREFIX));
    }

    #[test]
    fn test_temp_is_unique() {
        assert_ne!(TaskId::temp(), TaskId::temp());
    }

    #[test]
    fn test_ordering_is_time_ordered() {
        let ids: Vec<BlockId> = (0..10).map(|_| BlockId::new()).collect();
        for i in 1..ids.len() {
            assert!(ids[i] >= ids[i - 1]);
        }
    }

    #[test]
    fn test_short_is_8_chars() {
        assert_eq!(DocumentId::new().short().len(), 8);
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = DocumentId::from("abc123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc123\"");
        let parsed: DocumentId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_debug_shows_type_and_short() {
        let id = UserId::from("0123456789abcdef");
        assert_eq!(format!("{:?}", id), "UserId(01234567)");
    }

    #[test]
    fn test_roundtrip_string() {
        let id = CardId::new();
        let s: String = id.clone().into();
        assert_eq!(CardId::from(s), id);
    }
}
