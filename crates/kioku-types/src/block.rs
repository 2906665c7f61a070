//! Rich-text block model.
//!
//! A [`Block`] is the atom the content differ operates on: an identified unit
//! of rich text with a closed kind tag, a generic property bag, an inline
//! span list, and recursive children. Identity (the block id) is what makes
//! two blocks "the same block" across edits — never array position.
//!
//! ## Design: closed tagged union, validated at the boundary
//!
//! The original design trusted arbitrary JSON for block content. Here the
//! kind is a closed enum and [`validate_blocks`] runs at the store/service
//! boundary, so everything past that boundary can assume well-formed blocks:
//! non-empty ids, sibling-unique ids, bounded nesting depth.

use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::EnumString;
use thiserror::Error;

use crate::ids::BlockId;

/// Maximum nesting depth for block children. Exceeding it almost certainly
/// means a construction bug or malicious payload, not a real document.
pub const MAX_BLOCK_DEPTH: usize = 16;

/// What a block *is*. Deliberately small and closed — presentation detail
/// (heading level, code language, todo checked state) lives in `props`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive, serialize_all = "snake_case")]
pub enum BlockKind {
    /// Plain paragraph.
    #[default]
    Paragraph,
    /// Heading (level in `props["level"]`).
    Heading,
    /// Bulleted list item.
    BulletedListItem,
    /// Numbered list item.
    NumberedListItem,
    /// Checkbox item (checked state in `props["checked"]`).
    Todo,
    /// Block quote.
    Quote,
    /// Code block (language in `props["language"]`).
    Code,
    /// Horizontal rule. Carries no content.
    Divider,
}

impl BlockKind {
    /// Parse from string (case-insensitive snake_case).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading => "heading",
            BlockKind::BulletedListItem => "bulleted_list_item",
            BlockKind::NumberedListItem => "numbered_list_item",
            BlockKind::Todo => "todo",
            BlockKind::Quote => "quote",
            BlockKind::Code => "code",
            BlockKind::Divider => "divider",
        }
    }
}

/// Style flags on an inline span.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InlineStyle {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub strikethrough: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub code: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl InlineStyle {
    /// True when no styling is applied (the common case — elided on the wire).
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

/// A run of text with uniform styling inside a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineSpan {
    pub text: String,
    #[serde(default, skip_serializing_if = "InlineStyle::is_plain")]
    pub style: InlineStyle,
}

impl InlineSpan {
    /// Unstyled text span.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: InlineStyle::default(),
        }
    }
}

/// An identified unit of rich-text content.
///
/// Equality is structural (derived `PartialEq` over the serialized fields),
/// which is what the differ uses to decide whether a block changed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    /// Kind-specific properties (heading level, checked state, language, …).
    /// Insertion-ordered so serialization is deterministic.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub props: IndexMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<InlineSpan>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

impl Block {
    /// Create an empty block of the given kind with a fresh id.
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: BlockId::new(),
            kind,
            props: IndexMap::new(),
            content: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a block holding a single unstyled text span.
    pub fn text(kind: BlockKind, text: impl Into<String>) -> Self {
        let mut block = Self::new(kind);
        block.content.push(InlineSpan::plain(text));
        block
    }

    /// Concatenated plain text of this block's spans (children excluded).
    pub fn plain_text(&self) -> String {
        self.content.iter().map(|s| s.text.as_str()).collect()
    }

    /// Set a property, returning self for chaining.
    pub fn with_prop(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.props.insert(key.into(), value);
        self
    }
}

/// Errors from block validation at the store/service boundary.
#[derive(Debug, Error)]
pub enum BlockError {
    #[error("block has an empty id")]
    EmptyId,
    #[error("duplicate block id among siblings: {0:?}")]
    DuplicateId(BlockId),
    #[error("block nesting exceeds {MAX_BLOCK_DEPTH} levels")]
    TooDeep,
}

/// Validate a block list: non-empty ids, sibling-unique ids, bounded depth.
///
/// Run at the boundary (local store `put`, server request handling) so code
/// past it can treat the invariants as given.
pub fn validate_blocks(blocks: &[Block]) -> Result<(), BlockError> {
    validate_level(blocks, 0)
}

fn validate_level(blocks: &[Block], depth: usize) -> Result<(), BlockError> {
    if depth > MAX_BLOCK_DEPTH {
        return Err(BlockError::TooDeep);
    }
    let mut seen = std::collections::HashSet::with_capacity(blocks.len());
    for block in blocks {
        if block.id.as_str().is_empty() {
            return Err(BlockError::EmptyId);
        }
        if !seen.insert(&block.id) {
            return Err(BlockError::DuplicateId(block.id.clone()));
        }
        validate_level(&block.children, depth + 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            BlockKind::Paragraph,
            BlockKind::Heading,
            BlockKind::BulletedListItem,
            BlockKind::NumberedListItem,
            BlockKind::Todo,
            BlockKind::Quote,
            BlockKind::Code,
            BlockKind::Divider,
        ] {
            assert_eq!(BlockKind::from_str(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_serde_uses_type_tag() {
        let block = Block::text(BlockKind::Heading, "Title").with_prop("level", 1.into());
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "heading");
        assert_eq!(json["props"]["level"], 1);
        // Plain style is elided entirely
        assert!(json["content"][0].get("style").is_none());
    }

    #[test]
    fn test_structural_equality_ignores_nothing() {
        let a = Block::text(BlockKind::Paragraph, "hello");
        let mut b = a.clone();
        assert_eq!(a, b);
        b.content[0].text.push('!');
        assert_ne!(a, b);
    }

    #[test]
    fn test_validate_accepts_nested() {
        let mut parent = Block::text(BlockKind::BulletedListItem, "outer");
        parent.children.push(Block::text(BlockKind::BulletedListItem, "inner"));
        validate_blocks(&[parent]).unwrap();
    }

    #[test]
    fn test_validate_rejects_duplicate_sibling_ids() {
        let a = Block::text(BlockKind::Paragraph, "one");
        let mut b = Block::text(BlockKind::Paragraph, "two");
        b.id = a.id.clone();
        assert!(matches!(
            validate_blocks(&[a, b]),
            Err(BlockError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_id() {
        let mut block = Block::new(BlockKind::Paragraph);
        block.id = BlockId::from("");
        assert!(matches!(validate_blocks(&[block]), Err(BlockError::EmptyId)));
    }

    #[test]
    fn test_validate_rejects_excessive_depth() {
        let mut block = Block::new(BlockKind::BulletedListItem);
        for _ in 0..(MAX_BLOCK_DEPTH + 1) {
            let mut outer = Block::new(BlockKind::BulletedListItem);
            outer.children.push(block);
            block = outer;
        }
        assert!(matches!(validate_blocks(&[block]), Err(BlockError::TooDeep)));
    }

    #[test]
    fn test_plain_text_concatenates_spans() {
        let mut block = Block::text(BlockKind::Paragraph, "hello ");
        block.content.push(InlineSpan {
            text: "world".to_string(),
            style: InlineStyle {
                bold: true,
                ..Default::default()
            },
        });
        assert_eq!(block.plain_text(), "hello world");
    }
}
