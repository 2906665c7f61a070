//! Patches: single-index changes to a block list.
//!
//! Paths are single-element by design — nested edits are represented as a
//! `replace` of the containing top-level block, not a deep path.

use serde::{Deserialize, Serialize};

use crate::block::Block;

/// Patch operation kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Replace,
    Remove,
}

/// One add/replace/remove at a single index in a block list.
///
/// `remove` patches carry the removed block as `value` so the applier can
/// locate the element by identity even after earlier patches shifted
/// indices; a `remove` without a value degrades to positional removal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub op: PatchOp,
    pub path: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Block>,
}

impl Patch {
    pub fn add(index: usize, value: Block) -> Self {
        Self {
            op: PatchOp::Add,
            path: vec![index],
            value: Some(value),
        }
    }

    pub fn replace(index: usize, value: Block) -> Self {
        Self {
            op: PatchOp::Replace,
            path: vec![index],
            value: Some(value),
        }
    }

    pub fn remove(index: usize, value: Option<Block>) -> Self {
        Self {
            op: PatchOp::Remove,
            path: vec![index],
            value,
        }
    }

    /// The single index this patch targets.
    pub fn index(&self) -> usize {
        self.path.first().copied().unwrap_or(0)
    }

    /// Path joined with `/` — the optimizer's collapse key.
    pub fn path_key(&self) -> String {
        self.path
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// A forward patch list with its recorded inverses (undo material).
///
/// Applying `forward` to the old list yields the new list; applying
/// `inverse` to the new list walks back.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchSet {
    pub forward: Vec<Patch>,
    pub inverse: Vec<Patch>,
}

impl PatchSet {
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Record a forward patch together with its inverse.
    pub fn push(&mut self, forward: Patch, inverse: Patch) {
        self.forward.push(forward);
        self.inverse.push(inverse);
    }
}
