//! Patch batch optimizer.
//!
//! Collapses redundant operations accumulated across a debounce window so a
//! burst of edits to one block ships as a single patch. Patches are keyed by
//! the block they target (the carried value's id; the path for valueless
//! removes), never by index alone — a remove of one block resolves in old
//! coordinates while an add/replace of another resolves in new coordinates,
//! and the two must not collide just because the indices match. Last write
//! to a block wins, and a remove cancels an earlier add of the same block
//! outright (the block never existed as far as the server knows).

use indexmap::IndexMap;
use kioku_types::{Patch, PatchOp};

/// Collapse a patch batch. Output order follows first-touch order of each
/// surviving target, and output length never exceeds input length.
pub fn optimize_patches(patches: &[Patch]) -> Vec<Patch> {
    let mut by_target: IndexMap<String, Patch> = IndexMap::with_capacity(patches.len());

    for patch in patches {
        let key = target_key(patch);
        match patch.op {
            PatchOp::Add | PatchOp::Replace => {
                // IndexMap::insert keeps the original position for an
                // existing key, so repeated edits stay where they started.
                by_target.insert(key, patch.clone());
            }
            PatchOp::Remove => {
                match by_target.get(&key) {
                    Some(prior) if prior.op == PatchOp::Add => {
                        // Add then remove: the pair annihilates.
                        by_target.shift_remove(&key);
                    }
                    _ => {
                        by_target.insert(key, patch.clone());
                    }
                }
            }
        }
    }

    by_target.into_values().collect()
}

/// Collapse key: the id of the block the patch targets, falling back to the
/// path for removes that carry no value.
fn target_key(patch: &Patch) -> String {
    match &patch.value {
        Some(block) => block.id.as_str().to_string(),
        None => patch.path_key(),
    }
}
