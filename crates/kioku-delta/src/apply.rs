//! Patch applier.
//!
//! Consumes the base block list and applies patches in order, producing the
//! patched list. Removes prefer identity lookup (the carried block's id) over
//! the recorded index, so earlier patches in the same batch shifting positions
//! cannot make a remove hit the wrong block.

use kioku_types::{Block, Patch, PatchOp};

use crate::error::DeltaError;

/// Apply `patches` to `base` in order.
///
/// - `add`: insert at the patch index, clamped to an append when the index is
///   past the end.
/// - `replace`: overwrite the block at the patch index; out of bounds is an
///   error.
/// - `remove` with a value: find the block with the same id and remove it;
///   if the id is gone already this is a no-op (the state the patch wanted
///   is already true).
/// - `remove` without a value: positional remove; out of bounds is an error.
pub fn apply_patches(base: Vec<Block>, patches: &[Patch]) -> Result<Vec<Block>, DeltaError> {
    let mut blocks = base;

    for patch in patches {
        let idx = patch.index();
        match patch.op {
            PatchOp::Add => {
                let value = patch
                    .value
                    .clone()
                    .ok_or(DeltaError::MissingValue(PatchOp::Add))?;
                if idx >= blocks.len() {
                    blocks.push(value);
                } else {
                    blocks.insert(idx, value);
                }
            }
            PatchOp::Replace => {
                let value = patch
                    .value
                    .clone()
                    .ok_or(DeltaError::MissingValue(PatchOp::Replace))?;
                if idx >= blocks.len() {
                    return Err(DeltaError::IndexOutOfBounds {
                        index: idx,
                        len: blocks.len(),
                    });
                }
                blocks[idx] = value;
            }
            PatchOp::Remove => match &patch.value {
                Some(value) => {
                    match blocks.iter().position(|b| b.id == value.id) {
                        Some(pos) => {
                            blocks.remove(pos);
                        }
                        None => {
                            tracing::debug!(block = %value.id, "remove target already gone");
                        }
                    }
                }
                None => {
                    if idx >= blocks.len() {
                        return Err(DeltaError::IndexOutOfBounds {
                            index: idx,
                            len: blocks.len(),
                        });
                    }
                    blocks.remove(idx);
                }
            },
        }
    }

    Ok(blocks)
}
