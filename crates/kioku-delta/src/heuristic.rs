//! Patch-versus-full-content decision.
//!
//! Serialized byte sizes decide which wire shape a flush uses. For small
//! documents a full update is often cheaper than the patch machinery; for
//! large documents any patch smaller than the content wins outright.

use kioku_types::{Block, Patch};

/// Content strictly above this serialized size always prefers patches (when
/// the patches are smaller at all); at or below it the ratio rule applies.
pub const LARGE_CONTENT_BYTES: usize = 10_000;

/// Below the large-content cutoff, patches must be under this fraction of the
/// full content size to be worth sending.
pub const PATCH_SIZE_RATIO: f64 = 0.5;

/// Decide whether to send `patches` instead of the full `content`.
///
/// Returns `false` when either input is empty: no patches means nothing to
/// send, and empty content makes a full update trivially cheap.
pub fn should_use_patch(patches: &[Patch], content: &[Block]) -> bool {
    if patches.is_empty() || content.is_empty() {
        return false;
    }

    // A failed patch serialization maxes the size out so the full update
    // path wins; failed content serialization zeroes it for the same effect.
    let patch_size = serde_json::to_vec(patches).map(|v| v.len()).unwrap_or(usize::MAX);
    let content_size = serde_json::to_vec(content).map(|v| v.len()).unwrap_or(0);

    if content_size > LARGE_CONTENT_BYTES {
        return patch_size < content_size;
    }

    (patch_size as f64) < (content_size as f64) * PATCH_SIZE_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;
    use kioku_types::BlockKind;

    fn para(text: &str) -> Block {
        Block::text(BlockKind::Paragraph, text)
    }

    fn big_doc() -> Vec<Block> {
        // Comfortably over LARGE_CONTENT_BYTES once serialized.
        (0..100).map(|i| para(&format!("line {i} {}", "x".repeat(120)))).collect()
    }

    /// The same block with its text swapped for `text_len` filler bytes.
    fn revised(block: &Block, text_len: usize) -> Block {
        let mut b = block.clone();
        b.content[0].text = "y".repeat(text_len);
        b
    }

    #[test]
    fn test_empty_patches_never_patch() {
        assert!(!should_use_patch(&[], &[para("a")]));
    }

    #[test]
    fn test_empty_content_never_patch() {
        assert!(!should_use_patch(&[Patch::replace(0, para("a"))], &[]));
    }

    #[test]
    fn test_small_doc_needs_clear_win() {
        // One replace against a two-block doc: patch carries a whole block
        // plus envelope, so it cannot get under half the content size.
        let content = vec![para("a"), para("b")];
        let patches = vec![Patch::replace(0, para("a edited"))];
        assert!(!should_use_patch(&patches, &content));
    }

    #[test]
    fn test_large_doc_single_edit_prefers_patch() {
        let content = big_doc();
        let patches = vec![Patch::replace(0, content[0].clone())];
        assert!(should_use_patch(&patches, &content));
    }

    #[test]
    fn test_large_doc_rewrite_prefers_full() {
        // Patches that replace every block are bigger than the content
        // itself, so the full update wins even on a large doc.
        let content = big_doc();
        let patches: Vec<Patch> = content
            .iter()
            .enumerate()
            .map(|(i, b)| Patch::replace(i, b.clone()))
            .collect();
        assert!(!should_use_patch(&patches, &content));
    }

    #[test]
    fn test_exact_cutoff_uses_ratio_rule() {
        // Pad a single block so the content serializes to exactly the
        // cutoff: the ratio rule must still govern, so a patch between half
        // and full content size loses.
        let mut block = para("");
        let envelope = serde_json::to_vec(&[block.clone()]).unwrap().len();
        block.content[0].text = "x".repeat(LARGE_CONTENT_BYTES - envelope);
        let content = vec![block.clone()];
        assert_eq!(
            serde_json::to_vec(&content).unwrap().len(),
            LARGE_CONTENT_BYTES
        );

        let patches = vec![Patch::replace(0, revised(&block, 6_500))];
        let patch_size = serde_json::to_vec(&patches).unwrap().len();
        assert!(patch_size > LARGE_CONTENT_BYTES / 2);
        assert!(patch_size < LARGE_CONTENT_BYTES);
        assert!(!should_use_patch(&patches, &content));
    }

    #[test]
    fn test_small_doc_tiny_patch_wins() {
        // ~40 blocks keeps the doc under the cutoff while leaving a lone
        // remove patch well under half its size.
        let content: Vec<Block> = (0..40).map(|i| para(&format!("paragraph {i}"))).collect();
        let json = serde_json::to_vec(&content).unwrap();
        assert!(json.len() < LARGE_CONTENT_BYTES);

        let patches = vec![Patch::remove(3, Some(content[3].clone()))];
        assert!(should_use_patch(&patches, &content));
    }
}
