//! Request validation, applied before any persistence.
//!
//! Rejections here are all-or-nothing: a request that fails validation has
//! touched no rows. Block structure is validated at this boundary (unique
//! sibling ids, bounded depth) rather than trusted as opaque JSON.

use kioku_types::{Block, BulkSyncRequest, PatchRequest, UpdateRequest, validate_blocks};

use crate::error::ServiceError;

/// Serialized bulk-sync payload cap.
pub const MAX_SYNC_BODY_BYTES: usize = 1_000_000;

/// Per-request caps on collection sizes.
pub const MAX_PROJECTS_PER_SYNC: usize = 500;
pub const MAX_PATCHES_PER_REQUEST: usize = 500;
pub const MAX_TITLE_LEN: usize = 512;

pub fn check_patch_request(req: &PatchRequest) -> Result<(), ServiceError> {
    if req.patches.is_empty() {
        return Err(ServiceError::Validation("empty patch list".into()));
    }
    if req.patches.len() > MAX_PATCHES_PER_REQUEST {
        return Err(ServiceError::Validation(format!(
            "too many patches: {} > {MAX_PATCHES_PER_REQUEST}",
            req.patches.len()
        )));
    }
    for patch in &req.patches {
        if let Some(block) = &patch.value {
            check_blocks(std::slice::from_ref(block))?;
        }
    }
    Ok(())
}

pub fn check_update_request(req: &UpdateRequest) -> Result<(), ServiceError> {
    if req.is_empty() {
        return Err(ServiceError::Validation("no fields to update".into()));
    }
    if let Some(title) = &req.title {
        check_title(title)?;
    }
    if let Some(content) = &req.content {
        check_blocks(content)?;
    }
    Ok(())
}

pub fn check_bulk_request(req: &BulkSyncRequest) -> Result<(), ServiceError> {
    if req.projects.len() > MAX_PROJECTS_PER_SYNC {
        return Err(ServiceError::Validation(format!(
            "too many projects: {} > {MAX_PROJECTS_PER_SYNC}",
            req.projects.len()
        )));
    }
    let size = serde_json::to_vec(req).map(|v| v.len()).unwrap_or(usize::MAX);
    if size > MAX_SYNC_BODY_BYTES {
        return Err(ServiceError::Validation(format!(
            "payload too large: {size} > {MAX_SYNC_BODY_BYTES} bytes"
        )));
    }
    for record in &req.projects {
        if record.deleted {
            continue; // tombstones carry no content worth checking
        }
        check_title(&record.title)?;
        if let Some(content) = &record.content {
            check_blocks(content)?;
        }
    }
    Ok(())
}

fn check_title(title: &str) -> Result<(), ServiceError> {
    if title.len() > MAX_TITLE_LEN {
        return Err(ServiceError::Validation(format!(
            "title too long: {} > {MAX_TITLE_LEN} bytes",
            title.len()
        )));
    }
    Ok(())
}

fn check_blocks(blocks: &[Block]) -> Result<(), ServiceError> {
    validate_blocks(blocks).map_err(|e| ServiceError::Validation(e.to_string()))
}
