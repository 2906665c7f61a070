//! In-process transport.
//!
//! Binds [`ReconcileService`] directly behind the [`SyncTransport`] trait so
//! single-process deployments and integration tests run the real service
//! without a network layer. A production deployment would put HTTP (or
//! similar) behind the same trait with the same error mapping.

use std::sync::Arc;

use async_trait::async_trait;

use kioku_types::{
    BulkSyncRequest, BulkSyncResponse, Document, DocumentId, PatchRequest, PatchResponse,
    SyncTransport, TransportError, UpdateRequest, UserId,
};

use crate::error::ServiceError;
use crate::service::ReconcileService;

/// [`SyncTransport`] that calls the service in the same process.
#[derive(Clone)]
pub struct InProcessTransport {
    service: Arc<ReconcileService>,
}

impl InProcessTransport {
    pub fn new(service: Arc<ReconcileService>) -> Self {
        Self { service }
    }
}

fn map_err(err: ServiceError) -> TransportError {
    match err {
        ServiceError::Validation(msg) => TransportError::Rejected(msg),
        ServiceError::AccessDenied => TransportError::Denied,
        // Internal failures look like an unreachable server: the client
        // keeps its pending changes and retries next cycle.
        other => TransportError::Network(other.to_string()),
    }
}

#[async_trait]
impl SyncTransport for InProcessTransport {
    async fn apply_patches(
        &self,
        user: &UserId,
        req: PatchRequest,
    ) -> Result<PatchResponse, TransportError> {
        self.service.apply_patches(user, req).map_err(map_err)
    }

    async fn update_document(
        &self,
        user: &UserId,
        req: UpdateRequest,
    ) -> Result<Document, TransportError> {
        self.service.update_document(user, req).map_err(map_err)
    }

    async fn bulk_sync(
        &self,
        user: &UserId,
        req: BulkSyncRequest,
    ) -> Result<BulkSyncResponse, TransportError> {
        self.service.bulk_sync(user, req).map_err(map_err)
    }

    async fn delete_document(
        &self,
        user: &UserId,
        id: &DocumentId,
    ) -> Result<(), TransportError> {
        self.service.delete_document(user, id).map_err(map_err)
    }
}
