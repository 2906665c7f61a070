//! Server-side reconciliation for kioku.
//!
//! [`ReconcileService`] owns the authoritative project store and exposes the
//! three sync operations: versioned patch application, full-field updates,
//! and last-write-wins bulk sync. [`InProcessTransport`] puts the service
//! behind the client's transport trait for single-process embedding and
//! integration tests.

pub mod db;
pub mod error;
pub mod service;
pub mod transport;
pub mod validate;

pub use db::ProjectDb;
pub use error::ServiceError;
pub use service::ReconcileService;
pub use transport::InProcessTransport;
pub use validate::{MAX_PATCHES_PER_REQUEST, MAX_PROJECTS_PER_SYNC, MAX_SYNC_BODY_BYTES};
