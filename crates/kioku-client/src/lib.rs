//! Offline-first sync client for kioku.
//!
//! Two cooperating pieces:
//!
//! - [`SyncSession`] — local-first mutations: every create/update/delete
//!   lands in the durable store immediately and queues a pending change;
//!   [`SyncSession::sync_all`] reconciles the whole document set with the
//!   server and promotes temp ids.
//! - [`SchedulerHandle`] — the debounced per-document flush loop: edits
//!   accumulate for [`SYNC_DEBOUNCE`] after the last keystroke, then ship as
//!   either a patch batch or a full update depending on serialized size.

pub mod error;
pub mod pending;
pub mod scheduler;
pub mod session;

pub use error::ClientError;
pub use pending::{AckedBase, PendingEdit};
pub use scheduler::{SYNC_DEBOUNCE, SchedulerHandle};
pub use session::{SyncOutcome, SyncSession};
