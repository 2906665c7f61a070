//! Debounced sync scheduler.
//!
//! One actor owns all per-document flush state and processes commands
//! sequentially from an mpsc channel; [`SchedulerHandle`] is the `Send+Sync`
//! face the rest of the app talks to.
//!
//! ```text
//!   SchedulerHandle             mpsc      SyncScheduler (tokio task)
//!   ┌───────────────────┐   ────────▶   ┌────────────────────────────┐
//!   │ .record_edit()    │               │ pending edits per document │
//!   │ .flush_now()      │   ◀────────   │ cancellable debounce timer │
//!   │ .flush_all()      │    oneshot    │ patch / full-update choice │
//!   └───────────────────┘               └────────────────────────────┘
//! ```
//!
//! Per document: `idle → pending (edit) → (timer) → flushing → idle`.
//! An edit (re)arms a debounce timer; when it fires — or on `flush_all`,
//! the flush-on-exit path — the scheduler diffs the pending content against
//! the last server-acknowledged base, optimizes the patches, and sends
//! either a patch request or a full update depending on serialized size. A
//! version conflict falls straight back to a full update (the local copy is
//! authoritative for user intent); a transport failure leaves the pending
//! edit in place for the next cycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use kioku_delta::{diff_blocks, optimize_patches, should_use_patch};
use kioku_store::LocalStore;
use kioku_types::{Block, DocumentId, PatchRequest, SyncTransport, UserId};

use crate::error::ClientError;
use crate::pending::{AckedBase, PendingEdit};

/// Quiet period after the last edit before a flush fires.
pub const SYNC_DEBOUNCE: Duration = Duration::from_secs(2);

// ============================================================================
// Commands (internal)
// ============================================================================

enum SchedulerCommand {
    Acknowledge {
        id: DocumentId,
        blocks: Vec<Block>,
        version: u64,
    },
    RecordEdit {
        id: DocumentId,
        edit: PendingEdit,
    },
    TimerFired {
        id: DocumentId,
        generation: u64,
    },
    FlushNow {
        id: DocumentId,
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
    FlushAll {
        reply: oneshot::Sender<()>,
    },
    Cancel {
        id: DocumentId,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

// ============================================================================
// Handle
// ============================================================================

/// Cloneable handle to the scheduler actor.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<SchedulerCommand>,
}

impl SchedulerHandle {
    /// Spawn the scheduler actor and return its handle.
    pub fn spawn(
        store: Arc<dyn LocalStore>,
        transport: Arc<dyn SyncTransport>,
        user: UserId,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = SyncScheduler {
            store,
            transport,
            user,
            docs: HashMap::new(),
            tx: tx.clone(),
            rx,
        };
        tokio::spawn(actor.run());
        Self { tx }
    }

    fn send(&self, cmd: SchedulerCommand) -> Result<(), ClientError> {
        self.tx.send(cmd).map_err(|_| ClientError::Shutdown)
    }

    /// Record the server-confirmed content and version for a document.
    ///
    /// Call after loading a document from the server or after a bulk sync —
    /// patches for later edits are generated against this base.
    pub fn acknowledge(
        &self,
        id: DocumentId,
        blocks: Vec<Block>,
        version: u64,
    ) -> Result<(), ClientError> {
        self.send(SchedulerCommand::Acknowledge {
            id,
            blocks,
            version,
        })
    }

    /// Merge an edit into the document's pending state and (re)arm the
    /// debounce timer.
    pub fn record_edit(&self, id: DocumentId, edit: PendingEdit) -> Result<(), ClientError> {
        self.send(SchedulerCommand::RecordEdit { id, edit })
    }

    /// Flush one document immediately, bypassing the debounce.
    pub async fn flush_now(&self, id: DocumentId) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(SchedulerCommand::FlushNow { id, reply })?;
        rx.await.map_err(|_| ClientError::Shutdown)?
    }

    /// Flush every document with pending edits (the flush-on-exit path).
    ///
    /// Best-effort: individual failures are logged and their edits stay
    /// queued, they do not abort the sweep.
    pub async fn flush_all(&self) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(SchedulerCommand::FlushAll { reply })?;
        rx.await.map_err(|_| ClientError::Shutdown)
    }

    /// Cancel the document's armed timer. Pending edits are kept and will
    /// ride along with the next flush.
    pub fn cancel(&self, id: DocumentId) -> Result<(), ClientError> {
        self.send(SchedulerCommand::Cancel { id })
    }

    /// Flush everything and stop the actor.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(SchedulerCommand::Shutdown { reply })?;
        rx.await.map_err(|_| ClientError::Shutdown)
    }
}

// ============================================================================
// Actor
// ============================================================================

#[derive(Default)]
struct DocState {
    base: AckedBase,
    pending: PendingEdit,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

struct SyncScheduler {
    store: Arc<dyn LocalStore>,
    transport: Arc<dyn SyncTransport>,
    user: UserId,
    docs: HashMap<DocumentId, DocState>,
    tx: mpsc::UnboundedSender<SchedulerCommand>,
    rx: mpsc::UnboundedReceiver<SchedulerCommand>,
}

impl SyncScheduler {
    async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                SchedulerCommand::Acknowledge {
                    id,
                    blocks,
                    version,
                } => {
                    let state = self.docs.entry(id).or_default();
                    state.base = AckedBase { blocks, version };
                }
                SchedulerCommand::RecordEdit { id, edit } => {
                    self.record_edit(id, edit);
                }
                SchedulerCommand::TimerFired { id, generation } => {
                    let live = self
                        .docs
                        .get(&id)
                        .is_some_and(|s| s.generation == generation);
                    if !live {
                        continue; // superseded by a later edit
                    }
                    if let Err(err) = self.flush(&id).await {
                        tracing::warn!(doc = %id, %err, "flush failed, edits retained");
                    }
                }
                SchedulerCommand::FlushNow { id, reply } => {
                    let _ = reply.send(self.flush(&id).await);
                }
                SchedulerCommand::FlushAll { reply } => {
                    self.flush_all().await;
                    let _ = reply.send(());
                }
                SchedulerCommand::Cancel { id } => {
                    if let Some(state) = self.docs.get_mut(&id) {
                        state.generation += 1;
                        if let Some(timer) = state.timer.take() {
                            timer.abort();
                        }
                    }
                }
                SchedulerCommand::Shutdown { reply } => {
                    self.flush_all().await;
                    let _ = reply.send(());
                    break;
                }
            }
        }
    }

    fn record_edit(&mut self, id: DocumentId, edit: PendingEdit) {
        let state = self.docs.entry(id.clone()).or_default();
        state.pending.merge(edit);

        // Re-arm: bump the generation so an already-fired timer message is
        // recognized as stale, and abort the sleeping task outright.
        state.generation += 1;
        let generation = state.generation;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        let tx = self.tx.clone();
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(SYNC_DEBOUNCE).await;
            let _ = tx.send(SchedulerCommand::TimerFired { id, generation });
        }));
    }

    async fn flush_all(&mut self) {
        let dirty: Vec<DocumentId> = self
            .docs
            .iter()
            .filter(|(_, s)| !s.pending.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        for id in dirty {
            if let Err(err) = self.flush(&id).await {
                tracing::warn!(doc = %id, %err, "flush failed, edits retained");
            }
        }
    }

    /// Flush one document's pending edits to the server.
    async fn flush(&mut self, id: &DocumentId) -> Result<(), ClientError> {
        let (pending, base) = match self.docs.get_mut(id) {
            Some(state) => {
                state.generation += 1;
                if let Some(timer) = state.timer.take() {
                    timer.abort();
                }
                if state.pending.is_empty() {
                    return Ok(());
                }
                (state.pending.clone(), state.base.clone())
            }
            None => return Ok(()),
        };

        // Temp-id documents are held purely locally; bulk sync creates them
        // server-side and promotes the id.
        if id.is_temp() {
            tracing::debug!(doc = %id, "temp document, deferring to bulk sync");
            return Ok(());
        }

        let new_base = self.flush_remote(id, &pending, &base).await?;

        if let Some(state) = self.docs.get_mut(id) {
            state.base = new_base;
            state.pending = PendingEdit::default();
        }
        Ok(())
    }

    /// Send the pending edit over the wire, choosing patch vs full update.
    /// Returns the new server-acknowledged base.
    async fn flush_remote(
        &self,
        id: &DocumentId,
        pending: &PendingEdit,
        base: &AckedBase,
    ) -> Result<AckedBase, ClientError> {
        if let Some(content) = &pending.content {
            let patches = optimize_patches(&diff_blocks(&base.blocks, content).forward);
            let content_only = pending.title.is_none()
                && pending.description.is_none()
                && pending.status.is_none()
                && pending.favorite.is_none()
                && pending.due_date.is_none();

            if content_only && should_use_patch(&patches, content) {
                let req = PatchRequest {
                    id: id.clone(),
                    patches,
                    base_version: base.version,
                };
                let resp = self.transport.apply_patches(&self.user, req).await?;
                if resp.success {
                    tracing::debug!(doc = %id, version = resp.current_version, "patches applied");
                    self.bump_local_version(id, resp.current_version)?;
                    return Ok(AckedBase {
                        blocks: content.clone(),
                        version: resp.current_version,
                    });
                }
                // Conflict: the local copy is authoritative for user intent,
                // so overwrite via the full-update path instead.
                tracing::warn!(
                    doc = %id,
                    base = base.version,
                    current = resp.current_version,
                    "version conflict, falling back to full update"
                );
            }
        }

        let req = pending.to_update_request(id.clone());
        let doc = self.transport.update_document(&self.user, req).await?;
        let base = AckedBase {
            blocks: doc.blocks.clone(),
            version: doc.content_version,
        };
        self.store.put(&doc)?;
        Ok(base)
    }

    /// Record the server's new content version on the stored document.
    fn bump_local_version(&self, id: &DocumentId, version: u64) -> Result<(), ClientError> {
        if let Some(mut doc) = self.store.get(id)? {
            doc.content_version = version;
            self.store.put(&doc)?;
        }
        Ok(())
    }
}
