//! Sync service: the only surface the UI layer touches
//!
//! User action flow: optimistic write to the local store, enqueue, and the
//! triggers eventually drain the queue. Remote changes arrive independently
//! via delta sync. Queue drain and delta pull may run concurrently with
//! each other but each is serialized against itself. Errors never escape as
//! panics; they land in `status`, `last_error` and the event channel.

mod delta;
mod queue;
mod scheduler;
mod status;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{mpsc, watch, Mutex};

pub use scheduler::{SchedulerHandle, SyncScheduler, Trigger};
pub use status::{DrainReport, PullReport, SyncEvent, SyncStatus};

use crate::api::ApiClient;
use crate::db::{Database, MetaStore, QueueStore, RecordStore};
use crate::error::{Error, Result};
use crate::models::{DomainRecord, Operation, QueueEntry, RecordId, RecordKind, SyncRecord};

/// Combined result of a full `sync_now` pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub drain: DrainReport,
    pub pull: PullReport,
}

/// Orchestrates the mutation queue, delta sync and status reporting
pub struct SyncService {
    db: Arc<Database>,
    client: ApiClient,
    workspace_id: String,
    status_tx: watch::Sender<SyncStatus>,
    events_tx: mpsc::UnboundedSender<SyncEvent>,
    events_rx: StdMutex<Option<mpsc::UnboundedReceiver<SyncEvent>>>,
    drain_lock: Mutex<()>,
    pull_lock: Mutex<()>,
    online: AtomicBool,
    suspended: AtomicBool,
    last_error: StdMutex<Option<String>>,
}

impl SyncService {
    /// Create a service for one workspace
    ///
    /// Starts online and idle; nothing syncs until a trigger fires.
    pub fn new(db: Arc<Database>, client: ApiClient, workspace_id: impl Into<String>) -> Self {
        let (status_tx, _) = watch::channel(SyncStatus::Idle);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            db,
            client,
            workspace_id: workspace_id.into(),
            status_tx,
            events_tx,
            events_rx: StdMutex::new(Some(events_rx)),
            drain_lock: Mutex::new(()),
            pull_lock: Mutex::new(()),
            online: AtomicBool::new(true),
            suspended: AtomicBool::new(false),
            last_error: StdMutex::new(None),
        }
    }

    /// The workspace this service syncs
    #[must_use]
    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    // ---- optimistic local writes -------------------------------------

    /// Create a record locally and queue it for the server
    ///
    /// Returns immediately after the durable enqueue; no network I/O.
    pub async fn create<T: DomainRecord>(&self, model: T) -> Result<SyncRecord> {
        let record = model.into_record(&self.workspace_id)?;
        let conn = self.db.connection();
        RecordStore::new(conn).save(&record).await?;
        QueueStore::new(conn)
            .enqueue(Operation::Create, &record)
            .await?;
        tracing::debug!(kind = %record.kind, record = %record.id, "Queued create");
        Ok(record)
    }

    /// Update a record locally and queue the new snapshot
    pub async fn update<T: DomainRecord>(&self, id: RecordId, model: T) -> Result<SyncRecord> {
        let conn = self.db.connection();
        let store = RecordStore::new(conn);
        let mut record = store
            .get(T::KIND, &id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        record.touch_with(serde_json::to_value(model)?);
        store.save(&record).await?;
        QueueStore::new(conn)
            .enqueue(Operation::Update, &record)
            .await?;
        tracing::debug!(kind = %record.kind, record = %record.id, "Queued update");
        Ok(record)
    }

    /// Soft-delete a record locally and queue the tombstone
    pub async fn delete(&self, kind: RecordKind, id: RecordId) -> Result<SyncRecord> {
        let conn = self.db.connection();
        let record = RecordStore::new(conn).soft_delete(kind, &id).await?;
        QueueStore::new(conn)
            .enqueue(Operation::Delete, &record)
            .await?;
        tracing::debug!(kind = %record.kind, record = %record.id, "Queued delete");
        Ok(record)
    }

    // ---- sync passes --------------------------------------------------

    /// Drain the mutation queue; serialized against concurrent drains
    pub async fn process_queue(&self) -> Result<DrainReport> {
        let _guard = self.drain_lock.lock().await;

        if self.is_suspended() {
            return Err(Error::SyncSuspended);
        }
        if !self.is_online() {
            self.set_status(SyncStatus::Offline);
            let remaining = self.pending_count().await?;
            return Ok(DrainReport {
                remaining,
                ..DrainReport::default()
            });
        }

        self.set_status(SyncStatus::Syncing);
        let report = queue::drain_queue(self.db.connection(), &self.client, &self.events_tx).await;
        match &report {
            Ok(report) => self.settle_drain(report),
            Err(e) => self.settle_failure(&e.to_string()),
        }
        report
    }

    /// Pull remote changes since the checkpoint; serialized against itself
    pub async fn delta_sync(&self) -> Result<PullReport> {
        let _guard = self.pull_lock.lock().await;

        if self.is_suspended() {
            return Err(Error::SyncSuspended);
        }
        if !self.is_online() {
            self.set_status(SyncStatus::Offline);
            return Ok(PullReport::default());
        }

        self.set_status(SyncStatus::Syncing);
        let report = delta::delta_sync(self.db.connection(), &self.client, &self.workspace_id).await;
        match &report {
            Ok(_) => self.settle_ok(),
            Err(Error::Api(crate::api::ApiError::Unauthorized)) => self.suspend(),
            Err(e) => self.settle_failure(&e.to_string()),
        }
        report
    }

    /// Push pending mutations, then pull remote changes
    pub async fn sync_now(&self) -> Result<SyncReport> {
        let drain = self.process_queue().await?;
        let pull = self.delta_sync().await?;
        Ok(SyncReport { drain, pull })
    }

    /// Drop the checkpoint and re-pull the full history
    pub async fn full_resync(&self) -> Result<PullReport> {
        MetaStore::new(self.db.connection())
            .reset_checkpoint(&self.workspace_id)
            .await?;
        self.delta_sync().await
    }

    // ---- read-only surface -------------------------------------------

    /// Number of queued local writes; side-effect-free (UI badge)
    pub async fn pending_count(&self) -> Result<usize> {
        QueueStore::new(self.db.connection()).pending_count().await
    }

    /// Pending entries in send order (queue inspection)
    pub async fn pending_entries(&self) -> Result<Vec<QueueEntry>> {
        QueueStore::new(self.db.connection()).entries().await
    }

    /// Current status snapshot
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        *self.status_tx.borrow()
    }

    /// Watch status transitions (idle/syncing/error/offline)
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    /// Message of the most recent failure, if the service is in error
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().map(|g| g.clone()).unwrap_or(None)
    }

    /// Take the drop-level event receiver (toast channel); single consumer
    #[must_use]
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<SyncEvent>> {
        self.events_rx.lock().map(|mut g| g.take()).unwrap_or(None)
    }

    // ---- connectivity and auth ---------------------------------------

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Record a connectivity change; the scheduler calls this on
    /// reconnect/disconnect triggers
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        if online {
            if self.status() == SyncStatus::Offline {
                self.set_status(SyncStatus::Idle);
            }
        } else {
            self.set_status(SyncStatus::Offline);
        }
    }

    /// Whether a 401 has suspended sync
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    /// Clear the auth suspension after the user re-authenticated
    pub fn clear_auth_error(&self) {
        self.suspended.store(false, Ordering::SeqCst);
        self.set_status(SyncStatus::Idle);
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = None;
        }
    }

    // ---- internals ----------------------------------------------------

    fn set_status(&self, status: SyncStatus) {
        self.status_tx.send_replace(status);
    }

    fn settle_drain(&self, report: &DrainReport) {
        if report.auth_required {
            self.suspend();
        } else if let Some(message) = &report.stalled {
            self.settle_failure(message);
        } else {
            self.settle_ok();
        }
    }

    fn settle_ok(&self) {
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = None;
        }
        self.set_status(SyncStatus::Idle);
    }

    fn settle_failure(&self, message: &str) {
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = Some(message.to_string());
        }
        self.set_status(SyncStatus::Error);
    }

    fn suspend(&self) {
        self.suspended.store(true, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = Some("authentication required".to_string());
        }
        self.set_status(SyncStatus::Error);
        self.events_tx.send(SyncEvent::AuthRequired).ok();
        tracing::warn!("Sync suspended: server returned 401");
    }
}
