//! Sync triggers
//!
//! Decides *when* to drain the queue and run delta sync. Policy:
//! a fixed interval while online, queue drain on reconnect, queue drain on
//! visibility gain only when something is pending, and a best-effort
//! bounded drain on shutdown. Deliberately no sync on startup (the local
//! store may still be hydrating) and no sync per mutation; batching is the
//! backpressure.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::SyncService;

/// Grace period for the shutdown drain
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// External events that wake the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Network came back; drain the queue
    Reconnect,
    /// Network went away; stop interval syncs until reconnect
    ConnectionLost,
    /// Window/tab became active; drain only if something is pending
    Visible,
    /// Process is exiting; best-effort drain, then stop
    Shutdown,
}

/// Owns the trigger policy for one [`SyncService`]
pub struct SyncScheduler {
    service: Arc<SyncService>,
    interval: Duration,
}

/// Handle for feeding triggers into a running scheduler
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<Trigger>,
    task: JoinHandle<()>,
}

impl SyncScheduler {
    /// Create a scheduler with the given periodic interval
    #[must_use]
    pub const fn new(service: Arc<SyncService>, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// Spawn the scheduler loop
    pub fn spawn(self) -> SchedulerHandle {
        let (tx, mut rx) = mpsc::unbounded_channel::<Trigger>();
        let service = self.service;
        let interval = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // Consume the immediate first tick: no sync on startup.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if service.is_online() && !service.is_suspended() {
                            if let Err(e) = service.sync_now().await {
                                tracing::warn!(error = %e, "Periodic sync failed");
                            }
                        }
                    }
                    trigger = rx.recv() => {
                        match trigger {
                            Some(Trigger::Reconnect) => {
                                service.set_online(true);
                                if let Err(e) = service.process_queue().await {
                                    tracing::warn!(error = %e, "Reconnect drain failed");
                                }
                            }
                            Some(Trigger::ConnectionLost) => {
                                service.set_online(false);
                            }
                            Some(Trigger::Visible) => {
                                // Avoid a wasted request when nothing is queued.
                                let pending = service.pending_count().await.unwrap_or(0);
                                if pending > 0 {
                                    if let Err(e) = service.process_queue().await {
                                        tracing::warn!(error = %e, "Visibility drain failed");
                                    }
                                }
                            }
                            Some(Trigger::Shutdown) | None => {
                                // Best effort; an in-flight send past the grace
                                // period is abandoned.
                                let drain = service.process_queue();
                                if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
                                    tracing::warn!("Shutdown drain timed out");
                                }
                                break;
                            }
                        }
                    }
                }
            }
        });

        SchedulerHandle { tx, task }
    }
}

impl SchedulerHandle {
    /// Signal that connectivity was regained
    pub fn reconnected(&self) {
        self.tx.send(Trigger::Reconnect).ok();
    }

    /// Signal that connectivity was lost
    pub fn connection_lost(&self) {
        self.tx.send(Trigger::ConnectionLost).ok();
    }

    /// Signal that the window/tab became active
    pub fn visible(&self) {
        self.tx.send(Trigger::Visible).ok();
    }

    /// Request the shutdown drain and wait for the loop to finish
    pub async fn shutdown(self) {
        self.tx.send(Trigger::Shutdown).ok();
        self.task.await.ok();
    }
}
