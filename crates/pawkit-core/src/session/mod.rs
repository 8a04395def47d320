//! Device/session coordination
//!
//! Arbitration of which session is "active": the active session sends
//! heartbeats and is shown as the current device; everyone else is passive.
//! A takeover broadcasts a claim on a shared channel and persists the
//! active-device marker; observers drop to passive on the next received
//! claim. This is advisory UX state only and never gates writes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::ApiClient;
use crate::db::{Database, MetaStore};
use crate::error::Result;
use crate::models::DeviceSession;

/// Whether this session currently owns the "active device" badge
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordinatorState {
    Passive,
    Active,
}

/// A broadcast takeover claim
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionClaim {
    pub session_id: String,
    pub device_id: String,
    pub claimed_at: i64,
}

/// Create the shared claim channel all coordinators subscribe to
#[must_use]
pub fn claim_bus() -> broadcast::Sender<SessionClaim> {
    broadcast::channel(16).0
}

/// Per-session state machine, switching between `Passive` and `Active`
pub struct DeviceCoordinator {
    db: Arc<Database>,
    client: ApiClient,
    session: DeviceSession,
    bus: broadcast::Sender<SessionClaim>,
    state_tx: watch::Sender<CoordinatorState>,
    heartbeat_interval: Duration,
}

impl DeviceCoordinator {
    /// Create a coordinator for this process
    ///
    /// Loads (or creates) the persisted device id; the session id is fresh
    /// per process. Starts passive.
    pub async fn new(
        db: Arc<Database>,
        client: ApiClient,
        bus: broadcast::Sender<SessionClaim>,
        device_name: impl Into<String>,
        browser: impl Into<String>,
        os: impl Into<String>,
        heartbeat_interval: Duration,
    ) -> Result<Self> {
        let device_id = MetaStore::new(db.connection()).device_id().await?;
        let session_id = Uuid::now_v7().to_string();
        let session = DeviceSession::new(device_id, session_id, device_name, browser, os);
        let (state_tx, _) = watch::channel(CoordinatorState::Passive);

        Ok(Self {
            db,
            client,
            session,
            bus,
            state_tx,
            heartbeat_interval,
        })
    }

    /// This process's session identity
    #[must_use]
    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    /// Current state snapshot
    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        *self.state_tx.borrow()
    }

    /// Watch passive/active transitions
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<CoordinatorState> {
        self.state_tx.subscribe()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == CoordinatorState::Active
    }

    /// Explicit user takeover: become the active session
    ///
    /// Persists the shared marker, broadcasts the claim and sends one
    /// immediate heartbeat. Heartbeat failures are logged, not fatal; the
    /// claim is advisory.
    pub async fn claim_active(&self) -> Result<()> {
        MetaStore::new(self.db.connection())
            .set_active_device(&self.session.session_id)
            .await?;

        self.bus
            .send(SessionClaim {
                session_id: self.session.session_id.clone(),
                device_id: self.session.device_id.clone(),
                claimed_at: chrono::Utc::now().timestamp_millis(),
            })
            .ok();

        self.state_tx.send_replace(CoordinatorState::Active);
        tracing::info!(session = %self.session.session_id, "Session claimed active");

        if let Err(e) = self.send_heartbeat().await {
            tracing::warn!(error = %e, "Initial heartbeat failed");
        }
        Ok(())
    }

    /// Spawn the observer/heartbeat loop
    ///
    /// Subscribes to the claim channel before returning, so claims sent
    /// after this call are never missed.
    pub fn run(self: Arc<Self>) -> JoinHandle<()> {
        let this = self;
        let mut claims = this.bus.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.heartbeat_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The immediate first tick would race the initial claim heartbeat.
            ticker.tick().await;

            loop {
                tokio::select! {
                    claim = claims.recv() => {
                        match claim {
                            Ok(claim) if claim.session_id != this.session.session_id => {
                                if this.is_active() {
                                    this.state_tx.send_replace(CoordinatorState::Passive);
                                    tracing::info!(
                                        other = %claim.session_id,
                                        "Another session claimed active, going passive"
                                    );
                                }
                            }
                            // Our own claim echoing back
                            Ok(_) => {}
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                tracing::debug!(skipped, "Missed session claims");
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                    _ = ticker.tick() => {
                        if this.is_active() {
                            if let Err(e) = this.send_heartbeat().await {
                                tracing::warn!(error = %e, "Heartbeat failed");
                            }
                        }
                    }
                }
            }
        })
    }

    async fn send_heartbeat(&self) -> Result<()> {
        let mut session = self.session.clone();
        session.last_active_at = chrono::Utc::now().timestamp_millis();
        self.client.heartbeat(&session).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    async fn coordinator(
        db: &Arc<Database>,
        bus: &broadcast::Sender<SessionClaim>,
        name: &str,
    ) -> Arc<DeviceCoordinator> {
        // Unreachable API: heartbeats fail and are logged, which is fine here
        let client = ApiClient::new("http://127.0.0.1:9", "token").unwrap();
        Arc::new(
            DeviceCoordinator::new(
                Arc::clone(db),
                client,
                bus.clone(),
                name,
                "pawkit-cli",
                std::env::consts::OS,
                Duration::from_secs(3600),
            )
            .await
            .unwrap(),
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_starts_passive() {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let bus = claim_bus();
        let coord = coordinator(&db, &bus, "Laptop").await;
        assert_eq!(coord.state(), CoordinatorState::Passive);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sessions_share_device_id() {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let bus = claim_bus();
        let a = coordinator(&db, &bus, "Tab A").await;
        let b = coordinator(&db, &bus, "Tab B").await;

        // Same installation, same device id; distinct sessions
        assert_eq!(a.session().device_id, b.session().device_id);
        assert_ne!(a.session().session_id, b.session().session_id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_takeover_demotes_other_session() {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let bus = claim_bus();
        let a = coordinator(&db, &bus, "Tab A").await;
        let b = coordinator(&db, &bus, "Tab B").await;
        let a_task = Arc::clone(&a).run();
        let b_task = Arc::clone(&b).run();

        b.claim_active().await.unwrap();
        assert!(b.is_active());

        // Tab A takes over; B observes the claim and goes passive
        a.claim_active().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(a.is_active());
        assert!(!b.is_active());

        // The shared marker points at the latest claimant
        let marker = MetaStore::new(db.connection())
            .active_device()
            .await
            .unwrap();
        assert_eq!(marker, Some(a.session().session_id.clone()));

        a_task.abort();
        b_task.abort();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_own_claim_does_not_demote() {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let bus = claim_bus();
        let a = coordinator(&db, &bus, "Tab A").await;
        let task = Arc::clone(&a).run();

        a.claim_active().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(a.is_active());

        task.abort();
    }
}
