//! Active session registry
//!
//! In-memory, per-workspace map of recently heartbeaten sessions. Entries
//! expire after the configured TTL; expiry is applied lazily on read.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pawkit_core::models::DeviceSession;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct SessionRegistry {
    state: Arc<Mutex<HashMap<String, HashMap<String, DeviceSession>>>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Record a heartbeat, stamping the server's own clock
    pub async fn record(&self, workspace_id: &str, mut session: DeviceSession) {
        session.last_active_at = chrono::Utc::now().timestamp_millis();
        let mut guard = self.state.lock().await;
        guard
            .entry(workspace_id.to_string())
            .or_default()
            .insert(session.session_id.clone(), session);
    }

    /// Sessions still inside the TTL, most recently active first
    pub async fn active(&self, workspace_id: &str) -> Vec<DeviceSession> {
        let cutoff = chrono::Utc::now().timestamp_millis()
            - i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);

        let mut guard = self.state.lock().await;
        let Some(sessions) = guard.get_mut(workspace_id) else {
            return Vec::new();
        };

        sessions.retain(|_, s| s.last_active_at >= cutoff);
        let mut active: Vec<DeviceSession> = sessions.values().cloned().collect();
        active.sort_by(|a, b| b.last_active_at.cmp(&a.last_active_at));
        active
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn session(id: &str) -> DeviceSession {
        DeviceSession::new("device-1", id, "Laptop", "pawkit-cli", "linux")
    }

    #[tokio::test]
    async fn records_and_lists_sessions() {
        let registry = SessionRegistry::new(Duration::from_secs(90));
        registry.record("ws-1", session("s-1")).await;
        registry.record("ws-1", session("s-2")).await;

        let active = registry.active("ws-1").await;
        assert_eq!(active.len(), 2);

        // Workspaces are isolated
        assert!(registry.active("ws-2").await.is_empty());
    }

    #[tokio::test]
    async fn repeated_heartbeat_updates_in_place() {
        let registry = SessionRegistry::new(Duration::from_secs(90));
        registry.record("ws-1", session("s-1")).await;
        registry.record("ws-1", session("s-1")).await;

        assert_eq!(registry.active("ws-1").await.len(), 1);
    }

    #[tokio::test]
    async fn expired_sessions_are_pruned() {
        let registry = SessionRegistry::new(Duration::from_millis(10));
        registry.record("ws-1", session("s-1")).await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(registry.active("ws-1").await.is_empty());
    }
}
