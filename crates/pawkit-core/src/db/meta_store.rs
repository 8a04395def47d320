//! Sync metadata storage
//!
//! Key/value table holding the per-workspace delta checkpoint, the
//! persisted device id and the shared active-device marker. Local only,
//! never synced.

use libsql::Connection;
use uuid::Uuid;

use crate::error::Result;

/// libSQL-backed key/value store for sync metadata
pub struct MetaStore<'a> {
    conn: &'a Connection,
}

impl<'a> MetaStore<'a> {
    /// Create a new meta store with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Delta checkpoint for a workspace (unix ms), 0 if never synced
    pub async fn checkpoint(&self, workspace_id: &str) -> Result<i64> {
        let value = self.get(&checkpoint_key(workspace_id)).await?;
        Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    /// Advance the checkpoint; only call after a fully merged pull window
    pub async fn set_checkpoint(&self, workspace_id: &str, checkpoint: i64) -> Result<()> {
        self.set(&checkpoint_key(workspace_id), &checkpoint.to_string())
            .await
    }

    /// Drop the checkpoint so the next pull is a full resync
    pub async fn reset_checkpoint(&self, workspace_id: &str) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM sync_meta WHERE key = ?",
                [checkpoint_key(workspace_id)],
            )
            .await?;
        Ok(())
    }

    /// Stable per-installation device id, created on first use
    pub async fn device_id(&self) -> Result<String> {
        if let Some(id) = self.get("device_id").await? {
            return Ok(id);
        }
        let id = Uuid::now_v7().to_string();
        self.set("device_id", &id).await?;
        Ok(id)
    }

    /// The session id currently claiming "active", if any
    pub async fn active_device(&self) -> Result<Option<String>> {
        self.get("active_device").await
    }

    /// Persist the active-device marker observed by all local sessions
    pub async fn set_active_device(&self, session_id: &str) -> Result<()> {
        self.set("active_device", session_id).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM sync_meta WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }
}

fn checkpoint_key(workspace_id: &str) -> String {
    format!("checkpoint:{workspace_id}")
}
