//! Server-side record application
//!
//! The server holds the same record tables as a client mirror and applies
//! every write through the shared LWW rule: creates are upserts (resends
//! are harmless), stale updates and deletes are ignored, and a newer update
//! arriving for a soft-deleted row undeletes it.

use std::sync::Arc;

use pawkit_core::db::{Database, RecordStore};
use pawkit_core::models::{RecordId, RecordKind, SyncRecord};

use crate::error::AppError;

#[derive(Clone)]
pub struct SyncStore {
    db: Arc<Database>,
}

impl SyncStore {
    pub const fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// All records changed after `since` (unix ms), tombstones included
    pub async fn changes_since(
        &self,
        kind: RecordKind,
        workspace_id: &str,
        since: i64,
    ) -> Result<Vec<SyncRecord>, AppError> {
        let store = RecordStore::new(self.db.connection());
        Ok(store.list_changed_since(kind, workspace_id, since).await?)
    }

    /// Apply an incoming create/update; returns the row as stored
    ///
    /// Last-write-wins: if the stored row is newer the write is a no-op and
    /// the caller gets the current row back, which the client merges the
    /// same way it merges a delta pull.
    pub async fn apply(
        &self,
        workspace_id: &str,
        record: SyncRecord,
    ) -> Result<SyncRecord, AppError> {
        if record.workspace_id != workspace_id {
            return Err(AppError::bad_request(
                "record workspace does not match the authenticated workspace",
            ));
        }
        if !record.data.is_object() {
            return Err(AppError::bad_request("record data must be a JSON object"));
        }

        let store = RecordStore::new(self.db.connection());
        store.merge_remote(&record).await?;
        let current = store
            .get(record.kind, &record.id)
            .await?
            .ok_or_else(|| AppError::internal("record vanished after merge"))?;
        Ok(current)
    }

    /// Apply an incoming soft delete; returns the row as stored
    ///
    /// A delete for an unknown id inserts a tombstone so a resent delete
    /// whose create was dropped is still idempotent.
    pub async fn apply_delete(
        &self,
        workspace_id: &str,
        kind: RecordKind,
        id: RecordId,
        updated_at: i64,
        deleted_at: i64,
    ) -> Result<SyncRecord, AppError> {
        let store = RecordStore::new(self.db.connection());

        let mut tombstone = match store.get(kind, &id).await? {
            Some(existing) => {
                if existing.workspace_id != workspace_id {
                    return Err(AppError::not_found(id.to_string()));
                }
                existing
            }
            None => SyncRecord {
                id,
                workspace_id: workspace_id.to_string(),
                kind,
                data: serde_json::json!({}),
                created_at: deleted_at,
                updated_at: 0,
                deleted: false,
                deleted_at: None,
            },
        };
        tombstone.deleted = true;
        tombstone.deleted_at = Some(deleted_at);
        tombstone.updated_at = updated_at;

        store.merge_remote(&tombstone).await?;
        let current = store
            .get(kind, &id)
            .await?
            .ok_or_else(|| AppError::internal("record vanished after merge"))?;
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    async fn store() -> SyncStore {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        SyncStore::new(db)
    }

    fn record(ws: &str) -> SyncRecord {
        SyncRecord::new(ws, RecordKind::Card, json!({"title": "a"}))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_is_an_upsert() {
        let store = store().await;
        let rec = record("ws-1");

        let first = store.apply("ws-1", rec.clone()).await.unwrap();
        // Resend of the same create: no-op, same row back
        let second = store.apply("ws-1", rec.clone()).await.unwrap();
        assert_eq!(first, second);

        let all = store.changes_since(RecordKind::Card, "ws-1", 0).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stale_update_is_ignored() {
        let store = store().await;
        let rec = record("ws-1");
        store.apply("ws-1", rec.clone()).await.unwrap();

        let mut stale = rec.clone();
        stale.data = json!({"title": "old edit"});
        stale.updated_at = rec.updated_at - 100;

        let current = store.apply("ws-1", stale).await.unwrap();
        assert_eq!(current.data["title"], "a");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn newer_update_resurrects_deleted_record() {
        let store = store().await;
        let rec = record("ws-1");
        store.apply("ws-1", rec.clone()).await.unwrap();

        store
            .apply_delete(
                "ws-1",
                RecordKind::Card,
                rec.id,
                rec.updated_at + 10,
                rec.updated_at + 10,
            )
            .await
            .unwrap();

        // A local edit queued before the delete was observed, sent after it:
        // newer timestamp, so it wins and undeletes
        let mut revived = rec.clone();
        revived.data = json!({"title": "revived"});
        revived.updated_at = rec.updated_at + 20;
        revived.deleted = false;
        revived.deleted_at = None;

        let current = store.apply("ws-1", revived).await.unwrap();
        assert!(!current.deleted);
        assert_eq!(current.data["title"], "revived");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_of_unknown_record_inserts_tombstone() {
        let store = store().await;
        let id = RecordId::new();

        let row = store
            .apply_delete("ws-1", RecordKind::Todo, id, 1_000, 1_000)
            .await
            .unwrap();
        assert!(row.deleted);
        assert_eq!(row.deleted_at, Some(1_000));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn workspace_mismatch_is_rejected() {
        let store = store().await;
        let rec = record("ws-other");
        assert!(store.apply("ws-1", rec).await.is_err());
    }
}
