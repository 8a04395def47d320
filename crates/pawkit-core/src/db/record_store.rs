//! Record store: the local mirror of server state
//!
//! Both the optimistic UI write path and the delta-sync merge path go
//! through this store, so they share one conflict rule: last-write-wins on
//! `updated_at`, ties keep the local row.

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use libsql::{params, Connection, Value};

use crate::error::{Error, Result};
use crate::models::{RecordId, RecordKind, SyncConflict, SyncRecord};

/// Outcome of merging one remote record into the local store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Record was absent locally and has been inserted
    Inserted,
    /// Remote row was strictly newer and replaced the local row
    Applied,
    /// Local row was newer or equally new; remote change suppressed
    KeptLocal,
}

/// libSQL-backed store for synced records
pub struct RecordStore<'a> {
    conn: &'a Connection,
}

impl<'a> RecordStore<'a> {
    /// Create a new store with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert or replace a record unconditionally (local optimistic write)
    ///
    /// Caller is responsible for having bumped `updated_at`; the UI write
    /// wrappers in the sync service do this.
    pub async fn save(&self, record: &SyncRecord) -> Result<()> {
        let table = record.kind.table();
        self.conn
            .execute(
                &format!(
                    "INSERT OR REPLACE INTO {table}
                     (id, workspace_id, data, created_at, updated_at, deleted, deleted_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?)"
                ),
                params![
                    record.id.as_str(),
                    record.workspace_id.clone(),
                    serde_json::to_string(&record.data)?,
                    record.created_at,
                    record.updated_at,
                    i64::from(record.deleted),
                    record.deleted_at.map_or(Value::Null, Value::Integer),
                ],
            )
            .await?;
        Ok(())
    }

    /// Get a record by kind and id, including soft-deleted ones
    pub async fn get(&self, kind: RecordKind, id: &RecordId) -> Result<Option<SyncRecord>> {
        let table = kind.table();
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT id, workspace_id, data, created_at, updated_at, deleted, deleted_at
                     FROM {table} WHERE id = ?"
                ),
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(parse_record(kind, &row)?)),
            None => Ok(None),
        }
    }

    /// List visible records for a workspace, newest first
    pub async fn list(
        &self,
        kind: RecordKind,
        workspace_id: &str,
        limit: usize,
    ) -> Result<Vec<SyncRecord>> {
        self.list_where(kind, workspace_id, "deleted = 0", limit).await
    }

    /// List soft-deleted records (trash view), newest first
    pub async fn list_trashed(
        &self,
        kind: RecordKind,
        workspace_id: &str,
        limit: usize,
    ) -> Result<Vec<SyncRecord>> {
        self.list_where(kind, workspace_id, "deleted = 1", limit).await
    }

    async fn list_where(
        &self,
        kind: RecordKind,
        workspace_id: &str,
        filter: &str,
        limit: usize,
    ) -> Result<Vec<SyncRecord>> {
        let table = kind.table();
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT id, workspace_id, data, created_at, updated_at, deleted, deleted_at
                     FROM {table}
                     WHERE workspace_id = ? AND {filter}
                     ORDER BY updated_at DESC
                     LIMIT ?"
                ),
                params![workspace_id, limit as i64],
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(parse_record(kind, &row)?);
        }
        Ok(records)
    }

    /// All records changed after `since` (unix ms), soft-deleted included
    ///
    /// This is the delta feed: ordered by `updated_at` ascending so callers
    /// can track the max timestamp seen.
    pub async fn list_changed_since(
        &self,
        kind: RecordKind,
        workspace_id: &str,
        since: i64,
    ) -> Result<Vec<SyncRecord>> {
        let table = kind.table();
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT id, workspace_id, data, created_at, updated_at, deleted, deleted_at
                     FROM {table}
                     WHERE workspace_id = ? AND updated_at > ?
                     ORDER BY updated_at ASC"
                ),
                params![workspace_id, since],
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(parse_record(kind, &row)?);
        }
        Ok(records)
    }

    /// Soft-delete a record, bumping `updated_at`; returns the updated row
    ///
    /// The tombstone revision is strictly newer than the row's current
    /// `updated_at` so LWW propagates it even for same-millisecond edits.
    pub async fn soft_delete(&self, kind: RecordKind, id: &RecordId) -> Result<SyncRecord> {
        let table = kind.table();
        let now = chrono::Utc::now().timestamp_millis();

        let affected = self
            .conn
            .execute(
                &format!(
                    "UPDATE {table}
                     SET deleted = 1,
                         deleted_at = MAX(?, updated_at + 1),
                         updated_at = MAX(?, updated_at + 1)
                     WHERE id = ? AND deleted = 0"
                ),
                params![now, now, id.as_str()],
            )
            .await?;

        if affected == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        self.get(kind, id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Permanently remove a record (explicit purge, separate from soft delete)
    pub async fn purge(&self, kind: RecordKind, id: &RecordId) -> Result<()> {
        let table = kind.table();
        let affected = self
            .conn
            .execute(&format!("DELETE FROM {table} WHERE id = ?"), [id.as_str()])
            .await?;

        if affected == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Merge a remote record using last-write-wins on `updated_at`
    ///
    /// Remote wins only when strictly newer; a tie keeps the local row so an
    /// in-flight local edit is not clobbered by its own echo. Suppressed
    /// strictly-older writes are recorded in the conflict log.
    pub async fn merge_remote(&self, incoming: &SyncRecord) -> Result<MergeOutcome> {
        let Some(local) = self.get(incoming.kind, &incoming.id).await? else {
            self.save(incoming).await?;
            return Ok(MergeOutcome::Inserted);
        };

        if incoming.updated_at > local.updated_at {
            self.save(incoming).await?;
            return Ok(MergeOutcome::Applied);
        }

        if incoming.updated_at < local.updated_at {
            self.log_conflict(&local, incoming).await?;
        }
        Ok(MergeOutcome::KeptLocal)
    }

    async fn log_conflict(&self, local: &SyncRecord, incoming: &SyncRecord) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_conflicts
                 (kind, record_id, local_updated_at, incoming_updated_at, resolved_at, strategy)
                 VALUES (?, ?, ?, ?, ?, 'lww')",
                params![
                    local.kind.resource(),
                    local.id.as_str(),
                    local.updated_at,
                    incoming.updated_at,
                    chrono::Utc::now().timestamp_millis(),
                ],
            )
            .await?;
        Ok(())
    }

    /// List recently resolved conflicts, newest first
    pub async fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, kind, record_id, local_updated_at, incoming_updated_at,
                        resolved_at, strategy
                 FROM sync_conflicts
                 ORDER BY resolved_at DESC
                 LIMIT ?",
                [limit as i64],
            )
            .await?;

        let mut conflicts = Vec::new();
        while let Some(row) = rows.next().await? {
            conflicts.push(SyncConflict {
                id: row.get(0)?,
                kind: row.get(1)?,
                record_id: row.get(2)?,
                local_updated_at: row.get(3)?,
                incoming_updated_at: row.get(4)?,
                resolved_at: row.get(5)?,
                strategy: row.get(6)?,
            });
        }
        Ok(conflicts)
    }
}

/// Parse a record from a database row
fn parse_record(kind: RecordKind, row: &libsql::Row) -> Result<SyncRecord> {
    let id: String = row.get(0)?;
    let data: String = row.get(2)?;
    let deleted_at = match row.get_value(6)? {
        Value::Integer(ms) => Some(ms),
        _ => None,
    };

    Ok(SyncRecord {
        id: id
            .parse()
            .map_err(|_| Error::Database(format!("invalid record id: {id}")))?,
        workspace_id: row.get(1)?,
        kind,
        data: serde_json::from_str(&data)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        deleted: row.get::<i32>(5)? != 0,
        deleted_at,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::db::Database;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn record(workspace: &str) -> SyncRecord {
        SyncRecord::new(workspace, RecordKind::Card, json!({"title": "a card"}))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_save_and_get() {
        let db = setup().await;
        let store = RecordStore::new(db.connection());

        let rec = record("ws-1");
        store.save(&rec).await.unwrap();

        let fetched = store.get(RecordKind::Card, &rec.id).await.unwrap().unwrap();
        assert_eq!(fetched, rec);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_excludes_deleted() {
        let db = setup().await;
        let store = RecordStore::new(db.connection());

        let kept = record("ws-1");
        let mut gone = record("ws-1");
        gone.mark_deleted();
        store.save(&kept).await.unwrap();
        store.save(&gone).await.unwrap();

        let visible = store.list(RecordKind::Card, "ws-1", 10).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, kept.id);

        let trashed = store.list_trashed(RecordKind::Card, "ws-1", 10).await.unwrap();
        assert_eq!(trashed.len(), 1);
        assert_eq!(trashed[0].id, gone.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_soft_delete_then_purge() {
        let db = setup().await;
        let store = RecordStore::new(db.connection());

        let rec = record("ws-1");
        store.save(&rec).await.unwrap();

        let deleted = store.soft_delete(RecordKind::Card, &rec.id).await.unwrap();
        assert!(deleted.deleted);
        assert!(deleted.updated_at >= rec.updated_at);
        assert_eq!(deleted.deleted_at, Some(deleted.updated_at));

        // Still present until purged
        assert!(store.get(RecordKind::Card, &rec.id).await.unwrap().is_some());
        store.purge(RecordKind::Card, &rec.id).await.unwrap();
        assert!(store.get(RecordKind::Card, &rec.id).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_merge_remote_inserts_when_absent() {
        let db = setup().await;
        let store = RecordStore::new(db.connection());

        let rec = record("ws-1");
        let outcome = store.merge_remote(&rec).await.unwrap();
        assert_eq!(outcome, MergeOutcome::Inserted);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_merge_remote_newer_wins() {
        let db = setup().await;
        let store = RecordStore::new(db.connection());

        let local = record("ws-1");
        store.save(&local).await.unwrap();

        let mut remote = local.clone();
        remote.data = json!({"title": "renamed"});
        remote.updated_at = local.updated_at + 1;

        let outcome = store.merge_remote(&remote).await.unwrap();
        assert_eq!(outcome, MergeOutcome::Applied);

        let current = store.get(RecordKind::Card, &local.id).await.unwrap().unwrap();
        assert_eq!(current.data["title"], "renamed");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_merge_remote_tie_keeps_local() {
        let db = setup().await;
        let store = RecordStore::new(db.connection());

        let local = record("ws-1");
        store.save(&local).await.unwrap();

        let mut remote = local.clone();
        remote.data = json!({"title": "other device"});

        let outcome = store.merge_remote(&remote).await.unwrap();
        assert_eq!(outcome, MergeOutcome::KeptLocal);

        let current = store.get(RecordKind::Card, &local.id).await.unwrap().unwrap();
        assert_eq!(current.data, local.data);

        // A tie is not a conflict, only a strictly older incoming write is
        assert!(store.list_conflicts(10).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_merge_remote_older_is_logged() {
        let db = setup().await;
        let store = RecordStore::new(db.connection());

        let local = record("ws-1");
        store.save(&local).await.unwrap();

        let mut remote = local.clone();
        remote.updated_at = local.updated_at - 10;

        let outcome = store.merge_remote(&remote).await.unwrap();
        assert_eq!(outcome, MergeOutcome::KeptLocal);

        let conflicts = store.list_conflicts(10).await.unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].record_id, local.id.as_str());
        assert_eq!(conflicts[0].strategy, "lww");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remote_soft_delete_propagates() {
        let db = setup().await;
        let store = RecordStore::new(db.connection());

        let local = record("ws-1");
        store.save(&local).await.unwrap();

        let mut remote = local.clone();
        remote.deleted = true;
        remote.deleted_at = Some(local.updated_at + 5);
        remote.updated_at = local.updated_at + 5;

        store.merge_remote(&remote).await.unwrap();
        let current = store.get(RecordKind::Card, &local.id).await.unwrap().unwrap();
        assert!(current.deleted);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_changed_since_includes_deleted() {
        let db = setup().await;
        let store = RecordStore::new(db.connection());

        let mut a = record("ws-1");
        a.updated_at = 100;
        let mut b = record("ws-1");
        b.updated_at = 200;
        b.deleted = true;
        b.deleted_at = Some(200);
        store.save(&a).await.unwrap();
        store.save(&b).await.unwrap();

        let changed = store
            .list_changed_since(RecordKind::Card, "ws-1", 150)
            .await
            .unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].id, b.id);
        assert!(changed[0].deleted);
    }
}
