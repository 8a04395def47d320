//! Durable mutation queue storage
//!
//! Append-only FIFO of pending local writes. Entries survive process
//! restarts and are removed only after a confirmed server response, so a
//! crash between send and ack results in a resend, never a loss.

use libsql::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{Operation, QueueEntry, RecordId, RecordKind, SyncRecord};

/// libSQL-backed FIFO queue of pending mutations
pub struct QueueStore<'a> {
    conn: &'a Connection,
}

impl<'a> QueueStore<'a> {
    /// Create a new queue store with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Append an entry; returns its queue id
    pub async fn enqueue(
        &self,
        op: Operation,
        payload: &SyncRecord,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO sync_queue (op, kind, record_id, workspace_id, payload, enqueued_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    op.as_str(),
                    payload.kind.resource(),
                    payload.id.as_str(),
                    payload.workspace_id.clone(),
                    serde_json::to_string(payload)?,
                    chrono::Utc::now().timestamp_millis(),
                ],
            )
            .await?;
        Ok(self.conn.last_insert_rowid())
    }

    /// The oldest pending entry, if any
    pub async fn head(&self) -> Result<Option<QueueEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, op, kind, record_id, workspace_id, payload, enqueued_at
                 FROM sync_queue
                 ORDER BY id ASC
                 LIMIT 1",
                (),
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(parse_entry(&row)?)),
            None => Ok(None),
        }
    }

    /// Remove a confirmed entry by queue id
    pub async fn remove(&self, id: i64) -> Result<()> {
        let affected = self
            .conn
            .execute("DELETE FROM sync_queue WHERE id = ?", [id])
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("queue entry {id}")));
        }
        Ok(())
    }

    /// Number of entries waiting to be sent; read-only, no side effects
    pub async fn pending_count(&self) -> Result<usize> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM sync_queue", ())
            .await?;

        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        #[allow(clippy::cast_sign_loss)]
        Ok(count as usize)
    }

    /// All entries in send order
    pub async fn entries(&self) -> Result<Vec<QueueEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, op, kind, record_id, workspace_id, payload, enqueued_at
                 FROM sync_queue
                 ORDER BY id ASC",
                (),
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(parse_entry(&row)?);
        }
        Ok(entries)
    }

    /// Entries targeting one record, in enqueue order
    ///
    /// Per-target order is the invariant the drain must preserve.
    pub async fn entries_for(&self, record_id: &RecordId) -> Result<Vec<QueueEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, op, kind, record_id, workspace_id, payload, enqueued_at
                 FROM sync_queue
                 WHERE record_id = ?
                 ORDER BY id ASC",
                [record_id.as_str()],
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(parse_entry(&row)?);
        }
        Ok(entries)
    }
}

fn parse_entry(row: &libsql::Row) -> Result<QueueEntry> {
    let op: String = row.get(1)?;
    let kind: String = row.get(2)?;
    let record_id: String = row.get(3)?;
    let payload: String = row.get(5)?;

    Ok(QueueEntry {
        id: row.get(0)?,
        op: op
            .parse::<Operation>()
            .map_err(Error::Database)?,
        kind: kind.parse::<RecordKind>().map_err(Error::Database)?,
        record_id: record_id
            .parse()
            .map_err(|_| Error::Database(format!("invalid record id: {record_id}")))?,
        workspace_id: row.get(4)?,
        payload: serde_json::from_str(&payload)?,
        enqueued_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::db::Database;

    fn record() -> SyncRecord {
        SyncRecord::new("ws-1", RecordKind::Card, json!({"title": "x"}))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_enqueue_and_head_fifo() {
        let db = Database::open_in_memory().await.unwrap();
        let queue = QueueStore::new(db.connection());

        let first = record();
        let second = record();
        queue.enqueue(Operation::Create, &first).await.unwrap();
        queue.enqueue(Operation::Create, &second).await.unwrap();

        let head = queue.head().await.unwrap().unwrap();
        assert_eq!(head.record_id, first.id);
        assert_eq!(head.op, Operation::Create);
        assert_eq!(queue.pending_count().await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remove_advances_head() {
        let db = Database::open_in_memory().await.unwrap();
        let queue = QueueStore::new(db.connection());

        let first = record();
        let second = record();
        let first_id = queue.enqueue(Operation::Create, &first).await.unwrap();
        queue.enqueue(Operation::Delete, &second).await.unwrap();

        queue.remove(first_id).await.unwrap();
        let head = queue.head().await.unwrap().unwrap();
        assert_eq!(head.record_id, second.id);
        assert_eq!(queue.pending_count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_per_record_order_preserved() {
        let db = Database::open_in_memory().await.unwrap();
        let queue = QueueStore::new(db.connection());

        let mut rec = record();
        queue.enqueue(Operation::Create, &rec).await.unwrap();
        rec.touch_with(json!({"title": "edited"}));
        queue.enqueue(Operation::Update, &rec).await.unwrap();
        queue.enqueue(Operation::Delete, &rec).await.unwrap();

        let ops: Vec<Operation> = queue
            .entries_for(&rec.id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.op)
            .collect();
        assert_eq!(ops, vec![Operation::Create, Operation::Update, Operation::Delete]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_queue_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("queue.db");

        let rec = record();
        {
            let db = Database::open(&path).await.unwrap();
            let queue = QueueStore::new(db.connection());
            queue.enqueue(Operation::Create, &rec).await.unwrap();
        }

        // Simulated crash/reload: a fresh handle still sees the entry
        let db = Database::open(&path).await.unwrap();
        let queue = QueueStore::new(db.connection());
        assert_eq!(queue.pending_count().await.unwrap(), 1);
        let head = queue.head().await.unwrap().unwrap();
        assert_eq!(head.record_id, rec.id);
        assert_eq!(head.payload, rec);
    }
}
