//! Mutation queue drain
//!
//! Sends pending entries strictly in FIFO order. A transient failure leaves
//! the failed entry at the head and stops the pass so later entries cannot
//! overtake it; a rejection (4xx) drops the entry and surfaces an event.

use libsql::Connection;
use tokio::sync::mpsc;

use crate::api::{ApiClient, ApiError};
use crate::db::{QueueStore, RecordStore};
use crate::error::Result;
use crate::models::{Operation, QueueEntry};

use super::status::{DrainReport, SyncEvent};

/// Drain the queue head-first until it is empty or a send cannot proceed
pub(super) async fn drain_queue(
    conn: &Connection,
    client: &ApiClient,
    events: &mpsc::UnboundedSender<SyncEvent>,
) -> Result<DrainReport> {
    let queue = QueueStore::new(conn);
    let store = RecordStore::new(conn);
    let mut report = DrainReport::default();

    loop {
        let Some(entry) = queue.head().await? else {
            break;
        };

        match send_entry(client, &entry).await {
            Ok(acked) => {
                // The ack goes through the same LWW merge as delta sync, so
                // a server-adjusted row cannot clobber a newer local edit.
                store.merge_remote(&acked).await?;
                queue.remove(entry.id).await?;
                report.sent += 1;
                tracing::debug!(
                    op = %entry.op,
                    kind = %entry.kind,
                    record = %entry.record_id,
                    "Queue entry confirmed"
                );
            }
            Err(ApiError::Unauthorized) => {
                report.auth_required = true;
                break;
            }
            Err(e) if e.is_transient() => {
                // Keep the head; the next trigger retries from here.
                tracing::warn!(
                    op = %entry.op,
                    record = %entry.record_id,
                    error = %e,
                    "Queue drain stalled on transient failure"
                );
                report.stalled = Some(e.to_string());
                break;
            }
            Err(e) => {
                // Unrecoverable rejection: drop the entry, tell the user.
                tracing::warn!(
                    op = %entry.op,
                    record = %entry.record_id,
                    error = %e,
                    "Queue entry rejected, dropping"
                );
                queue.remove(entry.id).await?;
                report.dropped += 1;
                events
                    .send(SyncEvent::EntryDropped {
                        op: entry.op,
                        kind: entry.kind,
                        record_id: entry.record_id,
                        message: e.to_string(),
                    })
                    .ok();
            }
        }
    }

    report.remaining = queue.pending_count().await?;
    Ok(report)
}

async fn send_entry(
    client: &ApiClient,
    entry: &QueueEntry,
) -> std::result::Result<crate::models::SyncRecord, ApiError> {
    match entry.op {
        Operation::Create => client.create(&entry.payload).await,
        Operation::Update => client.update(&entry.payload).await,
        Operation::Delete => {
            let deleted_at = entry.payload.deleted_at.unwrap_or(entry.payload.updated_at);
            client
                .delete(
                    entry.kind,
                    entry.record_id,
                    entry.payload.updated_at,
                    deleted_at,
                )
                .await
        }
    }
}
