//! Incremental pull of server changes
//!
//! Fetches every record kind changed since the workspace checkpoint, merges
//! each batch through the store's LWW rule, and advances the checkpoint only
//! once the whole window has merged. A failure anywhere leaves the
//! checkpoint untouched so the next run re-fetches the same window; merging
//! is idempotent, so re-fetching cannot duplicate records.

use libsql::Connection;

use crate::api::ApiClient;
use crate::db::{MergeOutcome, MetaStore, RecordStore};
use crate::error::Result;
use crate::models::RecordKind;

use super::status::PullReport;

/// Pull and merge all changes since the checkpoint for one workspace
pub(super) async fn delta_sync(
    conn: &Connection,
    client: &ApiClient,
    workspace_id: &str,
) -> Result<PullReport> {
    let meta = MetaStore::new(conn);
    let store = RecordStore::new(conn);

    let since = meta.checkpoint(workspace_id).await?;
    let mut max_seen = since;
    let mut merged = 0usize;

    for kind in RecordKind::ALL {
        let records = client.pull_since(kind, since).await?;
        for record in &records {
            match store.merge_remote(record).await? {
                MergeOutcome::Inserted | MergeOutcome::Applied => merged += 1,
                MergeOutcome::KeptLocal => {}
            }
            max_seen = max_seen.max(record.updated_at);
        }
        tracing::debug!(kind = %kind, count = records.len(), "Delta batch merged");
    }

    // Only now is it safe to move the checkpoint forward.
    if max_seen > since {
        meta.set_checkpoint(workspace_id, max_seen).await?;
    }

    Ok(PullReport {
        merged,
        checkpoint: max_seen,
    })
}
