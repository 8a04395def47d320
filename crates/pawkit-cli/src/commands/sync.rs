use serde::Serialize;

use pawkit_core::db::{Database, MetaStore, RecordStore};
use pawkit_core::sync::{SyncService, SyncStatus};

use crate::error::CliError;

/// Drain the queue, then pull remote changes
pub async fn run_sync_now(service: &SyncService) -> Result<(), CliError> {
    let report = service.sync_now().await?;

    if report.drain.dropped > 0 {
        println!(
            "Warning: {} change(s) were rejected by the server and dropped",
            report.drain.dropped
        );
    }
    if let Some(stalled) = &report.drain.stalled {
        println!(
            "Sync incomplete: {} ({} pending)",
            stalled, report.drain.remaining
        );
        return Ok(());
    }

    println!(
        "Sync completed: pushed {}, pulled {}",
        report.drain.sent, report.pull.merged
    );
    Ok(())
}

/// Show pending count, checkpoint and current status
pub async fn run_sync_status(db: &Database, service: &SyncService) -> Result<(), CliError> {
    let pending = service.pending_count().await?;
    let checkpoint = MetaStore::new(db.connection())
        .checkpoint(service.workspace_id())
        .await?;

    let status = match service.status() {
        SyncStatus::Idle => "idle",
        SyncStatus::Syncing => "syncing",
        SyncStatus::Error => "error",
        SyncStatus::Offline => "offline",
    };

    println!("Status:     {status}");
    println!("Pending:    {pending}");
    if checkpoint > 0 {
        let when = chrono::DateTime::from_timestamp_millis(checkpoint)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| checkpoint.to_string());
        println!("Checkpoint: {when}");
    } else {
        println!("Checkpoint: never synced");
    }
    if let Some(error) = service.last_error() {
        println!("Last error: {error}");
    }
    Ok(())
}

/// Re-pull the entire history
pub async fn run_sync_full(service: &SyncService) -> Result<(), CliError> {
    let report = service.full_resync().await?;
    println!("Full resync completed: merged {} record(s)", report.merged);
    Ok(())
}

#[derive(Serialize)]
struct ConflictItem {
    kind: String,
    record_id: String,
    local_updated_at: i64,
    incoming_updated_at: i64,
    resolved_at: i64,
    strategy: String,
}

/// List recently resolved LWW conflicts
pub async fn run_sync_conflicts(
    db: &Database,
    limit: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let conflicts = RecordStore::new(db.connection()).list_conflicts(limit).await?;

    if as_json {
        let items: Vec<ConflictItem> = conflicts
            .iter()
            .map(|c| ConflictItem {
                kind: c.kind.clone(),
                record_id: c.record_id.clone(),
                local_updated_at: c.local_updated_at,
                incoming_updated_at: c.incoming_updated_at,
                resolved_at: c.resolved_at,
                strategy: c.strategy.clone(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No sync conflicts recorded.");
        return Ok(());
    }

    for c in &conflicts {
        let when = chrono::DateTime::from_timestamp_millis(c.resolved_at)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!(
            "{when}  {} {}  kept local @{} over incoming @{} ({})",
            c.kind, c.record_id, c.local_updated_at, c.incoming_updated_at, c.strategy
        );
    }
    Ok(())
}
