use serde::Serialize;

use pawkit_core::sync::SyncService;

use crate::error::CliError;

#[derive(Serialize)]
struct QueueItem {
    id: i64,
    op: String,
    kind: String,
    record_id: String,
    enqueued_at: i64,
}

/// Show the pending mutation queue in send order
pub async fn run_queue(service: &SyncService, as_json: bool) -> Result<(), CliError> {
    let entries = service.pending_entries().await?;

    if as_json {
        let items: Vec<QueueItem> = entries
            .iter()
            .map(|e| QueueItem {
                id: e.id,
                op: e.op.to_string(),
                kind: e.kind.to_string(),
                record_id: e.record_id.to_string(),
                enqueued_at: e.enqueued_at,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }

    println!("{} pending change(s):", entries.len());
    for entry in &entries {
        let when = chrono::DateTime::from_timestamp_millis(entry.enqueued_at)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!(
            "  #{}  {}  {} {}  {}",
            entry.id, when, entry.op, entry.kind, entry.record_id
        );
    }
    Ok(())
}
