use pawkit_core::api::WireRecord;
use pawkit_core::db::{Database, RecordStore};
use pawkit_core::models::RecordKind;

use crate::commands::common::format_card_line;
use crate::error::CliError;

/// List visible (or trashed) cards, newest first
pub async fn run_list(
    db: &Database,
    workspace_id: &str,
    limit: usize,
    trash: bool,
    as_json: bool,
) -> Result<(), CliError> {
    let store = RecordStore::new(db.connection());
    let cards = if trash {
        store.list_trashed(RecordKind::Card, workspace_id, limit).await?
    } else {
        store.list(RecordKind::Card, workspace_id, limit).await?
    };

    if as_json {
        let wire: Vec<WireRecord> = cards.iter().map(WireRecord::from).collect();
        println!("{}", serde_json::to_string_pretty(&wire)?);
        return Ok(());
    }

    if cards.is_empty() {
        println!("{}", if trash { "Trash is empty." } else { "No cards yet." });
        return Ok(());
    }

    for card in &cards {
        println!("{}", format_card_line(card));
    }
    Ok(())
}
