use pawkit_core::db::Database;
use pawkit_core::models::RecordKind;
use pawkit_core::sync::SyncService;

use crate::commands::common::resolve_card_id;
use crate::error::CliError;

/// Soft-delete a card and queue the tombstone
pub async fn run_delete(
    db: &Database,
    service: &SyncService,
    id_or_prefix: &str,
) -> Result<(), CliError> {
    let id = resolve_card_id(db, service.workspace_id(), id_or_prefix).await?;
    service.delete(RecordKind::Card, id).await?;
    println!("Moved to trash: {id}");
    Ok(())
}
