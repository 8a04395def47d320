//! Shared helpers for CLI commands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pawkit_core::api::ApiClient;
use pawkit_core::config::ClientConfig;
use pawkit_core::db::{Database, RecordStore};
use pawkit_core::models::{RecordId, RecordKind, SyncRecord};
use pawkit_core::sync::SyncService;

use crate::error::CliError;

/// Default database location under the platform data directory
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pawkit")
        .join("pawkit.db")
}

/// Open the local database, creating parent directories as needed
pub async fn open_database(db_path: Option<&Path>) -> Result<Arc<Database>, CliError> {
    let path = db_path.map_or_else(default_db_path, Path::to_path_buf);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Arc::new(Database::open(&path).await?))
}

/// Load config from the environment; all commands need the workspace id
pub fn load_config() -> Result<ClientConfig, CliError> {
    ClientConfig::from_env().map_err(CliError::NotConfigured)
}

/// Build the sync service for this database and config
pub fn build_service(
    db: Arc<Database>,
    config: &ClientConfig,
) -> Result<SyncService, CliError> {
    let client = ApiClient::new(&config.api_url, &config.api_token).map_err(pawkit_core::Error::from)?;
    Ok(SyncService::new(db, client, &config.workspace_id))
}

/// Resolve a card by full id or unique id prefix among stored cards
pub async fn resolve_card_id(
    db: &Database,
    workspace_id: &str,
    id_or_prefix: &str,
) -> Result<RecordId, CliError> {
    let needle = id_or_prefix.trim();
    if needle.is_empty() {
        return Err(CliError::EmptyCardId);
    }
    if let Ok(id) = needle.parse::<RecordId>() {
        return Ok(id);
    }

    let store = RecordStore::new(db.connection());
    let cards = store.list(RecordKind::Card, workspace_id, 10_000).await?;
    let matches: Vec<&SyncRecord> = cards
        .iter()
        .filter(|c| c.id.as_str().starts_with(needle))
        .collect();

    match matches.as_slice() {
        [] => Err(CliError::CardNotFound(needle.to_string())),
        [only] => Ok(only.id),
        many => Err(CliError::AmbiguousCardId(format!(
            "Prefix '{needle}' matches {} cards; use more characters",
            many.len()
        ))),
    }
}

/// One-line human summary of a card record
pub fn format_card_line(record: &SyncRecord) -> String {
    let title = record.data["title"].as_str().unwrap_or("(untitled)");
    let short_id = record.id.as_str().chars().take(8).collect::<String>();
    let when = chrono::DateTime::from_timestamp_millis(record.updated_at)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();

    match record.data["url"].as_str() {
        Some(url) => format!("{short_id}  {when}  {title}  <{url}>"),
        None => format!("{short_id}  {when}  {title}"),
    }
}
