use std::sync::Arc;

use pawkit_core::api::ApiClient;
use pawkit_core::config::ClientConfig;
use pawkit_core::db::Database;
use pawkit_core::session::{claim_bus, DeviceCoordinator};

use crate::error::CliError;

/// List sessions the server currently considers active
pub async fn run_sessions_list(config: &ClientConfig) -> Result<(), CliError> {
    let client =
        ApiClient::new(&config.api_url, &config.api_token).map_err(pawkit_core::Error::from)?;
    let sessions = client.active_sessions().await.map_err(pawkit_core::Error::from)?;

    if sessions.is_empty() {
        println!("No active sessions.");
        return Ok(());
    }

    for session in &sessions {
        let when = chrono::DateTime::from_timestamp_millis(session.last_active_at)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!(
            "{}  {} ({} / {})  last active {when}",
            session.session_id, session.device_name, session.browser, session.os
        );
    }
    Ok(())
}

/// Claim this device as the active session and heartbeat once
pub async fn run_sessions_takeover(
    db: Arc<Database>,
    config: &ClientConfig,
) -> Result<(), CliError> {
    let client =
        ApiClient::new(&config.api_url, &config.api_token).map_err(pawkit_core::Error::from)?;

    let coordinator = DeviceCoordinator::new(
        db,
        client,
        claim_bus(),
        config.device_name.clone(),
        "pawkit-cli",
        std::env::consts::OS,
        config.heartbeat_interval,
    )
    .await?;

    coordinator.claim_active().await?;
    println!(
        "This device ({}) is now the active session.",
        coordinator.session().device_name
    );
    Ok(())
}
