use std::sync::Arc;

use pawkit_core::db::Database;
use pawkit_server::routes::{app_router, AppState};
use pawkit_server::store::SyncStore;
use pawkit_server::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pawkit_server=info".parse().expect("valid directive")),
        )
        .init();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!("Starting pawkit-server with config: {:?}", config);

    let db = match &config.db_path {
        Some(path) => Database::open(path).await?,
        None => {
            tracing::warn!("PAWKIT_DB_PATH not set, using an in-memory database");
            Database::open_in_memory().await?
        }
    };

    let state = AppState::new(Arc::clone(&config), SyncStore::new(Arc::new(db)));
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("pawkit-server listening on {}", config.bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
