mod cli;
mod commands;
mod error;

use clap::Parser;

use cli::{Cli, Commands, SessionCommands, SyncCommands};
use commands::common::{build_service, load_config, open_database};
use error::CliError;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    let config = load_config()?;
    let db = open_database(cli.db_path.as_deref()).await?;
    let service = build_service(db.clone(), &config)?;

    match cli.command {
        Some(Commands::Add {
            title,
            url,
            notes,
            tag,
        }) => commands::add::run_add(&service, &title, url, notes, tag).await,
        Some(Commands::List { limit, trash, json }) => {
            commands::list::run_list(&db, &config.workspace_id, limit, trash, json).await
        }
        Some(Commands::Delete { id }) => commands::delete::run_delete(&db, &service, &id).await,
        Some(Commands::Queue { json }) => commands::queue::run_queue(&service, json).await,
        Some(Commands::Sync { command }) => match command.unwrap_or(SyncCommands::Now) {
            SyncCommands::Now => commands::sync::run_sync_now(&service).await,
            SyncCommands::Status => commands::sync::run_sync_status(&db, &service).await,
            SyncCommands::Full => commands::sync::run_sync_full(&service).await,
            SyncCommands::Conflicts { limit, json } => {
                commands::sync::run_sync_conflicts(&db, limit, json).await
            }
        },
        Some(Commands::Sessions { command }) => match command {
            SessionCommands::List => commands::sessions::run_sessions_list(&config).await,
            SessionCommands::Takeover => {
                commands::sessions::run_sessions_takeover(db, &config).await
            }
        },
        None => {
            if cli.capture.is_empty() {
                commands::sync::run_sync_status(&db, &service).await
            } else {
                commands::add::run_quick_capture(&service, &cli.capture).await
            }
        }
    }
}
