use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pawkit")]
#[command(about = "Save links and notes from the command line, synced across devices")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Quick capture: pawkit <https://example.com> or pawkit "a note"
    #[arg(trailing_var_arg = true)]
    pub capture: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Save a card (works offline; queued for sync)
    #[command(alias = "new")]
    Add {
        /// Card title
        title: Vec<String>,
        /// Link URL (makes this a url card)
        #[arg(long)]
        url: Option<String>,
        /// Note body (makes this a note card)
        #[arg(long)]
        notes: Option<String>,
        /// Tags to attach
        #[arg(long)]
        tag: Vec<String>,
    },
    /// List cards
    List {
        /// Number of cards to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Show soft-deleted cards instead
        #[arg(long)]
        trash: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Soft-delete a card
    Delete {
        /// Card ID or unique ID prefix
        id: String,
    },
    /// Show pending queue entries
    Queue {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sync with the server
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Devices and sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Drain the queue, then pull remote changes (default)
    Now,
    /// Show pending count and checkpoint
    Status,
    /// Drop the checkpoint and pull the full history
    Full,
    /// List recently resolved sync conflicts
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// List sessions active on this workspace
    List,
    /// Claim this device as the active session
    Takeover,
}
