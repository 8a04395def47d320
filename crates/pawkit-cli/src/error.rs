use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] pawkit_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No card content provided")]
    EmptyContent,
    #[error("Card ID cannot be empty")]
    EmptyCardId,
    #[error("Card not found for id/prefix: {0}")]
    CardNotFound(String),
    #[error("{0}")]
    AmbiguousCardId(String),
    #[error(
        "Pawkit is not configured. Set PAWKIT_API_URL, PAWKIT_API_TOKEN and PAWKIT_WORKSPACE (a .env file works too)."
    )]
    NotConfigured(#[source] pawkit_core::Error),
}
