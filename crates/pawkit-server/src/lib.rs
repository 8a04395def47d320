//! pawkit-server - Sync API for Pawkit clients
//!
//! Per-resource REST endpoints (`/api/<resource>` with `?since=` delta
//! pulls), bearer-token workspace auth, per-workspace write rate limiting
//! and a session heartbeat registry.

pub mod auth;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod sessions;
pub mod store;

pub use config::AppConfig;
pub use error::AppError;
pub use routes::{app_router, AppState};
pub use store::SyncStore;
