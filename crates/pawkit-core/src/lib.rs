//! pawkit-core - Core library for Pawkit sync
//!
//! This crate contains the shared models, local store, mutation queue,
//! delta sync engine and device coordination used by all Pawkit clients.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod session;
pub mod sync;

pub use error::{Error, Result};
pub use models::{RecordId, RecordKind, SyncRecord};
