//! Sync status and event types

use crate::models::{Operation, RecordId, RecordKind};

/// Unified sync state exposed to the UI layer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    Syncing,
    Error,
    Offline,
}

/// Drop-level failures surfaced to the notification (toast) channel
///
/// Transient failures are not events; they only move `status` to `Error`
/// and retry on the next trigger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncEvent {
    /// A queue entry was rejected by the server and will not be retried
    EntryDropped {
        op: Operation,
        kind: RecordKind,
        record_id: RecordId,
        message: String,
    },
    /// The server returned 401; sync is suspended until re-authentication
    AuthRequired,
}

/// Result of one queue drain pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries confirmed and removed
    pub sent: usize,
    /// Entries rejected (4xx) and dropped
    pub dropped: usize,
    /// Entries still pending after the pass
    pub remaining: usize,
    /// Transient failure that stalled the drain, if any
    pub stalled: Option<String>,
    /// Whether the drain hit a 401
    pub auth_required: bool,
}

/// Result of one delta pull
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PullReport {
    /// Records merged into the local store
    pub merged: usize,
    /// Checkpoint after the pull (unix ms)
    pub checkpoint: i64,
}
