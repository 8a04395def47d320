//! Synced record model
//!
//! Every synced entity (card, collection, calendar event, todo) shares the
//! same envelope: a client-generated id, a workspace owner key, domain
//! fields carried as JSON, unix-ms timestamps and a soft-delete marker.
//! Last-write-wins conflict resolution compares `updated_at` only; there is
//! no separate version counter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for a synced record, using UUID v7 (time-sortable)
///
/// Generated on the client so a record created offline keeps the same id
/// after it lands on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Create a new unique record ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The record types Pawkit syncs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Card,
    Collection,
    CalendarEvent,
    Todo,
}

impl RecordKind {
    /// All kinds, in the order delta sync pulls them
    pub const ALL: [Self; 4] = [Self::Card, Self::Collection, Self::CalendarEvent, Self::Todo];

    /// Local table holding records of this kind
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Card => "cards",
            Self::Collection => "collections",
            Self::CalendarEvent => "events",
            Self::Todo => "todos",
        }
    }

    /// API resource path segment for this kind (`/api/<resource>`)
    #[must_use]
    pub const fn resource(self) -> &'static str {
        match self {
            Self::Card => "cards",
            Self::Collection => "collections",
            Self::CalendarEvent => "events",
            Self::Todo => "todos",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cards" | "card" => Ok(Self::Card),
            "collections" | "collection" => Ok(Self::Collection),
            "events" | "calendar_event" => Ok(Self::CalendarEvent),
            "todos" | "todo" => Ok(Self::Todo),
            other => Err(format!("unknown record kind: {other}")),
        }
    }
}

/// The shared shape the sync engine operates on
///
/// Domain fields live in `data` as JSON so the queue, store and merge logic
/// stay identical across kinds. Typed models in [`crate::models::domain`]
/// convert to and from this envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    /// Client-generated identifier
    pub id: RecordId,
    /// Owning workspace
    pub workspace_id: String,
    /// Record type
    pub kind: RecordKind,
    /// Domain fields
    pub data: serde_json::Value,
    /// Creation timestamp (unix ms)
    pub created_at: i64,
    /// Last update timestamp (unix ms); implicit version for LWW
    pub updated_at: i64,
    /// Soft delete flag; deleted records stay visible in trash until purge
    pub deleted: bool,
    /// When the record was soft-deleted (unix ms)
    pub deleted_at: Option<i64>,
}

impl SyncRecord {
    /// Create a new record envelope with fresh timestamps
    #[must_use]
    pub fn new(workspace_id: impl Into<String>, kind: RecordKind, data: serde_json::Value) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: RecordId::new(),
            workspace_id: workspace_id.into(),
            kind,
            data,
            created_at: now,
            updated_at: now,
            deleted: false,
            deleted_at: None,
        }
    }

    /// Replace the domain fields and bump `updated_at`
    ///
    /// The new timestamp is strictly greater than the previous one even
    /// when two edits land in the same millisecond, so LWW cannot drop a
    /// later revision of the same record.
    pub fn touch_with(&mut self, data: serde_json::Value) {
        self.data = data;
        self.updated_at = next_revision(self.updated_at);
    }

    /// Mark the record soft-deleted and bump `updated_at`
    pub fn mark_deleted(&mut self) {
        let now = next_revision(self.updated_at);
        self.deleted = true;
        self.deleted_at = Some(now);
        self.updated_at = now;
    }
}

/// A revision timestamp strictly after `previous` (unix ms)
fn next_revision(previous: i64) -> i64 {
    chrono::Utc::now().timestamp_millis().max(previous + 1)
}
