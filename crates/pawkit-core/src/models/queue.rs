//! Mutation queue entry model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{RecordId, RecordKind, SyncRecord};

/// The kind of pending local write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(format!("unknown operation: {other}")),
        }
    }
}

/// A pending local write awaiting transmission to the server
///
/// Entries are strictly FIFO and are removed only after a confirmed server
/// response. The payload is the record snapshot taken at enqueue time, so a
/// later local edit cannot retroactively change what an earlier entry sends.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    /// Queue row id (append order)
    pub id: i64,
    pub op: Operation,
    pub kind: RecordKind,
    pub record_id: RecordId,
    pub workspace_id: String,
    /// Record snapshot at enqueue time
    pub payload: SyncRecord,
    /// When the entry was queued (unix ms)
    pub enqueued_at: i64,
}
