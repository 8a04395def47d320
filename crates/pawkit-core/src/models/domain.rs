//! Typed domain models
//!
//! These are the UI-facing shapes. They serialize into the JSON `data`
//! field of a [`SyncRecord`] envelope; the sync engine itself never looks
//! inside them.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{RecordKind, SyncRecord};

/// What a card holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    #[default]
    Url,
    Note,
    File,
}

/// A saved link, note or file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Collection this card is filed under, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Reading progress, 0-100
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_progress: Option<u8>,
}

impl Card {
    /// Create a URL card
    #[must_use]
    pub fn url(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            card_type: CardType::Url,
            title: title.into(),
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Create a note card
    #[must_use]
    pub fn note(title: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            card_type: CardType::Note,
            title: title.into(),
            notes: Some(notes.into()),
            ..Self::default()
        }
    }
}

/// A hierarchical collection of cards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// A scheduled calendar entry, optionally linked to a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub title: String,
    /// Start time (unix ms)
    pub starts_at: i64,
    /// End time (unix ms)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<i64>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
}

/// A todo item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub title: String,
    /// Due date (unix ms)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<i64>,
    #[serde(default)]
    pub completed: bool,
}

/// Conversion between a typed model and the generic sync envelope
pub trait DomainRecord: Serialize + for<'de> Deserialize<'de> + Sized {
    /// The kind this model syncs as
    const KIND: RecordKind;

    /// Wrap this model into a fresh envelope for the given workspace
    fn into_record(self, workspace_id: impl Into<String>) -> Result<SyncRecord> {
        Ok(SyncRecord::new(
            workspace_id,
            Self::KIND,
            serde_json::to_value(self)?,
        ))
    }

    /// Read this model back out of an envelope's domain fields
    fn from_record(record: &SyncRecord) -> Result<Self> {
        Ok(serde_json::from_value(record.data.clone())?)
    }
}

impl DomainRecord for Card {
    const KIND: RecordKind = RecordKind::Card;
}

impl DomainRecord for Collection {
    const KIND: RecordKind = RecordKind::Collection;
}

impl DomainRecord for CalendarEvent {
    const KIND: RecordKind = RecordKind::CalendarEvent;
}

impl DomainRecord for Todo {
    const KIND: RecordKind = RecordKind::Todo;
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_card_round_trips_through_envelope() {
        let card = Card::url("Example", "https://example.com");
        let record = card.clone().into_record("ws-1").unwrap();
        assert_eq!(record.kind, RecordKind::Card);

        let back = Card::from_record(&record).unwrap();
        assert_eq!(back, card);
    }

    #[test]
    fn test_card_wire_type_field() {
        let card = Card::url("Example", "https://example.com");
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["type"], "url");
        assert_eq!(json["url"], "https://example.com");
    }

    #[test]
    fn test_todo_defaults() {
        let todo: Todo = serde_json::from_value(serde_json::json!({"title": "x"})).unwrap();
        assert!(!todo.completed);
        assert_eq!(todo.due_at, None);
    }
}
