//! Data models for Pawkit sync

mod conflict;
mod domain;
mod queue;
mod record;
mod session;

pub use conflict::SyncConflict;
pub use domain::{CalendarEvent, Card, CardType, Collection, DomainRecord, Todo};
pub use queue::{Operation, QueueEntry};
pub use record::{RecordId, RecordKind, SyncRecord};
pub use session::DeviceSession;
