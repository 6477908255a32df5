//! Event schema for the item history log.
//!
//! This module defines the [`HistoryEvent`] struct, the [`EventKind`] enum
//! covering the six kinds of lifecycle event, typed payload structs, and
//! the envelope codec that lets all payloads share one storage column.
//!
//! # Storage layout
//!
//! Each event is one row of `item_history`:
//!
//! ```text
//! id | user_id | item_id | kind | data (envelope bytes) | created_at_us
//! ```
//!
//! `kind` duplicates the envelope tag so positional lookups can filter
//! without decoding. The two must agree; a row where they differ is
//! reported as a malformed payload.

pub mod codec;
pub mod data;
pub mod types;

pub use codec::{CodecError, decode, encode};
pub use data::{
    CreatedData, Destination, EventData, TrackedData, TrackedToUserData, UpdatedData,
};
pub use types::{EventKind, UnknownEventKind};

use chrono::{DateTime, Utc};

use crate::model::ids::{EventId, ItemId, UserId};
use crate::model::time::to_datetime;

/// A single decoded event from the item history log.
///
/// Events are immutable once written. Corrections are new events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEvent {
    /// Sequence number; breaks ties between equal timestamps.
    pub id: EventId,

    /// The user who performed the action.
    pub user_id: UserId,

    /// The item this event belongs to.
    pub item_id: ItemId,

    /// Insert time in microseconds since the Unix epoch.
    pub created_at_us: i64,

    /// Typed payload.
    pub data: EventData,
}

impl HistoryEvent {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.data.kind()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        to_datetime(self.created_at_us)
    }

    /// Where this event put the item, if it is positional.
    #[must_use]
    pub fn destination(&self) -> Option<Destination> {
        self.data.destination()
    }
}

impl std::fmt::Display for HistoryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t",
            self.id, self.created_at_us, self.user_id, self.item_id
        )?;
        match &self.data {
            EventData::Created(d) => write!(f, "created: {} @ {}", d.reference, d.location_id),
            EventData::Updated(d) => {
                let fields: Vec<&str> = d.updated_fields.keys().map(String::as_str).collect();
                write!(f, "updated: {}", fields.join(","))
            }
            EventData::Tracked(d) => write!(f, "tracked: {}", d.location_id),
            EventData::TrackedToUser(d) => write!(f, "tracked-user: {}", d.user_id),
            EventData::Deleted => f.write_str("deleted"),
            EventData::Restored => f.write_str("restored"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::LocationId;

    fn sample(data: EventData) -> HistoryEvent {
        HistoryEvent {
            id: EventId(7),
            user_id: UserId::new(),
            item_id: ItemId::new(),
            created_at_us: 1_708_012_200_123_456,
            data,
        }
    }

    #[test]
    fn kind_and_destination_follow_payload() {
        let location_id = LocationId::new();
        let event = sample(EventData::Tracked(TrackedData { location_id }));
        assert_eq!(event.kind(), EventKind::Tracked);
        assert_eq!(event.destination(), Some(Destination::Location(location_id)));
        assert_eq!(event.created_at().timestamp(), 1_708_012_200);
    }

    #[test]
    fn display_includes_id_and_summary() {
        let event = sample(EventData::Created(CreatedData {
            reference: "REF-1".into(),
            group_key: "XYZ".into(),
            description: None,
            location_id: LocationId::new(),
        }));
        let display = event.to_string();
        assert!(display.starts_with("7\t1708012200123456\t"));
        assert!(display.contains("created: REF-1"));
    }

    #[test]
    fn display_does_not_panic_for_any_kind() {
        for data in [EventData::Deleted, EventData::Restored] {
            let _ = sample(data).to_string();
        }
    }
}
