//! Current-location resolution.
//!
//! An item's position is never stored on the item row. It is the
//! destination of the most recent `created`, `tracked` or `tracked-user`
//! event, looked up afresh on every call.

use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;

use crate::db::history::latest_positional_event;
use crate::db::items::{self, ItemFilter};
use crate::directory::{LocationDirectory, UserDirectory};
use crate::error::{Result, StoreError};
use crate::event::{CodecError, Destination, EventData, HistoryEvent};
use crate::model::Item;
use crate::model::ids::{EventId, ItemId, LocationId, UserId};

/// A resolved location position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationRef {
    pub id: LocationId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The location has since been soft-deleted in the directory.
    pub is_deleted: bool,
    pub event_id: EventId,
    pub tracked_at_us: i64,
}

/// A resolved person holding the item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRef {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub event_id: EventId,
    pub tracked_at_us: i64,
}

/// Where an item is now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CurrentPosition {
    AtLocation(LocationRef),
    /// Tracked to a person rather than a place.
    WithUser(UserRef),
}

impl CurrentPosition {
    #[must_use]
    pub const fn destination(&self) -> Destination {
        match self {
            Self::AtLocation(location) => Destination::Location(location.id),
            Self::WithUser(user) => Destination::User(user.id),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::AtLocation(location) => &location.name,
            Self::WithUser(user) => &user.name,
        }
    }

    #[must_use]
    pub const fn tracked_at_us(&self) -> i64 {
        match self {
            Self::AtLocation(location) => location.tracked_at_us,
            Self::WithUser(user) => user.tracked_at_us,
        }
    }

    #[must_use]
    pub const fn is_user(&self) -> bool {
        matches!(self, Self::WithUser(_))
    }
}

/// Derives current positions from the history log.
#[derive(Debug, Clone)]
pub struct CurrentLocationResolver<'a, D> {
    conn: &'a Connection,
    directory: D,
}

impl<'a, D> CurrentLocationResolver<'a, D> {
    pub const fn new(conn: &'a Connection, directory: D) -> Self {
        Self { conn, directory }
    }
}

impl<D: UserDirectory + LocationDirectory> CurrentLocationResolver<'_, D> {
    /// Resolve where `item_id` is now, with directory names filled in.
    ///
    /// Deleted items still resolve; their history is readable.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ItemNotFound`] if the item does not exist.
    /// - [`StoreError::PositionUnknown`] if it has no readable positional
    ///   event. Unreadable positional rows are logged and skipped.
    /// - [`StoreError::LocationNotFound`] / [`StoreError::UserNotFound`] if
    ///   the destination is missing from the directory.
    pub fn resolve(&self, item_id: ItemId) -> Result<CurrentPosition> {
        items::require_item(self.conn, item_id)?;
        let event = latest_positional_event(self.conn, item_id)?;

        let position = match &event.data {
            EventData::Created(created) => self.at_location(created.location_id, &event)?,
            EventData::Tracked(tracked) => self.at_location(tracked.location_id, &event)?,
            EventData::TrackedToUser(tracked) => {
                let user = self.directory.get_user(tracked.user_id)?;
                CurrentPosition::WithUser(UserRef {
                    id: user.id,
                    name: user.name,
                    username: user.username,
                    event_id: event.id,
                    tracked_at_us: event.created_at_us,
                })
            }
            EventData::Updated(_) | EventData::Deleted | EventData::Restored => {
                return Err(StoreError::Codec(CodecError::MalformedPayload {
                    kind: Some(event.kind()),
                    reason: "selected as positional but carries no destination".into(),
                }));
            }
        };

        debug!(%item_id, event_id = %event.id, destination = ?position.destination(), "resolved position");
        Ok(position)
    }

    fn at_location(
        &self,
        location_id: LocationId,
        event: &HistoryEvent,
    ) -> Result<CurrentPosition> {
        let location = self.directory.get_location(location_id)?;
        Ok(CurrentPosition::AtLocation(LocationRef {
            id: location.id,
            name: location.name,
            description: location.description,
            is_deleted: location.is_deleted,
            event_id: event.id,
            tracked_at_us: event.created_at_us,
        }))
    }

    /// Items matching `filter` whose current destination is `destination`.
    ///
    /// Items with no readable position never match.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] if a query fails.
    pub fn items_at(&self, filter: &ItemFilter, destination: Destination) -> Result<Vec<Item>> {
        let unlimited = ItemFilter {
            limit: None,
            ..filter.clone()
        };
        let mut matched = Vec::new();
        for item in items::list_items(self.conn, &unlimited)? {
            match latest_positional_event(self.conn, item.id) {
                Ok(event) if event.destination() == Some(destination) => matched.push(item),
                Ok(_) | Err(StoreError::PositionUnknown { .. }) => {}
                Err(err) => return Err(err),
            }
            if filter
                .limit
                .is_some_and(|limit| usize::try_from(limit).is_ok_and(|limit| matched.len() >= limit))
            {
                break;
            }
        }
        Ok(matched)
    }
}
