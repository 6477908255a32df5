//! Typed payloads for each event kind.
//!
//! JSON field names follow the stored wire format (`locationId`, `userId`,
//! `updatedFields`, `group`), so rows written by older deployments decode
//! unchanged. Unknown fields are ignored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::types::EventKind;
use crate::model::ids::{LocationId, UserId};

/// Typed payload for a history event.
///
/// The discriminant is carried by the envelope's `type` field, so this enum
/// has no serde representation of its own; see [`super::codec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventData {
    Created(CreatedData),
    Updated(UpdatedData),
    Tracked(TrackedData),
    TrackedToUser(TrackedToUserData),
    Deleted,
    Restored,
}

impl EventData {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Created(_) => EventKind::Created,
            Self::Updated(_) => EventKind::Updated,
            Self::Tracked(_) => EventKind::Tracked,
            Self::TrackedToUser(_) => EventKind::TrackedToUser,
            Self::Deleted => EventKind::Deleted,
            Self::Restored => EventKind::Restored,
        }
    }

    /// Where this event puts the item, if it is positional.
    #[must_use]
    pub fn destination(&self) -> Option<Destination> {
        match self {
            Self::Created(d) => Some(Destination::Location(d.location_id)),
            Self::Tracked(d) => Some(Destination::Location(d.location_id)),
            Self::TrackedToUser(d) => Some(Destination::User(d.user_id)),
            Self::Updated(_) | Self::Deleted | Self::Restored => None,
        }
    }
}

/// A position: a physical location or a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Destination {
    Location(LocationId),
    User(UserId),
}

/// Payload for `created`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedData {
    pub reference: String,

    #[serde(rename = "group")]
    pub group_key: String,

    /// Serialized as `null` when absent, matching historical rows.
    #[serde(default)]
    pub description: Option<String>,

    /// Initial location.
    pub location_id: LocationId,
}

/// Payload for `updated`: changed field name to its new value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedData {
    pub updated_fields: BTreeMap<String, String>,
}

/// Payload for `tracked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedData {
    pub location_id: LocationId,
}

/// Payload for `tracked-user`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedToUserData {
    pub user_id: UserId,
}
