//! The closed set of history event kinds.
//!
//! The string form is the wire tag stored in the `kind` column and in the
//! `type` field of the payload envelope.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The six kinds of item history event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The item was created at an initial location.
    Created,
    /// Descriptive fields changed.
    Updated,
    /// The item moved to a location.
    Tracked,
    /// The item was handed to a person.
    TrackedToUser,
    /// Soft-deleted.
    Deleted,
    /// Soft-delete undone.
    Restored,
}

/// Error returned when parsing an unrecognized kind tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventKind {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown history event kind '{}': expected one of created, updated, \
             tracked, tracked-user, deleted, restored",
            self.raw
        )
    }
}

impl std::error::Error for UnknownEventKind {}

impl EventKind {
    /// All kinds in catalog order.
    pub const ALL: [Self; 6] = [
        Self::Created,
        Self::Updated,
        Self::Tracked,
        Self::TrackedToUser,
        Self::Deleted,
        Self::Restored,
    ];

    /// Kinds whose payload moves the item.
    pub const POSITIONAL: [Self; 3] = [Self::Created, Self::Tracked, Self::TrackedToUser];

    /// Wire tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Tracked => "tracked",
            Self::TrackedToUser => "tracked-user",
            Self::Deleted => "deleted",
            Self::Restored => "restored",
        }
    }

    /// Human label, used in the CSV `Type` column.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Updated => "Updated",
            Self::Tracked => "Tracked",
            Self::TrackedToUser => "Tracked to user",
            Self::Deleted => "Deleted",
            Self::Restored => "Restored",
        }
    }

    /// Whether an event of this kind sets the item's current position.
    #[must_use]
    pub const fn is_positional(self) -> bool {
        matches!(self, Self::Created | Self::Tracked | Self::TrackedToUser)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "tracked" => Ok(Self::Tracked),
            "tracked-user" => Ok(Self::TrackedToUser),
            "deleted" => Ok(Self::Deleted),
            "restored" => Ok(Self::Restored),
            _ => Err(UnknownEventKind { raw: s.to_string() }),
        }
    }
}

// Custom serde: serialize as the wire tag.
impl Serialize for EventKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
