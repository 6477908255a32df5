use serde::{Deserialize, Serialize};

use super::ids::{LocationId, UserId};

/// A place an item can be tracked to.
///
/// `is_user` marks a user-proxy row: a "location" that stands in for a
/// person. Proxies are never valid destinations for a `tracked` event;
/// people are tracked to with `tracked-user` and a [`UserId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_deleted: bool,
    pub is_user: bool,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

impl Location {
    /// Whether items may be tracked here with a plain `tracked` event.
    #[must_use]
    pub const fn accepts_items(&self) -> bool {
        !self.is_deleted && !self.is_user
    }
}

/// The slice of a user account the history engine needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Login handle, shown next to the display name.
    pub username: String,
    pub created_at_us: i64,
}
