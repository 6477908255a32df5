use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::ItemId;
use super::time::to_datetime;

/// A tracked physical object.
///
/// Items are written only by [`crate::lifecycle::Lifecycle`]; every other
/// component reads them. The item row never records where the item is:
/// position is derived from the history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// Optional secondary human key, unique across items when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub reference: String,
    pub group_key: String,
    #[serde(default)]
    pub description: Option<String>,
    pub deleted: bool,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

impl Item {
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        to_datetime(self.created_at_us)
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        to_datetime(self.updated_at_us)
    }

    /// Active items accept tracking and updates; deleted ones only restore.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.deleted
    }
}
