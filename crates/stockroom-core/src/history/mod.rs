//! History projection: raw log rows to display records.
//!
//! A projection reads an item's log once and yields one [`HistoryRecord`]
//! per decodable row, newest first, with actor and destination names looked
//! up in the directories. A row that cannot be decoded is logged and
//! skipped, so one bad event never hides the rest of an item's history.

pub mod csv;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::db::history::{StoredEvent, list_by_item};
use crate::db::items;
use crate::directory::{LocationDirectory, UserDirectory};
use crate::error::{Result, StoreError};
use crate::event::{EventData, EventKind, HistoryEvent};
use crate::model::ids::{EventId, ItemId, LocationId, UserId};
use crate::model::{Location, User};

/// One projected history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub event_id: EventId,
    pub item_id: ItemId,
    /// Acting user.
    pub user_id: UserId,
    pub user_name: Option<String>,
    pub user_username: Option<String>,
    pub date: DateTime<Utc>,
    pub data: HistoryDetail,
}

/// Kind-specific part of a [`HistoryRecord`].
///
/// Names are `None` when the directory no longer knows the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum HistoryDetail {
    Created {
        reference: String,
        group: String,
        description: Option<String>,
        location_id: LocationId,
        location_name: Option<String>,
    },
    Updated {
        updated_fields: BTreeMap<String, String>,
    },
    Tracked {
        item_reference: String,
        location_id: LocationId,
        location_name: Option<String>,
    },
    TrackedToUser {
        item_reference: String,
        user_id: UserId,
        user_name: Option<String>,
        user_username: Option<String>,
    },
    Deleted,
    Restored,
}

/// Projects an item's history through a pair of directories.
#[derive(Debug, Clone)]
pub struct HistoryProjector<'a, D> {
    conn: &'a Connection,
    directory: D,
}

impl<'a, D> HistoryProjector<'a, D> {
    pub const fn new(conn: &'a Connection, directory: D) -> Self {
        Self { conn, directory }
    }
}

impl<D: UserDirectory + LocationDirectory + Clone> HistoryProjector<'_, D> {
    /// Start a projection of `item_id`'s history, newest first.
    ///
    /// The log is read once here; records are built lazily as the returned
    /// iterator is advanced. The iterator holds its own copy of the
    /// directory handle, so it outlives the projector.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ItemNotFound`] if the item does not exist.
    /// - [`StoreError::Storage`] if the log cannot be read.
    pub fn project(&self, item_id: ItemId) -> Result<HistoryRecords<D>> {
        let item = items::require_item(self.conn, item_id)?;
        let rows = list_by_item(self.conn, item_id)?;
        debug!(%item_id, rows = rows.len(), "projecting history");
        Ok(HistoryRecords {
            rows: rows.into_iter(),
            names: NameLookup {
                directory: self.directory.clone(),
                item_reference: item.reference,
            },
        })
    }

    /// Project and collect, stopping at the first directory failure.
    ///
    /// # Errors
    ///
    /// Same as [`Self::project`], plus any non-not-found directory error.
    pub fn collect(&self, item_id: ItemId) -> Result<Vec<HistoryRecord>> {
        self.project(item_id)?.collect()
    }
}

/// Lazy iterator over projected records. See [`HistoryProjector::project`].
pub struct HistoryRecords<D> {
    rows: std::vec::IntoIter<StoredEvent>,
    names: NameLookup<D>,
}

/// Directory lookups for one projection.
struct NameLookup<D> {
    directory: D,
    item_reference: String,
}

impl<D: UserDirectory + LocationDirectory> NameLookup<D> {
    fn user(&self, user_id: UserId) -> Result<Option<User>> {
        match self.directory.get_user(user_id) {
            Ok(user) => Ok(Some(user)),
            Err(StoreError::UserNotFound { .. }) => {
                debug!(%user_id, "user missing from directory; name left blank");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn location(&self, location_id: LocationId) -> Result<Option<Location>> {
        match self.directory.get_location(location_id) {
            Ok(location) => Ok(Some(location)),
            Err(StoreError::LocationNotFound { .. }) => {
                debug!(%location_id, "location missing from directory; name left blank");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn build(&self, event: HistoryEvent) -> Result<HistoryRecord> {
        let actor = self.user(event.user_id)?;
        let kind = event.kind();
        let date = event.created_at();
        let detail = match event.data {
            EventData::Created(created) => HistoryDetail::Created {
                location_name: self.location(created.location_id)?.map(|l| l.name),
                reference: created.reference,
                group: created.group_key,
                description: created.description,
                location_id: created.location_id,
            },
            EventData::Updated(updated) => HistoryDetail::Updated {
                updated_fields: updated.updated_fields,
            },
            EventData::Tracked(tracked) => HistoryDetail::Tracked {
                item_reference: self.item_reference.clone(),
                location_id: tracked.location_id,
                location_name: self.location(tracked.location_id)?.map(|l| l.name),
            },
            EventData::TrackedToUser(tracked) => {
                let holder = self.user(tracked.user_id)?;
                HistoryDetail::TrackedToUser {
                    item_reference: self.item_reference.clone(),
                    user_id: tracked.user_id,
                    user_name: holder.as_ref().map(|u| u.name.clone()),
                    user_username: holder.map(|u| u.username),
                }
            }
            EventData::Deleted => HistoryDetail::Deleted,
            EventData::Restored => HistoryDetail::Restored,
        };

        Ok(HistoryRecord {
            kind,
            event_id: event.id,
            item_id: event.item_id,
            user_id: event.user_id,
            user_name: actor.as_ref().map(|u| u.name.clone()),
            user_username: actor.map(|u| u.username),
            date,
            data: detail,
        })
    }
}

impl<D: UserDirectory + LocationDirectory> Iterator for HistoryRecords<D> {
    type Item = Result<HistoryRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        for row in self.rows.by_ref() {
            match row.decode() {
                Ok(event) => return Some(self.names.build(event)),
                Err(err) => {
                    warn!(
                        item_id = %row.item_id,
                        event_id = %row.id,
                        kind = %row.kind,
                        error = %err,
                        "skipping undecodable history row"
                    );
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.rows.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use crate::db::history::{append, import_raw};
    use crate::event::{CreatedData, TrackedData, TrackedToUserData, UpdatedData};
    use crate::model::Item;
    use crate::model::time::now_us;
    use serde_json::json;

    struct Fixture {
        store: Store,
        item_id: ItemId,
        actor: User,
        shelf: Location,
    }

    fn fixture() -> Fixture {
        let store = Store::open_in_memory().expect("open store");
        let actor = store.directory().add_user("Ada Admin", "ada").expect("user");
        let shelf = store.directory().add_location("Shelf 1", None).expect("location");
        let item = Item {
            id: ItemId::new(),
            identifier: None,
            reference: "REF-1".into(),
            group_key: "XYZ".into(),
            description: None,
            deleted: false,
            created_at_us: now_us(),
            updated_at_us: now_us(),
        };
        items::insert_item(store.conn(), &item).expect("insert");
        append(
            store.conn(),
            item.id,
            actor.id,
            &EventData::Created(CreatedData {
                reference: "REF-1".into(),
                group_key: "XYZ".into(),
                description: Some("blue crate".into()),
                location_id: shelf.id,
            }),
        )
        .expect("append created");
        Fixture {
            item_id: item.id,
            store,
            actor,
            shelf,
        }
    }

    #[test]
    fn created_record_carries_names() {
        let f = fixture();
        let records = f.store.projector().collect(f.item_id).expect("project");
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.kind, EventKind::Created);
        assert_eq!(record.user_name.as_deref(), Some("Ada Admin"));
        assert_eq!(record.user_username.as_deref(), Some("ada"));
        assert_eq!(
            record.data,
            HistoryDetail::Created {
                reference: "REF-1".into(),
                group: "XYZ".into(),
                description: Some("blue crate".into()),
                location_id: f.shelf.id,
                location_name: Some("Shelf 1".into()),
            }
        );
    }

    #[test]
    fn records_are_newest_first_and_cover_every_kind() {
        let f = fixture();
        let conn = f.store.conn();
        let holder = f.store.directory().add_user("Una", "una").expect("user");
        let mut fields = BTreeMap::new();
        fields.insert("reference".to_string(), "REF-2".to_string());
        for data in [
            EventData::Tracked(TrackedData {
                location_id: f.shelf.id,
            }),
            EventData::TrackedToUser(TrackedToUserData { user_id: holder.id }),
            EventData::Updated(UpdatedData {
                updated_fields: fields,
            }),
            EventData::Deleted,
            EventData::Restored,
        ] {
            append(conn, f.item_id, f.actor.id, &data).expect("append");
        }

        let kinds: Vec<EventKind> = f
            .store
            .projector()
            .collect(f.item_id)
            .expect("project")
            .into_iter()
            .map(|r| r.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Restored,
                EventKind::Deleted,
                EventKind::Updated,
                EventKind::TrackedToUser,
                EventKind::Tracked,
                EventKind::Created,
            ]
        );
    }

    #[test]
    fn unknown_kind_row_is_skipped() {
        let f = fixture();
        import_raw(
            f.store.conn(),
            f.item_id,
            f.actor.id,
            "bogus",
            br#"{"type":"bogus","data":{}}"#,
            now_us() + 1_000_000,
        )
        .expect("import");
        append(f.store.conn(), f.item_id, f.actor.id, &EventData::Deleted).expect("append");

        let kinds: Vec<EventKind> = f
            .store
            .projector()
            .collect(f.item_id)
            .expect("project")
            .into_iter()
            .map(|r| r.kind)
            .collect();
        assert_eq!(kinds, vec![EventKind::Deleted, EventKind::Created]);
    }

    #[test]
    fn malformed_payload_row_is_skipped() {
        let f = fixture();
        import_raw(
            f.store.conn(),
            f.item_id,
            f.actor.id,
            "tracked",
            br#"{"type":"tracked","data":{"locationId":"not-a-uuid"}}"#,
            now_us() + 1_000_000,
        )
        .expect("import");

        let records = f.store.projector().collect(f.item_id).expect("project");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, EventKind::Created);
    }

    #[test]
    fn missing_directory_entries_leave_names_blank() {
        let f = fixture();
        let stranger = UserId::new();
        append(
            f.store.conn(),
            f.item_id,
            stranger,
            &EventData::TrackedToUser(TrackedToUserData {
                user_id: UserId::new(),
            }),
        )
        .expect("append");

        let records = f.store.projector().collect(f.item_id).expect("project");
        let newest = &records[0];
        assert_eq!(newest.user_id, stranger);
        assert!(newest.user_name.is_none());
        match &newest.data {
            HistoryDetail::TrackedToUser {
                user_name,
                item_reference,
                ..
            } => {
                assert!(user_name.is_none());
                assert_eq!(item_reference, "REF-1");
            }
            other => panic!("expected tracked-to-user detail, got {other:?}"),
        }
    }

    #[test]
    fn project_unknown_item_is_not_found() {
        let store = Store::open_in_memory().expect("open store");
        assert!(matches!(
            store.projector().project(ItemId::new()),
            Err(StoreError::ItemNotFound { .. })
        ));
    }

    #[test]
    fn json_shape_uses_wire_names() {
        let f = fixture();
        let records = f.store.projector().collect(f.item_id).expect("project");
        let value = serde_json::to_value(&records[0]).expect("serialize");

        assert_eq!(value["type"], "created");
        assert_eq!(value["userName"], "Ada Admin");
        assert_eq!(value["data"]["locationName"], "Shelf 1");
        assert_eq!(value["data"]["group"], "XYZ");
        assert_eq!(value["data"]["locationId"], json!(f.shelf.id.to_string()));
    }

    #[test]
    fn deleted_detail_serializes_as_null() {
        let f = fixture();
        append(f.store.conn(), f.item_id, f.actor.id, &EventData::Deleted).expect("append");
        let records = f.store.projector().collect(f.item_id).expect("project");
        let value = serde_json::to_value(&records[0]).expect("serialize");
        assert_eq!(value["type"], "deleted");
        assert!(value["data"].is_null());
    }
}
