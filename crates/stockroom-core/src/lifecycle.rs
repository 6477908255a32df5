//! Item lifecycle coordinator.
//!
//! The only writer of item rows and history events. Every operation runs in
//! one `BEGIN IMMEDIATE` transaction that both changes the item row and
//! appends exactly one event; on any error the transaction is dropped and
//! neither change is visible.
//!
//! ```text
//! Active --track/update--> Active
//! Active --delete-->       Deleted
//! Deleted --restore-->     Active
//! ```
//!
//! Directory checks run inside the write transaction against the store's
//! own `users` and `locations` tables.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::collections::BTreeMap;
use tracing::info;

use crate::db::{history, items};
use crate::directory::{LocationDirectory, SqliteDirectory, UserDirectory};
use crate::error::{Result, StoreError};
use crate::event::{CreatedData, EventData, HistoryEvent, TrackedData, TrackedToUserData, UpdatedData};
use crate::model::Item;
use crate::model::ids::{ItemId, LocationId, UserId};
use crate::model::time::now_us;

/// Input for [`Lifecycle::create_item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    /// Optional secondary key; blank is treated as absent.
    pub identifier: Option<String>,
    pub reference: String,
    pub group_key: String,
    pub description: Option<String>,
    /// Initial location.
    pub location_id: LocationId,
}

/// Field changes for [`Lifecycle::update_item`]. `None` leaves a field as
/// is; `Some("")` for `description` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub reference: Option<String>,
    pub group_key: Option<String>,
    pub description: Option<String>,
}

impl ItemPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.reference.is_none() && self.group_key.is_none() && self.description.is_none()
    }
}

fn required(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::validation(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

/// Writes item state and history together.
#[derive(Debug)]
pub struct Lifecycle<'a> {
    conn: &'a mut Connection,
}

impl<'a> Lifecycle<'a> {
    pub const fn new(conn: &'a mut Connection) -> Self {
        Self { conn }
    }

    fn write<T>(&mut self, op: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = op(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Create an item at its initial location.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] for a blank reference or group.
    /// - [`StoreError::UserNotFound`] if `actor` is unknown.
    /// - [`StoreError::LocationNotFound`] if the location is unknown,
    ///   deleted, or a user proxy.
    /// - [`StoreError::DuplicateIdentifier`] if the identifier is taken.
    pub fn create_item(&mut self, actor: UserId, new: &NewItem) -> Result<Item> {
        let reference = required("reference", &new.reference)?;
        let group_key = required("group", &new.group_key)?;
        let description = optional(new.description.as_deref());
        let identifier = optional(new.identifier.as_deref());

        let item = self.write(|tx| {
            let directory = SqliteDirectory::new(tx);
            directory.get_user(actor)?;
            require_destination(&directory, new.location_id)?;

            let now = now_us();
            let item = Item {
                id: ItemId::new(),
                identifier,
                reference: reference.clone(),
                group_key: group_key.clone(),
                description: description.clone(),
                deleted: false,
                created_at_us: now,
                updated_at_us: now,
            };
            items::insert_item(tx, &item)?;
            history::append(
                tx,
                item.id,
                actor,
                &EventData::Created(CreatedData {
                    reference,
                    group_key,
                    description,
                    location_id: new.location_id,
                }),
            )?;
            Ok(item)
        })?;

        info!(item_id = %item.id, %actor, location_id = %new.location_id, "created item");
        Ok(item)
    }

    /// Move an item to a location. Re-tracking to the current location is
    /// recorded like any other move.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ItemNotFound`] / [`StoreError::ItemDeleted`].
    /// - [`StoreError::UserNotFound`] if `actor` is unknown.
    /// - [`StoreError::LocationNotFound`] if the location is unknown,
    ///   deleted, or a user proxy.
    pub fn track_item(
        &mut self,
        actor: UserId,
        item_id: ItemId,
        location_id: LocationId,
    ) -> Result<HistoryEvent> {
        let event = self.write(|tx| {
            let directory = SqliteDirectory::new(tx);
            require_active(tx, item_id)?;
            directory.get_user(actor)?;
            require_destination(&directory, location_id)?;

            let event = history::append(
                tx,
                item_id,
                actor,
                &EventData::Tracked(TrackedData { location_id }),
            )?;
            items::touch(tx, item_id, event.created_at_us)?;
            Ok(event)
        })?;

        info!(%item_id, %actor, %location_id, "tracked item to location");
        Ok(event)
    }

    /// Hand an item to a person.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ItemNotFound`] / [`StoreError::ItemDeleted`].
    /// - [`StoreError::UserNotFound`] if `actor` or `user_id` is unknown.
    pub fn track_item_to_user(
        &mut self,
        actor: UserId,
        item_id: ItemId,
        user_id: UserId,
    ) -> Result<HistoryEvent> {
        let event = self.write(|tx| {
            let directory = SqliteDirectory::new(tx);
            require_active(tx, item_id)?;
            directory.get_user(actor)?;
            directory.get_user(user_id)?;

            let event = history::append(
                tx,
                item_id,
                actor,
                &EventData::TrackedToUser(TrackedToUserData { user_id }),
            )?;
            items::touch(tx, item_id, event.created_at_us)?;
            Ok(event)
        })?;

        info!(%item_id, %actor, %user_id, "tracked item to user");
        Ok(event)
    }

    /// Change descriptive fields.
    ///
    /// Only fields whose value actually changes are written and recorded. A
    /// patch that changes nothing returns the item as is and records no
    /// event.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ItemNotFound`] / [`StoreError::ItemDeleted`].
    /// - [`StoreError::UserNotFound`] if `actor` is unknown.
    /// - [`StoreError::Validation`] if the patch blanks the reference or group.
    pub fn update_item(&mut self, actor: UserId, item_id: ItemId, patch: &ItemPatch) -> Result<Item> {
        let (item, changed) = self.write(|tx| {
            let mut item = require_active(tx, item_id)?;
            SqliteDirectory::new(tx).get_user(actor)?;

            let mut changed = BTreeMap::new();
            if let Some(reference) = &patch.reference {
                let reference = required("reference", reference)?;
                if reference != item.reference {
                    changed.insert("reference".to_string(), reference.clone());
                    item.reference = reference;
                }
            }
            if let Some(group_key) = &patch.group_key {
                let group_key = required("group", group_key)?;
                if group_key != item.group_key {
                    changed.insert("group".to_string(), group_key.clone());
                    item.group_key = group_key;
                }
            }
            if let Some(description) = &patch.description {
                let description = optional(Some(description));
                if description != item.description {
                    changed.insert(
                        "description".to_string(),
                        description.clone().unwrap_or_default(),
                    );
                    item.description = description;
                }
            }

            if changed.is_empty() {
                return Ok((item, 0));
            }

            let count = changed.len();
            let event = history::append(
                tx,
                item_id,
                actor,
                &EventData::Updated(UpdatedData {
                    updated_fields: changed,
                }),
            )?;
            item.updated_at_us = event.created_at_us;
            items::update_fields(tx, &item)?;
            Ok((item, count))
        })?;

        if changed > 0 {
            info!(%item_id, %actor, fields = changed, "updated item");
        }
        Ok(item)
    }

    /// Soft-delete an item. Its history stays readable.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ItemNotFound`].
    /// - [`StoreError::ItemDeleted`] if it is already deleted.
    /// - [`StoreError::UserNotFound`] if `actor` is unknown.
    pub fn delete_item(&mut self, actor: UserId, item_id: ItemId) -> Result<HistoryEvent> {
        let event = self.write(|tx| {
            require_active(tx, item_id)?;
            SqliteDirectory::new(tx).get_user(actor)?;

            let event = history::append(tx, item_id, actor, &EventData::Deleted)?;
            items::set_deleted(tx, item_id, true, event.created_at_us)?;
            Ok(event)
        })?;

        info!(%item_id, %actor, "deleted item");
        Ok(event)
    }

    /// Undo a soft delete.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ItemNotFound`].
    /// - [`StoreError::ItemNotDeleted`] if the item is active.
    /// - [`StoreError::UserNotFound`] if `actor` is unknown.
    pub fn restore_item(&mut self, actor: UserId, item_id: ItemId) -> Result<HistoryEvent> {
        let event = self.write(|tx| {
            let item = items::require_item(tx, item_id)?;
            if item.is_active() {
                return Err(StoreError::ItemNotDeleted { item_id });
            }
            SqliteDirectory::new(tx).get_user(actor)?;

            let event = history::append(tx, item_id, actor, &EventData::Restored)?;
            items::set_deleted(tx, item_id, false, event.created_at_us)?;
            Ok(event)
        })?;

        info!(%item_id, %actor, "restored item");
        Ok(event)
    }
}

fn require_active(conn: &Connection, item_id: ItemId) -> Result<Item> {
    let item = items::require_item(conn, item_id)?;
    if !item.is_active() {
        return Err(StoreError::ItemDeleted { item_id });
    }
    Ok(item)
}

/// A `tracked` or `created` destination must be a live, non-proxy location.
fn require_destination(directory: &SqliteDirectory<'_>, location_id: LocationId) -> Result<()> {
    let location = directory.get_location(location_id)?;
    if !location.accepts_items() {
        return Err(StoreError::LocationNotFound { location_id });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use crate::event::EventKind;
    use crate::model::{Location, User};

    struct Fixture {
        store: Store,
        actor: User,
        shelf: Location,
    }

    fn fixture() -> Fixture {
        let store = Store::open_in_memory().expect("open store");
        let actor = store.directory().add_user("Ada Admin", "ada").expect("user");
        let shelf = store.directory().add_location("Shelf 1", None).expect("location");
        Fixture {
            store,
            actor,
            shelf,
        }
    }

    fn new_item(location_id: LocationId) -> NewItem {
        NewItem {
            identifier: None,
            reference: " REF-1 ".into(),
            group_key: "XYZ".into(),
            description: Some("   ".into()),
            location_id,
        }
    }

    fn kinds(store: &Store, item_id: ItemId) -> Vec<String> {
        history::list_by_item(store.conn(), item_id)
            .expect("list")
            .into_iter()
            .map(|row| row.kind)
            .collect()
    }

    #[test]
    fn create_writes_item_and_created_event() {
        let mut f = fixture();
        let item = f
            .store
            .lifecycle()
            .create_item(f.actor.id, &new_item(f.shelf.id))
            .expect("create");

        assert_eq!(item.reference, "REF-1");
        assert!(item.description.is_none());
        assert_eq!(kinds(&f.store, item.id), vec!["created"]);

        let stored = items::require_item(f.store.conn(), item.id).expect("item row");
        assert_eq!(stored, item);
    }

    #[test]
    fn create_rejects_blank_reference_without_writing() {
        let mut f = fixture();
        let mut input = new_item(f.shelf.id);
        input.reference = "   ".into();

        let err = f
            .store
            .lifecycle()
            .create_item(f.actor.id, &input)
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "reference", .. }));
        assert!(
            items::list_items(f.store.conn(), &items::ItemFilter::default())
                .expect("list")
                .is_empty()
        );
    }

    #[test]
    fn create_rejects_unknown_actor_and_location() {
        let mut f = fixture();
        let err = f
            .store
            .lifecycle()
            .create_item(UserId::new(), &new_item(f.shelf.id))
            .unwrap_err();
        assert!(matches!(err, StoreError::UserNotFound { .. }));

        let err = f
            .store
            .lifecycle()
            .create_item(f.actor.id, &new_item(LocationId::new()))
            .unwrap_err();
        assert!(matches!(err, StoreError::LocationNotFound { .. }));

        let count: i64 = f
            .store
            .conn()
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 0);
    }

    #[test]
    fn user_proxy_location_is_not_a_destination() {
        let mut f = fixture();
        let proxy = f.store.directory().add_user_proxy("Ada's desk").expect("proxy");

        let err = f
            .store
            .lifecycle()
            .create_item(f.actor.id, &new_item(proxy.id))
            .unwrap_err();
        assert!(matches!(err, StoreError::LocationNotFound { location_id } if location_id == proxy.id));

        let item = f
            .store
            .lifecycle()
            .create_item(f.actor.id, &new_item(f.shelf.id))
            .expect("create");
        let err = f
            .store
            .lifecycle()
            .track_item(f.actor.id, item.id, proxy.id)
            .unwrap_err();
        assert!(matches!(err, StoreError::LocationNotFound { .. }));
        assert_eq!(kinds(&f.store, item.id), vec!["created"]);
    }

    #[test]
    fn duplicate_identifier_rolls_back() {
        let mut f = fixture();
        let mut input = new_item(f.shelf.id);
        input.identifier = Some("INV-1".into());
        f.store
            .lifecycle()
            .create_item(f.actor.id, &input)
            .expect("first create");

        let err = f
            .store
            .lifecycle()
            .create_item(f.actor.id, &input)
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateIdentifier { .. }));

        let events: i64 = f
            .store
            .conn()
            .query_row("SELECT COUNT(*) FROM item_history", [], |row| row.get(0))
            .expect("count");
        assert_eq!(events, 1);
    }

    #[test]
    fn track_and_track_to_user_append_events() {
        let mut f = fixture();
        let holder = f.store.directory().add_user("Una", "una").expect("user");
        let item = f
            .store
            .lifecycle()
            .create_item(f.actor.id, &new_item(f.shelf.id))
            .expect("create");

        let tracked = f
            .store
            .lifecycle()
            .track_item(f.actor.id, item.id, f.shelf.id)
            .expect("re-track to same shelf");
        assert_eq!(tracked.kind(), EventKind::Tracked);

        let handed = f
            .store
            .lifecycle()
            .track_item_to_user(f.actor.id, item.id, holder.id)
            .expect("track to user");
        assert!(handed.created_at_us > tracked.created_at_us);

        let row = items::require_item(f.store.conn(), item.id).expect("item");
        assert_eq!(row.updated_at_us, handed.created_at_us);
        assert_eq!(
            kinds(&f.store, item.id),
            vec!["tracked-user", "tracked", "created"]
        );
    }

    #[test]
    fn track_to_unknown_user_is_rejected() {
        let mut f = fixture();
        let item = f
            .store
            .lifecycle()
            .create_item(f.actor.id, &new_item(f.shelf.id))
            .expect("create");
        let err = f
            .store
            .lifecycle()
            .track_item_to_user(f.actor.id, item.id, UserId::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::UserNotFound { .. }));
    }

    #[test]
    fn update_records_only_changed_fields() {
        let mut f = fixture();
        let item = f
            .store
            .lifecycle()
            .create_item(f.actor.id, &new_item(f.shelf.id))
            .expect("create");

        let patch = ItemPatch {
            reference: Some("REF-1".into()),
            group_key: Some("ABC".into()),
            description: Some("blue crate".into()),
        };
        let updated = f
            .store
            .lifecycle()
            .update_item(f.actor.id, item.id, &patch)
            .expect("update");
        assert_eq!(updated.group_key, "ABC");
        assert_eq!(updated.description.as_deref(), Some("blue crate"));

        let rows = history::list_by_item(f.store.conn(), item.id).expect("list");
        let event = rows[0].decode().expect("decode");
        match event.data {
            EventData::Updated(data) => {
                let keys: Vec<&str> = data.updated_fields.keys().map(String::as_str).collect();
                assert_eq!(keys, vec!["description", "group"]);
            }
            other => panic!("expected updated, got {other:?}"),
        }
    }

    #[test]
    fn noop_update_records_nothing() {
        let mut f = fixture();
        let item = f
            .store
            .lifecycle()
            .create_item(f.actor.id, &new_item(f.shelf.id))
            .expect("create");

        let same = ItemPatch {
            reference: Some("REF-1".into()),
            ..ItemPatch::default()
        };
        let unchanged = f
            .store
            .lifecycle()
            .update_item(f.actor.id, item.id, &same)
            .expect("update");
        assert_eq!(unchanged, item);
        assert_eq!(kinds(&f.store, item.id).len(), 1);
    }

    #[test]
    fn update_rejects_blank_group() {
        let mut f = fixture();
        let item = f
            .store
            .lifecycle()
            .create_item(f.actor.id, &new_item(f.shelf.id))
            .expect("create");
        let err = f
            .store
            .lifecycle()
            .update_item(
                f.actor.id,
                item.id,
                &ItemPatch {
                    group_key: Some(String::new()),
                    ..ItemPatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "group", .. }));
    }

    #[test]
    fn delete_then_restore_round_trip() {
        let mut f = fixture();
        let item = f
            .store
            .lifecycle()
            .create_item(f.actor.id, &new_item(f.shelf.id))
            .expect("create");

        f.store
            .lifecycle()
            .delete_item(f.actor.id, item.id)
            .expect("delete");
        assert!(items::require_item(f.store.conn(), item.id).expect("item").deleted);

        let again = f.store.lifecycle().delete_item(f.actor.id, item.id).unwrap_err();
        assert!(matches!(again, StoreError::ItemDeleted { .. }));
        let track = f
            .store
            .lifecycle()
            .track_item(f.actor.id, item.id, f.shelf.id)
            .unwrap_err();
        assert!(matches!(track, StoreError::ItemDeleted { .. }));

        f.store
            .lifecycle()
            .restore_item(f.actor.id, item.id)
            .expect("restore");
        assert!(!items::require_item(f.store.conn(), item.id).expect("item").deleted);

        let twice = f.store.lifecycle().restore_item(f.actor.id, item.id).unwrap_err();
        assert!(matches!(twice, StoreError::ItemNotDeleted { .. }));

        assert_eq!(
            kinds(&f.store, item.id),
            vec!["restored", "deleted", "created"]
        );
    }

    #[test]
    fn operations_on_missing_item_are_not_found() {
        let mut f = fixture();
        let ghost = ItemId::new();
        let mut lifecycle = f.store.lifecycle();
        assert!(lifecycle.track_item(f.actor.id, ghost, f.shelf.id).unwrap_err().is_not_found());
        assert!(lifecycle.delete_item(f.actor.id, ghost).unwrap_err().is_not_found());
        assert!(lifecycle.restore_item(f.actor.id, ghost).unwrap_err().is_not_found());
        assert!(
            lifecycle
                .update_item(f.actor.id, ghost, &ItemPatch::default())
                .unwrap_err()
                .is_not_found()
        );
    }
}
