//! Append-only persistence of item history events.
//!
//! Rows are never updated or deleted (the schema triggers enforce this).
//! Reads are fresh queries; nothing here caches.

use rusqlite::{Connection, Row, params};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::event::{CodecError, EventData, EventKind, HistoryEvent, codec};
use crate::model::ids::{EventId, ItemId, UserId};
use crate::model::time::{monotonic_after, now_us};

/// A history row as stored, before its payload is decoded.
///
/// Listing returns rows in this form so a consumer can skip one bad row
/// without losing the rest of the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    pub id: EventId,
    pub user_id: UserId,
    pub item_id: ItemId,
    /// Raw `kind` column; may hold a tag this build does not know.
    pub kind: String,
    pub data: Vec<u8>,
    pub created_at_us: i64,
}

impl StoredEvent {
    /// Decode the envelope and check it agrees with the `kind` column.
    ///
    /// # Errors
    ///
    /// - [`CodecError::UnknownEventKind`] if either tag is unrecognized.
    /// - [`CodecError::MalformedPayload`] if the payload does not fit its
    ///   kind or the envelope tag differs from the column.
    pub fn decode(&self) -> std::result::Result<HistoryEvent, CodecError> {
        let column_kind: EventKind =
            self.kind
                .parse()
                .map_err(|_| CodecError::UnknownEventKind {
                    raw: self.kind.clone(),
                })?;
        let data = codec::decode(&self.data)?;
        if data.kind() != column_kind {
            return Err(CodecError::MalformedPayload {
                kind: Some(column_kind),
                reason: format!(
                    "envelope tag '{}' does not match kind column",
                    data.kind()
                ),
            });
        }

        Ok(HistoryEvent {
            id: self.id,
            user_id: self.user_id,
            item_id: self.item_id,
            created_at_us: self.created_at_us,
            data,
        })
    }
}

const SELECT_COLUMNS: &str = "id, user_id, item_id, kind, data, created_at_us";

fn row_to_stored(row: &Row<'_>) -> rusqlite::Result<StoredEvent> {
    Ok(StoredEvent {
        id: row.get(0)?,
        user_id: row.get(1)?,
        item_id: row.get(2)?,
        kind: row.get(3)?,
        data: row.get(4)?,
        created_at_us: row.get(5)?,
    })
}

/// Append one event for `item_id`, acted by `user_id`.
///
/// The timestamp is the current time, bumped past the item's latest event
/// if the clock has not advanced, so per-item order by time matches insert
/// order. Pass a [`rusqlite::Transaction`] to compose with an item write.
///
/// # Errors
///
/// Returns [`StoreError::Codec`] if the payload cannot be encoded and
/// [`StoreError::Storage`] if the insert fails (including a missing item
/// row, which the foreign key rejects).
pub fn append(
    conn: &Connection,
    item_id: ItemId,
    user_id: UserId,
    data: &EventData,
) -> Result<HistoryEvent> {
    let bytes = codec::encode(data)?;
    let latest: Option<i64> = conn.query_row(
        "SELECT MAX(created_at_us) FROM item_history WHERE item_id = ?1",
        params![item_id],
        |row| row.get(0),
    )?;
    let created_at_us = monotonic_after(now_us(), latest);

    let id = insert_row(
        conn,
        item_id,
        user_id,
        data.kind().as_str(),
        &bytes,
        created_at_us,
    )?;
    debug!(%item_id, event_id = %id, kind = %data.kind(), "appended history event");

    Ok(HistoryEvent {
        id,
        user_id,
        item_id,
        created_at_us,
        data: data.clone(),
    })
}

/// Append a pre-encoded row verbatim.
///
/// Used when importing history produced elsewhere. Neither the kind nor the
/// payload is validated; readers skip rows they cannot decode.
///
/// # Errors
///
/// Returns [`StoreError::Storage`] if the insert fails.
pub fn import_raw(
    conn: &Connection,
    item_id: ItemId,
    user_id: UserId,
    kind: &str,
    data: &[u8],
    created_at_us: i64,
) -> Result<EventId> {
    let id = insert_row(conn, item_id, user_id, kind, data, created_at_us)?;
    debug!(%item_id, event_id = %id, kind, "imported raw history row");
    Ok(id)
}

fn insert_row(
    conn: &Connection,
    item_id: ItemId,
    user_id: UserId,
    kind: &str,
    data: &[u8],
    created_at_us: i64,
) -> Result<EventId> {
    conn.execute(
        "INSERT INTO item_history (user_id, item_id, kind, data, created_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, item_id, kind, data, created_at_us],
    )?;
    Ok(EventId(conn.last_insert_rowid()))
}

/// All rows for `item_id`, newest first (`created_at_us DESC, id DESC`).
///
/// # Errors
///
/// Returns [`StoreError::Storage`] if the query fails.
pub fn list_by_item(conn: &Connection, item_id: ItemId) -> Result<Vec<StoredEvent>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM item_history
         WHERE item_id = ?1
         ORDER BY created_at_us DESC, id DESC"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map(params![item_id], row_to_stored)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// The most recent readable `created`, `tracked` or `tracked-user` event.
///
/// Filters on the `kind` column, so rows of other kinds are never decoded.
/// Positional rows that fail to decode are logged and skipped, the same way
/// the projector treats them.
///
/// # Errors
///
/// - [`StoreError::PositionUnknown`] if the item has no readable positional
///   event.
/// - [`StoreError::Storage`] if the query fails.
pub fn latest_positional_event(conn: &Connection, item_id: ItemId) -> Result<HistoryEvent> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM item_history
         WHERE item_id = ?1 AND kind IN (?2, ?3, ?4)
         ORDER BY created_at_us DESC, id DESC"
    );
    let [created, tracked, tracked_user] = EventKind::POSITIONAL.map(EventKind::as_str);
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(
        params![item_id, created, tracked, tracked_user],
        row_to_stored,
    )?;

    for stored in rows {
        let stored = stored?;
        match stored.decode() {
            Ok(event) => return Ok(event),
            Err(err) => {
                tracing::warn!(%item_id, event_id = %stored.id, error = %err, "skipping unreadable positional event");
            }
        }
    }
    Err(StoreError::PositionUnknown { item_id })
}

/// Number of events recorded for `item_id`.
///
/// # Errors
///
/// Returns [`StoreError::Storage`] if the query fails.
pub fn count_for_item(conn: &Connection, item_id: ItemId) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM item_history WHERE item_id = ?1",
        params![item_id],
        |row| row.get(0),
    )?;
    Ok(u64::try_from(count).unwrap_or(0))
}
