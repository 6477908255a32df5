//! Item rows: descriptive state and the soft-delete flag.
//!
//! Writes here are building blocks for [`crate::lifecycle`], which pairs
//! each one with a history append in the same transaction. Nothing in this
//! module records position.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::{Result, StoreError};
use crate::model::Item;
use crate::model::ids::ItemId;

const SELECT_COLUMNS: &str = "item_id, identifier, reference, group_key, description, \
                              deleted, created_at_us, updated_at_us";

/// Filter for [`list_items`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    /// Exact group key.
    pub group: Option<String>,
    /// Include soft-deleted items. Off by default.
    pub include_deleted: bool,
    pub limit: Option<u32>,
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        identifier: row.get(1)?,
        reference: row.get(2)?,
        group_key: row.get(3)?,
        description: row.get(4)?,
        deleted: row.get::<_, i64>(5)? != 0,
        created_at_us: row.get(6)?,
        updated_at_us: row.get(7)?,
    })
}

/// True when `err` is the UNIQUE violation on `items.identifier`.
fn is_identifier_conflict(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, Some(message))
            if inner.code == rusqlite::ErrorCode::ConstraintViolation
                && message.contains("items.identifier")
    )
}

/// Insert a new item row.
///
/// # Errors
///
/// - [`StoreError::DuplicateIdentifier`] if another item has the same
///   identifier.
/// - [`StoreError::Storage`] for any other database failure.
pub fn insert_item(conn: &Connection, item: &Item) -> Result<()> {
    conn.execute(
        "INSERT INTO items (
            item_id, identifier, reference, group_key, description,
            deleted, created_at_us, updated_at_us
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            item.id,
            item.identifier,
            item.reference,
            item.group_key,
            item.description,
            i64::from(item.deleted),
            item.created_at_us,
            item.updated_at_us,
        ],
    )
    .map_err(|err| match &item.identifier {
        Some(identifier) if is_identifier_conflict(&err) => StoreError::DuplicateIdentifier {
            identifier: identifier.clone(),
        },
        _ => StoreError::Storage(err),
    })?;
    Ok(())
}

/// Fetch an item by id, deleted or not.
///
/// # Errors
///
/// Returns [`StoreError::Storage`] if the query fails.
pub fn get_item(conn: &Connection, item_id: ItemId) -> Result<Option<Item>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM items WHERE item_id = ?1");
    Ok(conn
        .query_row(&sql, params![item_id], row_to_item)
        .optional()?)
}

/// Like [`get_item`], but a missing item is an error.
///
/// # Errors
///
/// Returns [`StoreError::ItemNotFound`] if no row exists.
pub fn require_item(conn: &Connection, item_id: ItemId) -> Result<Item> {
    get_item(conn, item_id)?.ok_or(StoreError::ItemNotFound { item_id })
}

/// Fetch an item by its secondary identifier.
///
/// # Errors
///
/// Returns [`StoreError::Storage`] if the query fails.
pub fn find_by_identifier(conn: &Connection, identifier: &str) -> Result<Option<Item>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM items WHERE identifier = ?1");
    Ok(conn
        .query_row(&sql, params![identifier.trim()], row_to_item)
        .optional()?)
}

/// List items, newest first.
///
/// # Errors
///
/// Returns [`StoreError::Storage`] if the query fails.
pub fn list_items(conn: &Connection, filter: &ItemFilter) -> Result<Vec<Item>> {
    let mut sql = format!(
        "SELECT {SELECT_COLUMNS} FROM items
         WHERE (?1 IS NULL OR group_key = ?1)"
    );
    if !filter.include_deleted {
        sql.push_str(" AND deleted = 0");
    }
    sql.push_str(" ORDER BY created_at_us DESC, item_id ASC");
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(params![filter.group], row_to_item)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

/// Write the descriptive fields and `updated_at_us` of an existing item.
///
/// # Errors
///
/// Returns [`StoreError::ItemNotFound`] if no row was updated.
pub fn update_fields(conn: &Connection, item: &Item) -> Result<()> {
    let changed = conn.execute(
        "UPDATE items
         SET reference = ?2, group_key = ?3, description = ?4, updated_at_us = ?5
         WHERE item_id = ?1",
        params![
            item.id,
            item.reference,
            item.group_key,
            item.description,
            item.updated_at_us,
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::ItemNotFound { item_id: item.id });
    }
    Ok(())
}

/// Set or clear the soft-delete flag.
///
/// # Errors
///
/// Returns [`StoreError::ItemNotFound`] if no row was updated.
pub fn set_deleted(conn: &Connection, item_id: ItemId, deleted: bool, at_us: i64) -> Result<()> {
    let changed = conn.execute(
        "UPDATE items SET deleted = ?2, updated_at_us = ?3 WHERE item_id = ?1",
        params![item_id, i64::from(deleted), at_us],
    )?;
    if changed == 0 {
        return Err(StoreError::ItemNotFound { item_id });
    }
    Ok(())
}

/// Bump `updated_at_us` after a tracking event.
///
/// # Errors
///
/// Returns [`StoreError::ItemNotFound`] if no row was updated.
pub fn touch(conn: &Connection, item_id: ItemId, at_us: i64) -> Result<()> {
    let changed = conn.execute(
        "UPDATE items SET updated_at_us = ?2 WHERE item_id = ?1",
        params![item_id, at_us],
    )?;
    if changed == 0 {
        return Err(StoreError::ItemNotFound { item_id });
    }
    Ok(())
}

/// Distinct group keys of active items, sorted.
///
/// `filter` is a case-insensitive substring match. At most `max` keys are
/// returned; a `max` of zero is treated as one.
///
/// # Errors
///
/// Returns [`StoreError::Storage`] if the query fails.
pub fn list_groups(conn: &Connection, max: u32, filter: Option<&str>) -> Result<Vec<String>> {
    let filter = filter.map(str::trim).filter(|f| !f.is_empty());
    let mut stmt = conn.prepare(
        "SELECT DISTINCT group_key FROM items
         WHERE deleted = 0
           AND (?1 IS NULL OR instr(lower(group_key), lower(?1)) > 0)
         ORDER BY group_key ASC
         LIMIT ?2",
    )?;
    let groups = stmt
        .query_map(params![filter, max.max(1)], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(groups)
}

/// Whether any active item carries `group`.
///
/// # Errors
///
/// Returns [`StoreError::Storage`] if the query fails.
pub fn group_exists(conn: &Connection, group: &str) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM items WHERE group_key = ?1 AND deleted = 0)",
        params![group],
        |row| row.get(0),
    )?)
}
