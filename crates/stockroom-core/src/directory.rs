//! User and location directories.
//!
//! The history engine does not own users or locations; it looks them up
//! through these traits. [`SqliteDirectory`] serves both from the store's
//! own tables, and also carries the few writes the CLI needs to seed them.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::{Result, StoreError};
use crate::model::ids::{LocationId, UserId};
use crate::model::time::now_us;
use crate::model::{Location, User};

/// Looks up users by id.
pub trait UserDirectory {
    /// # Errors
    ///
    /// [`StoreError::UserNotFound`] if no user has this id; any other error
    /// is a lookup failure and should be propagated.
    fn get_user(&self, user_id: UserId) -> Result<User>;
}

/// Looks up locations by id.
pub trait LocationDirectory {
    /// Returns the location even if it is deleted or a user proxy; callers
    /// decide what they accept.
    ///
    /// # Errors
    ///
    /// [`StoreError::LocationNotFound`] if no location has this id.
    fn get_location(&self, location_id: LocationId) -> Result<Location>;
}

impl<T: UserDirectory + ?Sized> UserDirectory for &T {
    fn get_user(&self, user_id: UserId) -> Result<User> {
        (**self).get_user(user_id)
    }
}

impl<T: LocationDirectory + ?Sized> LocationDirectory for &T {
    fn get_location(&self, location_id: LocationId) -> Result<Location> {
        (**self).get_location(location_id)
    }
}

/// Directory backed by the `users` and `locations` tables.
#[derive(Debug, Clone, Copy)]
pub struct SqliteDirectory<'a> {
    conn: &'a Connection,
}

const LOCATION_COLUMNS: &str =
    "location_id, name, description, is_deleted, is_user, created_at_us, updated_at_us";
const USER_COLUMNS: &str = "user_id, name, username, created_at_us";

fn row_to_location(row: &Row<'_>) -> rusqlite::Result<Location> {
    Ok(Location {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        is_deleted: row.get::<_, i64>(3)? != 0,
        is_user: row.get::<_, i64>(4)? != 0,
        created_at_us: row.get(5)?,
        updated_at_us: row.get(6)?,
    })
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        username: row.get(2)?,
        created_at_us: row.get(3)?,
    })
}

fn required(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::validation(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

impl<'a> SqliteDirectory<'a> {
    #[must_use]
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Add a location items can be tracked to.
    ///
    /// # Errors
    ///
    /// [`StoreError::Validation`] for an empty name; [`StoreError::Storage`]
    /// if the insert fails.
    pub fn add_location(&self, name: &str, description: Option<&str>) -> Result<Location> {
        self.insert_location(name, description, false)
    }

    /// Add a user-proxy location: a row that stands for a person in data
    /// imported from systems that kept people in the location table.
    /// Proxies are listed but never accepted as a `tracked` destination.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_location`].
    pub fn add_user_proxy(&self, name: &str) -> Result<Location> {
        self.insert_location(name, None, true)
    }

    fn insert_location(
        &self,
        name: &str,
        description: Option<&str>,
        is_user: bool,
    ) -> Result<Location> {
        let now = now_us();
        let location = Location {
            id: LocationId::new(),
            name: required("name", name)?,
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(ToOwned::to_owned),
            is_deleted: false,
            is_user,
            created_at_us: now,
            updated_at_us: now,
        };
        self.conn.execute(
            "INSERT INTO locations (
                location_id, name, description, is_deleted, is_user, created_at_us, updated_at_us
             ) VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6)",
            params![
                location.id,
                location.name,
                location.description,
                i64::from(is_user),
                location.created_at_us,
                location.updated_at_us,
            ],
        )?;
        tracing::debug!(location_id = %location.id, is_user, "added location");
        Ok(location)
    }

    /// Locations sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] if the query fails.
    pub fn list_locations(&self, include_deleted: bool) -> Result<Vec<Location>> {
        let mut sql = format!("SELECT {LOCATION_COLUMNS} FROM locations");
        if !include_deleted {
            sql.push_str(" WHERE is_deleted = 0");
        }
        sql.push_str(" ORDER BY name ASC, location_id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], row_to_location)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Add a user.
    ///
    /// # Errors
    ///
    /// [`StoreError::Validation`] for an empty or already-taken username or
    /// an empty name.
    pub fn add_user(&self, name: &str, username: &str) -> Result<User> {
        let user = User {
            id: UserId::new(),
            name: required("name", name)?,
            username: required("username", username)?,
            created_at_us: now_us(),
        };
        if self.find_user_by_username(&user.username)?.is_some() {
            return Err(StoreError::validation(
                "username",
                format!("'{}' is already taken", user.username),
            ));
        }
        self.conn.execute(
            "INSERT INTO users (user_id, name, username, created_at_us) VALUES (?1, ?2, ?3, ?4)",
            params![user.id, user.name, user.username, user.created_at_us],
        )?;
        tracing::debug!(user_id = %user.id, "added user");
        Ok(user)
    }

    /// Users sorted by username.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] if the query fails.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY username ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], row_to_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] if the query fails.
    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![username.trim()], row_to_user)
            .optional()?)
    }
}

impl UserDirectory for SqliteDirectory<'_> {
    fn get_user(&self, user_id: UserId) -> Result<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1");
        self.conn
            .query_row(&sql, params![user_id], row_to_user)
            .optional()?
            .ok_or(StoreError::UserNotFound { user_id })
    }
}

impl LocationDirectory for SqliteDirectory<'_> {
    fn get_location(&self, location_id: LocationId) -> Result<Location> {
        let sql = format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE location_id = ?1");
        self.conn
            .query_row(&sql, params![location_id], row_to_location)
            .optional()?
            .ok_or(StoreError::LocationNotFound { location_id })
    }
}
