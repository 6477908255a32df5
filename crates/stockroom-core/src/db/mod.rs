//! SQLite store utilities.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so readers run while a writer appends
//! - `busy_timeout = 5s` to absorb brief lock contention between processes
//! - `foreign_keys = ON` so history rows pin their item rows

pub mod history;
pub mod items;
pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::{path::Path, time::Duration};

use crate::directory::SqliteDirectory;
use crate::history::HistoryProjector;
use crate::lifecycle::Lifecycle;
use crate::resolve::CurrentLocationResolver;

/// Busy timeout used for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// File name of the store database inside the project directory.
pub const STORE_DB_FILE: &str = "stockroom.sqlite3";

/// One connection to the item store.
///
/// A `Store` is not shared between threads; each worker opens its own.
/// Every accessor borrows the connection, so components built from one
/// store always see the same database.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the store at `path`, apply pragmas, and migrate.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// database cannot be opened, configured or migrated.
    pub fn open(path: &Path) -> Result<Self> {
        open_store(path).map(|conn| Self { conn })
    }

    /// Open a private in-memory store. Used by tests and benchmarks.
    ///
    /// # Errors
    ///
    /// Returns an error if configuring or migrating the database fails.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().context("open in-memory store")?;
        configure_connection(&conn).context("configure sqlite pragmas")?;
        migrations::migrate(&mut conn).context("apply store migrations")?;
        Ok(Self { conn })
    }

    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Users and locations backed by this store.
    #[must_use]
    pub const fn directory(&self) -> SqliteDirectory<'_> {
        SqliteDirectory::new(&self.conn)
    }

    /// Current-position lookups against this store's own directory.
    #[must_use]
    pub const fn resolver(&self) -> CurrentLocationResolver<'_, SqliteDirectory<'_>> {
        CurrentLocationResolver::new(&self.conn, SqliteDirectory::new(&self.conn))
    }

    /// History projection against this store's own directory.
    #[must_use]
    pub const fn projector(&self) -> HistoryProjector<'_, SqliteDirectory<'_>> {
        HistoryProjector::new(&self.conn, SqliteDirectory::new(&self.conn))
    }

    /// The writer for item rows and history.
    pub const fn lifecycle(&mut self) -> Lifecycle<'_> {
        Lifecycle::new(&mut self.conn)
    }
}

/// Open (or create) the store database, apply runtime pragmas, and migrate
/// the schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create store directory {}", parent.display()))?;
        }
    }

    let mut conn =
        Connection::open(path).with_context(|| format!("open store {}", path.display()))?;

    configure_connection(&conn).context("configure sqlite pragmas")?;
    let version = migrations::migrate(&mut conn).context("apply store migrations")?;
    tracing::debug!(path = %path.display(), schema_version = version, "opened store");

    Ok(conn)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}
