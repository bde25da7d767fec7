//! The data-access handle every store borrows.
//!
//! A [`Database`] owns one SQLite connection. Callers acquire one per
//! request (or per worker) and pass it explicitly to the stores; nothing in
//! the crate keeps a global connection.

use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::debug;

use super::schema::{apply_schema, initialize_database_with_timeout, DEFAULT_BUSY_TIMEOUT};
use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::graph::GraphQuery;
use crate::store::{FollowStore, StatusStore, UserStore};
use crate::timeline::Timeline;

pub struct Database {
    conn: Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Open (or create) the database at `path` with the default busy timeout.
    pub fn open(path: &str) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open the database described by a [`DatabaseConfig`].
    pub fn open_with(config: &DatabaseConfig) -> Result<Self> {
        Self::open_with_timeout(
            &config.path,
            Duration::from_millis(config.busy_timeout_ms),
        )
    }

    fn open_with_timeout(path: &str, busy_timeout: Duration) -> Result<Self> {
        debug!(path, ?busy_timeout, "opening database");
        let conn = initialize_database_with_timeout(path, busy_timeout)?;
        Ok(Self { conn })
    }

    /// A fresh private in-memory database. Mostly useful in tests.
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    /// Wrap an already-open connection, applying the schema if missing.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Start a write transaction that takes the database write lock up front,
    /// so check-then-write sequences inside it are serialised against other
    /// connections.
    pub(crate) fn immediate_transaction(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    // -------------------------------------------------------------------
    // Store accessors
    // -------------------------------------------------------------------

    pub fn users(&self) -> UserStore<'_> {
        UserStore::new(self)
    }

    pub fn follows(&self) -> FollowStore<'_> {
        FollowStore::new(self)
    }

    pub fn statuses(&self) -> StatusStore<'_> {
        StatusStore::new(self)
    }

    pub fn graph(&self) -> GraphQuery<'_> {
        GraphQuery::new(self)
    }

    pub fn timeline(&self) -> Timeline<'_> {
        Timeline::new(self)
    }
}
