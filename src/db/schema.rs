//! SQLite schema initialization for the social graph.

use std::time::Duration;

use rusqlite::Connection;

// ---------------------------------------------------------------------------
// DDL constants: one statement each so a failing statement is easy to spot.
// ---------------------------------------------------------------------------

const CREATE_USERS: &str = "\
CREATE TABLE IF NOT EXISTS users (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  email TEXT NOT NULL UNIQUE,
  created_at INTEGER NOT NULL
)";

const CREATE_FOLLOWS: &str = "\
CREATE TABLE IF NOT EXISTS follows (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  follower_id INTEGER NOT NULL,
  followee_id INTEGER NOT NULL,
  created_at INTEGER NOT NULL,
  properties TEXT,
  CHECK (follower_id <> followee_id),
  FOREIGN KEY (follower_id) REFERENCES users(id) ON DELETE CASCADE,
  FOREIGN KEY (followee_id) REFERENCES users(id) ON DELETE CASCADE
)";

const CREATE_STATUSES: &str = "\
CREATE TABLE IF NOT EXISTS statuses (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id INTEGER NOT NULL,
  body TEXT NOT NULL,
  created_at INTEGER NOT NULL,
  FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
)";

// Indexes ----------------------------------------------------------------

const CREATE_INDEXES: &[&str] = &[
    // At most one edge per ordered pair; also serves follower-side lookups.
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_follows_pair ON follows(follower_id, followee_id)",
    "CREATE INDEX IF NOT EXISTS idx_follows_followee ON follows(followee_id, follower_id)",
    "CREATE INDEX IF NOT EXISTS idx_statuses_user_created ON statuses(user_id, created_at)",
];

/// Default time a connection waits on a locked database before giving up.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Open (or create) the SQLite database at `db_path` and apply the schema.
///
/// The returned connection has WAL mode, foreign keys ON, synchronous
/// NORMAL and a busy timeout configured.
///
/// # Errors
///
/// Returns a `rusqlite::Error` if the database cannot be opened or any DDL
/// statement fails.
pub fn initialize_database(db_path: &str) -> rusqlite::Result<Connection> {
    initialize_database_with_timeout(db_path, DEFAULT_BUSY_TIMEOUT)
}

/// Same as [`initialize_database`] with an explicit busy timeout.
pub fn initialize_database_with_timeout(
    db_path: &str,
    busy_timeout: Duration,
) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(busy_timeout)?;

    // -- Pragmas ----------------------------------------------------------
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    apply_schema(&conn)?;
    Ok(conn)
}

/// Create every table and index. Idempotent.
pub fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CREATE_USERS)?;
    conn.execute_batch(CREATE_FOLLOWS)?;
    conn.execute_batch(CREATE_STATUSES)?;

    for ddl in CREATE_INDEXES {
        conn.execute_batch(ddl)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
