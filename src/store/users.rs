//! Identity store: user records.

use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::db::converters::{millis_to_datetime, row_to_user};
use crate::db::{now_millis, Database};
use crate::error::{classify, Result, SocialGraphError};
use crate::types::{NewUser, User, UserId};

const INSERT_USER_SQL: &str = "\
INSERT INTO users (name, email, created_at) VALUES (?1, ?2, ?3)";

/// Insert one user row on `conn`, which may be a transaction.
pub(crate) fn insert_user(conn: &Connection, new_user: &NewUser, created_at: i64) -> Result<User> {
    let mut stmt = conn.prepare_cached(INSERT_USER_SQL)?;
    stmt.execute(params![new_user.name, new_user.email, created_at])
        .map_err(classify)?;
    Ok(User {
        id: UserId(conn.last_insert_rowid()),
        name: new_user.name.clone(),
        email: new_user.email.clone(),
        created_at: millis_to_datetime(created_at),
    })
}

/// Typed access to the `users` table.
#[derive(Debug, Clone, Copy)]
pub struct UserStore<'a> {
    db: &'a Database,
}

impl<'a> UserStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    // -------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------

    /// Register a user. A duplicate email is a [`SocialGraphError::ConstraintViolation`].
    pub fn create(&self, new_user: &NewUser) -> Result<User> {
        let user = insert_user(self.db.conn(), new_user, now_millis())?;
        info!(user = %user.id, name = %user.name, "user created");
        Ok(user)
    }

    /// Register several users inside a single transaction.
    pub fn create_many(&self, new_users: &[NewUser]) -> Result<Vec<User>> {
        let created_at = now_millis();
        let tx = self.db.conn().unchecked_transaction()?;
        let users = new_users
            .iter()
            .map(|new_user| insert_user(&tx, new_user, created_at))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;
        info!(count = users.len(), "users created");
        Ok(users)
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Retrieve a user by id, or `None` if it doesn't exist.
    pub fn find(&self, id: UserId) -> Result<Option<User>> {
        let mut stmt = self
            .db
            .conn()
            .prepare_cached("SELECT * FROM users WHERE id = ?1")?;
        let mut rows = stmt.query_and_then(params![id], row_to_user)?;
        match rows.next() {
            Some(Ok(user)) => Ok(Some(user)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// Retrieve a user by id, failing with `NotFound` if it doesn't exist.
    pub fn find_or_fail(&self, id: UserId) -> Result<User> {
        self.find(id)?
            .ok_or_else(|| SocialGraphError::user_not_found(id))
    }

    /// Fetch every listed user that exists, ordered by id, in one query.
    pub fn find_many(&self, ids: &[UserId]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(",");
        let sql = format!("SELECT * FROM users WHERE id IN ({placeholders}) ORDER BY id");
        let mut stmt = self.db.conn().prepare(&sql)?;
        let rows = stmt.query_and_then(rusqlite::params_from_iter(ids.iter()), row_to_user)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    pub fn exists(&self, id: UserId) -> Result<bool> {
        let mut stmt = self
            .db
            .conn()
            .prepare_cached("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)")?;
        let found: bool = stmt.query_row(params![id], |row| row.get(0))?;
        Ok(found)
    }

    /// Fail with `NotFound` unless the user exists.
    pub(crate) fn ensure_exists(&self, id: UserId) -> Result<()> {
        if self.exists(id)? {
            Ok(())
        } else {
            debug!(user = %id, "user lookup missed");
            Err(SocialGraphError::user_not_found(id))
        }
    }

    /// Total number of users.
    pub fn count(&self) -> Result<usize> {
        let mut stmt = self.db.conn().prepare_cached("SELECT count(*) FROM users")?;
        let count: i64 = stmt.query_row([], |row| row.get(0))?;
        Ok(count as usize)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
