//! Status store: the posts a timeline is composed from.

use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::info;

use crate::db::converters::{datetime_to_millis, millis_to_datetime, row_to_status};
use crate::db::{now_millis, Database};
use crate::error::{Result, SocialGraphError};
use crate::types::{Status, StatusId, UserId};

const INSERT_STATUS_SQL: &str = "\
INSERT INTO statuses (user_id, body, created_at) VALUES (?1, ?2, ?3)";

#[derive(Debug, Clone, Copy)]
pub struct StatusStore<'a> {
    db: &'a Database,
}

impl<'a> StatusStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Publish a status for `user` stamped with the current time.
    pub fn post(&self, user: UserId, body: &str) -> Result<Status> {
        self.insert(user, body, now_millis())
    }

    /// Publish a status with an explicit creation time.
    pub fn post_at(&self, user: UserId, body: &str, at: DateTime<Utc>) -> Result<Status> {
        self.insert(user, body, datetime_to_millis(&at))
    }

    fn insert(&self, user: UserId, body: &str, created_at: i64) -> Result<Status> {
        if body.trim().is_empty() {
            return Err(SocialGraphError::InvalidArgument(
                "status body must not be empty".to_string(),
            ));
        }
        self.db.users().ensure_exists(user)?;

        let mut stmt = self.db.conn().prepare_cached(INSERT_STATUS_SQL)?;
        stmt.execute(params![user, body, created_at])?;
        let id = StatusId(self.db.conn().last_insert_rowid());
        info!(%user, status = %id, "status posted");
        Ok(Status {
            id,
            user_id: user,
            body: body.to_string(),
            created_at: millis_to_datetime(created_at),
        })
    }

    pub fn find(&self, id: StatusId) -> Result<Option<Status>> {
        let mut stmt = self
            .db
            .conn()
            .prepare_cached("SELECT * FROM statuses WHERE id = ?1")?;
        let mut rows = stmt.query_and_then(params![id], row_to_status)?;
        match rows.next() {
            Some(Ok(status)) => Ok(Some(status)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// Every status owned by `user`, newest first.
    pub fn for_user(&self, user: UserId) -> Result<Vec<Status>> {
        let mut stmt = self.db.conn().prepare_cached(
            "SELECT * FROM statuses WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_and_then(params![user], row_to_status)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    pub fn count_for_user(&self, user: UserId) -> Result<usize> {
        let mut stmt = self
            .db
            .conn()
            .prepare_cached("SELECT count(*) FROM statuses WHERE user_id = ?1")?;
        let count: i64 = stmt.query_row(params![user], |row| row.get(0))?;
        Ok(count as usize)
    }
}
