//! Demo data: the default seed and a user factory.
//!
//! Both write inside one `IMMEDIATE` transaction, so a failed seed leaves
//! nothing behind.

use chrono::Duration;
use rusqlite::Connection;
use tracing::info;

use crate::config::SeedConfig;
use crate::db::converters::millis_to_datetime;
use crate::db::{now_millis, Database};
use crate::error::Result;
use crate::store::follows::insert_edge;
use crate::store::users::insert_user;
use crate::types::{NewUser, User};

/// What [`seed_database`] wrote.
#[derive(Debug, Clone)]
pub struct SeedSummary {
    pub users: Vec<User>,
    pub statuses: usize,
}

/// Highest user id so far; generated names continue from here.
fn max_user_id(conn: &Connection) -> Result<i64> {
    let max: i64 = conn.query_row("SELECT COALESCE(MAX(id), 0) FROM users", [], |row| {
        row.get(0)
    })?;
    Ok(max)
}

fn generated_user(n: i64) -> NewUser {
    NewUser::new(format!("user{n}"), format!("user{n}@example.test"))
}

/// Create `config.users` users and give the first of them
/// `config.first_user_statuses` statuses, one minute apart.
pub fn seed_database(db: &Database, config: &SeedConfig) -> Result<SeedSummary> {
    let tx = db.immediate_transaction()?;
    let base = max_user_id(&tx)?;
    let now = now_millis();

    let users = (1..=config.users as i64)
        .map(|i| insert_user(&tx, &generated_user(base + i), now))
        .collect::<Result<Vec<_>>>()?;

    let mut statuses = 0;
    if let Some(first) = users.first() {
        let start = millis_to_datetime(now);
        let count = config.first_user_statuses as i64;
        for i in 0..count {
            let at = start - Duration::minutes(count - 1 - i);
            let body = format!("Status {} from {}", i + 1, first.name);
            db.statuses().post_at(first.id, &body, at)?;
            statuses += 1;
        }
    }

    tx.commit()?;
    info!(users = users.len(), statuses, "database seeded");
    Ok(SeedSummary { users, statuses })
}

// ---------------------------------------------------------------------------
// UserFactory
// ---------------------------------------------------------------------------

/// Builds a user together with related rows.
///
/// ```no_run
/// # use socialgraph::{Database, seed::UserFactory};
/// # fn demo(db: &Database) -> socialgraph::error::Result<()> {
/// let celebrity = UserFactory::new().has_followers(1000).create(db)?;
/// # Ok(()) }
/// ```
#[derive(Debug, Clone, Default)]
pub struct UserFactory {
    followers: usize,
    statuses: usize,
}

impl UserFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also create `n` fresh users who each follow the new user.
    pub fn has_followers(mut self, n: usize) -> Self {
        self.followers = n;
        self
    }

    /// Also create `n` statuses for the new user.
    pub fn has_statuses(mut self, n: usize) -> Self {
        self.statuses = n;
        self
    }

    pub fn create(&self, db: &Database) -> Result<User> {
        let tx = db.immediate_transaction()?;
        let base = max_user_id(&tx)?;
        let now = now_millis();

        let user = insert_user(&tx, &generated_user(base + 1), now)?;
        for i in 0..self.followers as i64 {
            let follower = insert_user(&tx, &generated_user(base + 2 + i), now)?;
            insert_edge(&tx, follower.id, user.id, None)?;
        }
        for i in 0..self.statuses {
            db.statuses()
                .post(user.id, &format!("Status {} from {}", i + 1, user.name))?;
        }

        tx.commit()?;
        info!(user = %user.id, followers = self.followers, statuses = self.statuses, "factory user created");
        Ok(user)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
