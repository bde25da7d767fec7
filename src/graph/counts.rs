//! Aggregate relation counts for one user or a batch of users.
//!
//! Counts are attached with correlated sub-selects, one per requested
//! relation, so a batch costs one statement per [`MAX_BATCH`] ids no matter
//! how many edges each user has.

use std::collections::{BTreeSet, HashMap};

use rusqlite::Row;
use tracing::debug;

use super::friends::{GraphQuery, MUTUAL_JOIN};
use crate::db::converters::row_to_user;
use crate::error::{Result, SocialGraphError};
use crate::types::{RelationCounts, RelationKind, UserId, UserWithCounts};

/// Ids bound per statement; keeps well under SQLite's variable limit.
pub const MAX_BATCH: usize = 500;

/// `(<sub-select>) AS <kind>_count` for `kind`, correlated on `u.id`.
fn count_column(kind: RelationKind) -> String {
    let sub = match kind {
        RelationKind::Followings => {
            "SELECT count(*) FROM follows c WHERE c.follower_id = u.id".to_string()
        }
        RelationKind::Followers => {
            "SELECT count(*) FROM follows c WHERE c.followee_id = u.id".to_string()
        }
        RelationKind::Friends => {
            format!("SELECT count(*) FROM follows f {MUTUAL_JOIN} WHERE f.follower_id = u.id")
        }
        RelationKind::Statuses => {
            "SELECT count(*) FROM statuses s WHERE s.user_id = u.id".to_string()
        }
    };
    format!("({sub}) AS {kind}_count")
}

/// Deduplicate and order the requested kinds; an empty request is an error.
fn normalize(kinds: &[RelationKind]) -> Result<BTreeSet<RelationKind>> {
    let set: BTreeSet<RelationKind> = kinds.iter().copied().collect();
    if set.is_empty() {
        return Err(SocialGraphError::InvalidArgument(
            "at least one relation must be requested".to_string(),
        ));
    }
    Ok(set)
}

fn counts_sql(select: &str, kinds: &BTreeSet<RelationKind>, batch: usize) -> String {
    let columns: Vec<String> = kinds.iter().map(|&k| count_column(k)).collect();
    let placeholders = vec!["?"; batch].join(",");
    format!(
        "SELECT {select}, {} FROM users u WHERE u.id IN ({placeholders}) ORDER BY u.id",
        columns.join(", ")
    )
}

fn read_counts(row: &Row<'_>, kinds: &BTreeSet<RelationKind>) -> rusqlite::Result<RelationCounts> {
    let mut counts = RelationCounts::default();
    for &kind in kinds {
        let column = format!("{kind}_count");
        let n: i64 = row.get(column.as_str())?;
        counts.set(kind, n as usize);
    }
    Ok(counts)
}

impl<'a> GraphQuery<'a> {
    /// Load the listed users (ordered by id, missing ids skipped, repeats
    /// collapsed) with the requested relation counts attached.
    pub fn with_count(
        &self,
        ids: &[UserId],
        kinds: &[RelationKind],
    ) -> Result<Vec<UserWithCounts>> {
        let kinds = normalize(kinds)?;
        // Sorted and unique, so chunk results concatenate in id order.
        let ids: Vec<UserId> = ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut out = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_BATCH) {
            let sql = counts_sql("u.id, u.name, u.email, u.created_at", &kinds, chunk.len());
            let mut stmt = self.db.conn().prepare_cached(&sql)?;
            let rows = stmt.query_and_then(rusqlite::params_from_iter(chunk.iter()), |row| {
                Ok::<_, rusqlite::Error>(UserWithCounts {
                    user: row_to_user(row)?,
                    counts: read_counts(row, &kinds)?,
                })
            })?;
            for row in rows {
                out.push(row?);
            }
        }
        debug!(users = out.len(), relations = kinds.len(), "counts attached");
        Ok(out)
    }

    /// Single-user form of [`with_count`](Self::with_count).
    pub fn find_with_count(&self, id: UserId, kinds: &[RelationKind]) -> Result<UserWithCounts> {
        self.with_count(&[id], kinds)?
            .pop()
            .ok_or_else(|| SocialGraphError::user_not_found(id))
    }

    /// Attach the requested counts to users that are already loaded,
    /// keeping any counts they carry for other relations. If any user no
    /// longer exists nothing is written.
    pub fn load_count(&self, users: &mut [UserWithCounts], kinds: &[RelationKind]) -> Result<()> {
        let kinds = normalize(kinds)?;
        let ids: Vec<UserId> = users
            .iter()
            .map(|u| u.user.id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut fetched: HashMap<UserId, RelationCounts> = HashMap::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_BATCH) {
            let sql = counts_sql("u.id", &kinds, chunk.len());
            let mut stmt = self.db.conn().prepare_cached(&sql)?;
            let rows = stmt.query_and_then(rusqlite::params_from_iter(chunk.iter()), |row| {
                Ok::<_, rusqlite::Error>((row.get::<_, UserId>("id")?, read_counts(row, &kinds)?))
            })?;
            for row in rows {
                let (id, counts) = row?;
                fetched.insert(id, counts);
            }
        }

        if let Some(missing) = ids.iter().find(|id| !fetched.contains_key(*id)) {
            return Err(SocialGraphError::user_not_found(*missing));
        }

        for user in users.iter_mut() {
            let Some(counts) = fetched.get(&user.user.id) else {
                continue;
            };
            for &kind in &kinds {
                if let Some(n) = counts.get(kind) {
                    user.counts.set(kind, n);
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
