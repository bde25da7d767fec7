//! Friend (mutual-follow) queries.
//!
//! A friend of `u` is anyone `u` follows who follows `u` back. Every query
//! here resolves that with a self-join on `follows`, so SQLite computes the
//! intersection and nothing is filtered in Rust.

use rusqlite::params;
use tracing::debug;

use crate::db::converters::{row_to_related, RELATED_COLUMNS};
use crate::db::Database;
use crate::error::Result;
use crate::types::{Related, UserId};

// ---------------------------------------------------------------------------
// SQL constants
// ---------------------------------------------------------------------------

/// Join condition pairing an edge `f` with its reverse edge `b`.
pub(crate) const MUTUAL_JOIN: &str =
    "JOIN follows b ON b.follower_id = f.followee_id AND b.followee_id = f.follower_id";

const ARE_FRIENDS_SQL: &str = "\
SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ?1 AND followee_id = ?2)
   AND EXISTS(SELECT 1 FROM follows WHERE follower_id = ?2 AND followee_id = ?1)";

fn friends_sql() -> String {
    format!(
        "SELECT {RELATED_COLUMNS} FROM follows f {MUTUAL_JOIN} \
         JOIN users u ON u.id = f.followee_id \
         WHERE f.follower_id = ?1 ORDER BY f.id"
    )
}

fn friend_ids_sql() -> String {
    format!("SELECT f.followee_id FROM follows f {MUTUAL_JOIN} WHERE f.follower_id = ?1 ORDER BY f.id")
}

fn count_friends_sql() -> String {
    format!("SELECT count(*) FROM follows f {MUTUAL_JOIN} WHERE f.follower_id = ?1")
}

// ---------------------------------------------------------------------------
// GraphQuery
// ---------------------------------------------------------------------------

/// Derived-relation queries over the follow graph.
#[derive(Debug, Clone, Copy)]
pub struct GraphQuery<'a> {
    pub(crate) db: &'a Database,
}

impl<'a> GraphQuery<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Users that `user` follows and that follow `user` back, ordered by
    /// when `user` followed them. Each carries the outgoing edge.
    pub fn friends(&self, user: UserId) -> Result<Vec<Related>> {
        debug!(%user, "loading friends");
        let mut stmt = self.db.conn().prepare_cached(&friends_sql())?;
        let rows = stmt.query_and_then(params![user], row_to_related)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    pub fn friend_ids(&self, user: UserId) -> Result<Vec<UserId>> {
        let mut stmt = self.db.conn().prepare_cached(&friend_ids_sql())?;
        let rows = stmt.query_map(params![user], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    pub fn count_friends(&self, user: UserId) -> Result<usize> {
        let mut stmt = self.db.conn().prepare_cached(&count_friends_sql())?;
        let count: i64 = stmt.query_row(params![user], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Whether `a` and `b` follow each other.
    pub fn are_friends(&self, a: UserId, b: UserId) -> Result<bool> {
        let mut stmt = self.db.conn().prepare_cached(ARE_FRIENDS_SQL)?;
        let mutual: bool = stmt.query_row(params![a, b], |row| row.get(0))?;
        Ok(mutual)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::types::NewUser;

    fn setup(n: usize) -> (Database, Vec<UserId>) {
        let db = Database::in_memory().unwrap();
        let new_users: Vec<NewUser> = (1..=n)
            .map(|i| NewUser::new(format!("user{i}"), format!("user{i}@example.com")))
            .collect();
        let ids = db
            .users()
            .create_many(&new_users)
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        (db, ids)
    }

    #[test]
    fn mutual_follow_makes_friends_both_ways() {
        let (db, u) = setup(3);
        let follows = db.follows();
        follows.follow(u[0], u[1]).unwrap();
        follows.follow(u[1], u[0]).unwrap();
        // One-way: u0 -> u2 only.
        follows.follow(u[0], u[2]).unwrap();

        let graph = db.graph();
        assert_eq!(graph.friend_ids(u[0]).unwrap(), vec![u[1]]);
        assert_eq!(graph.friend_ids(u[1]).unwrap(), vec![u[0]]);
        assert!(graph.friend_ids(u[2]).unwrap().is_empty());
        assert!(graph.are_friends(u[0], u[1]).unwrap());
        assert!(graph.are_friends(u[1], u[0]).unwrap());
        assert!(!graph.are_friends(u[0], u[2]).unwrap());
    }

    #[test]
    fn one_way_follower_is_not_a_friend() {
        let (db, u) = setup(2);
        db.follows().follow(u[1], u[0]).unwrap();

        assert_eq!(db.graph().count_friends(u[0]).unwrap(), 0);
        assert_eq!(db.graph().count_friends(u[1]).unwrap(), 0);
    }

    #[test]
    fn friends_is_intersection_of_followings_and_followers() {
        let (db, u) = setup(6);
        let follows = db.follows();
        for &(a, b) in &[(0, 1), (1, 0), (0, 2), (3, 0), (0, 4), (4, 0), (5, 1)] {
            follows.follow(u[a], u[b]).unwrap();
        }

        let followings: HashSet<UserId> = follows.following_ids(u[0]).unwrap().into_iter().collect();
        let followers: HashSet<UserId> = follows.follower_ids(u[0]).unwrap().into_iter().collect();
        let expected: HashSet<UserId> = followings.intersection(&followers).copied().collect();

        let friends: HashSet<UserId> = db
            .graph()
            .friends(u[0])
            .unwrap()
            .into_iter()
            .map(|r| r.user.id)
            .collect();
        assert_eq!(friends, expected);
        assert_eq!(db.graph().count_friends(u[0]).unwrap(), expected.len());
    }

    #[test]
    fn friends_carry_outgoing_edge() {
        let (db, u) = setup(2);
        db.follows().follow(u[0], u[1]).unwrap();
        db.follows().follow(u[1], u[0]).unwrap();

        let friends = db.graph().friends(u[0]).unwrap();
        let friend = &friends[0];
        assert_eq!(friend.user.id, u[1]);
        assert_eq!(friend.edge.follower_id, u[0]);
        assert_eq!(friend.edge.followee_id, u[1]);
    }

    #[test]
    fn unfollow_breaks_friendship() {
        let (db, u) = setup(2);
        db.follows().follow(u[0], u[1]).unwrap();
        db.follows().follow(u[1], u[0]).unwrap();
        db.follows().unfollow(u[1], u[0]).unwrap();

        assert!(!db.graph().are_friends(u[0], u[1]).unwrap());
        assert!(db.graph().friends(u[0]).unwrap().is_empty());
    }
}
