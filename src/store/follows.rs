//! Follow edge store.
//!
//! Every insert goes through `ON CONFLICT(follower_id, followee_id) DO
//! NOTHING`, so a second follow of the same ordered pair (from this or any
//! other connection) is a no-op rather than a duplicate row or an error.
//! [`FollowStore::toggle`] runs its check-then-write inside an `IMMEDIATE`
//! transaction so concurrent toggles of one pair are serialised.

use std::collections::HashMap;

use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::db::converters::{row_to_follow_edge, row_to_related, RELATED_COLUMNS};
use crate::db::{now_millis, Database};
use crate::error::{classify, Result, SocialGraphError};
use crate::types::{EdgeState, FollowEdge, Related, RelationKind, UserId};

// ---------------------------------------------------------------------------
// SQL constants
// ---------------------------------------------------------------------------

const INSERT_EDGE_SQL: &str = "\
INSERT INTO follows (follower_id, followee_id, created_at, properties)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(follower_id, followee_id) DO NOTHING";

const DELETE_EDGE_SQL: &str = "\
DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2";

const EDGE_EXISTS_SQL: &str = "\
SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ?1 AND followee_id = ?2)";

fn followings_sql() -> String {
    format!(
        "SELECT {RELATED_COLUMNS} FROM follows f \
         JOIN users u ON u.id = f.followee_id \
         WHERE f.follower_id = ?1 ORDER BY f.id"
    )
}

fn followers_sql() -> String {
    format!(
        "SELECT {RELATED_COLUMNS} FROM follows f \
         JOIN users u ON u.id = f.follower_id \
         WHERE f.followee_id = ?1 ORDER BY f.id"
    )
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Insert one edge, absorbing a duplicate pair. Returns whether a row was
/// written.
pub(crate) fn insert_edge(
    conn: &Connection,
    follower: UserId,
    followee: UserId,
    properties: Option<&str>,
) -> Result<bool> {
    let mut stmt = conn.prepare_cached(INSERT_EDGE_SQL)?;
    let inserted = stmt
        .execute(params![follower, followee, now_millis(), properties])
        .map_err(classify)?;
    Ok(inserted == 1)
}

fn edge_exists(conn: &Connection, follower: UserId, followee: UserId) -> Result<bool> {
    let mut stmt = conn.prepare_cached(EDGE_EXISTS_SQL)?;
    let exists: bool = stmt.query_row(params![follower, followee], |row| row.get(0))?;
    Ok(exists)
}

fn delete_edge(conn: &Connection, follower: UserId, followee: UserId) -> Result<usize> {
    let mut stmt = conn.prepare_cached(DELETE_EDGE_SQL)?;
    Ok(stmt.execute(params![follower, followee])?)
}

// ---------------------------------------------------------------------------
// FollowStore
// ---------------------------------------------------------------------------

/// Typed access to the `follows` table.
#[derive(Debug, Clone, Copy)]
pub struct FollowStore<'a> {
    db: &'a Database,
}

impl<'a> FollowStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Reject self-follows and unknown users before touching `follows`.
    fn validate_pair(&self, follower: UserId, followee: UserId) -> Result<()> {
        if follower == followee {
            return Err(SocialGraphError::InvalidArgument(format!(
                "user {follower} cannot follow themselves"
            )));
        }
        let users = self.db.users();
        users.ensure_exists(follower)?;
        users.ensure_exists(followee)?;
        Ok(())
    }

    // -------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------

    /// Make `follower` follow `followee`. Returns `true` if a new edge was
    /// created, `false` if it already existed.
    pub fn follow(&self, follower: UserId, followee: UserId) -> Result<bool> {
        self.insert_validated(follower, followee, None)
    }

    /// Alias of [`follow`](Self::follow).
    pub fn attach(&self, follower: UserId, followee: UserId) -> Result<bool> {
        self.follow(follower, followee)
    }

    /// Follow and store `metadata` on the edge. Metadata of an existing
    /// edge is left untouched.
    pub fn follow_with(
        &self,
        follower: UserId,
        followee: UserId,
        metadata: &HashMap<String, String>,
    ) -> Result<bool> {
        let json = serde_json::to_string(metadata)?;
        self.insert_validated(follower, followee, Some(&json))
    }

    fn insert_validated(
        &self,
        follower: UserId,
        followee: UserId,
        properties: Option<&str>,
    ) -> Result<bool> {
        self.validate_pair(follower, followee)?;
        let created = insert_edge(self.db.conn(), follower, followee, properties)?;
        if created {
            info!(%follower, %followee, "follow edge created");
        } else {
            debug!(%follower, %followee, "follow edge already present");
        }
        Ok(created)
    }

    /// Make `follower` follow every user in `followees` in one transaction.
    /// Returns the number of edges actually created.
    pub fn attach_many(&self, follower: UserId, followees: &[UserId]) -> Result<usize> {
        for &followee in followees {
            self.validate_pair(follower, followee)?;
        }
        let tx = self.db.conn().unchecked_transaction()?;
        let mut created = 0;
        for &followee in followees {
            if insert_edge(&tx, follower, followee, None)? {
                created += 1;
            }
        }
        tx.commit()?;
        info!(%follower, requested = followees.len(), created, "follow edges attached");
        Ok(created)
    }

    /// Flip the edge between `follower` and `followee` and return the state
    /// it ends up in.
    pub fn toggle(&self, follower: UserId, followee: UserId) -> Result<EdgeState> {
        self.validate_pair(follower, followee)?;
        let tx = self.db.immediate_transaction()?;
        let state = if edge_exists(&tx, follower, followee)? {
            delete_edge(&tx, follower, followee)?;
            EdgeState::Absent
        } else {
            insert_edge(&tx, follower, followee, None)?;
            EdgeState::Exists
        };
        tx.commit()?;
        info!(%follower, %followee, ?state, "follow edge toggled");
        Ok(state)
    }

    /// Remove every edge from `follower` to `followee`. Returns the number
    /// of rows removed (0 when not following).
    pub fn unfollow(&self, follower: UserId, followee: UserId) -> Result<usize> {
        let users = self.db.users();
        users.ensure_exists(follower)?;
        users.ensure_exists(followee)?;
        let removed = delete_edge(self.db.conn(), follower, followee)?;
        if removed > 0 {
            info!(%follower, %followee, removed, "follow edge removed");
        }
        Ok(removed)
    }

    /// Alias of [`unfollow`](Self::unfollow).
    pub fn detach(&self, follower: UserId, followee: UserId) -> Result<usize> {
        self.unfollow(follower, followee)
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    pub fn is_following(&self, follower: UserId, followee: UserId) -> Result<bool> {
        edge_exists(self.db.conn(), follower, followee)
    }

    /// The edge from `follower` to `followee`, if any.
    pub fn edge(&self, follower: UserId, followee: UserId) -> Result<Option<FollowEdge>> {
        let mut stmt = self.db.conn().prepare_cached(
            "SELECT * FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
        )?;
        let mut rows = stmt.query_and_then(params![follower, followee], row_to_follow_edge)?;
        match rows.next() {
            Some(Ok(edge)) => Ok(Some(edge)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// Users `user` follows, oldest edge first, each with its edge.
    pub fn list_followings(&self, user: UserId) -> Result<Vec<Related>> {
        let mut stmt = self.db.conn().prepare_cached(&followings_sql())?;
        let rows = stmt.query_and_then(params![user], row_to_related)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Users following `user`, oldest edge first, each with its edge.
    pub fn list_followers(&self, user: UserId) -> Result<Vec<Related>> {
        let mut stmt = self.db.conn().prepare_cached(&followers_sql())?;
        let rows = stmt.query_and_then(params![user], row_to_related)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    pub fn following_ids(&self, user: UserId) -> Result<Vec<UserId>> {
        let mut stmt = self.db.conn().prepare_cached(
            "SELECT followee_id FROM follows WHERE follower_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    pub fn follower_ids(&self, user: UserId) -> Result<Vec<UserId>> {
        let mut stmt = self.db.conn().prepare_cached(
            "SELECT follower_id FROM follows WHERE followee_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    // -------------------------------------------------------------------
    // Counts
    // -------------------------------------------------------------------

    /// Cardinality of `kind` for `user`, computed with `COUNT(*)`.
    pub fn count(&self, kind: RelationKind, user: UserId) -> Result<usize> {
        let sql = match kind {
            RelationKind::Followings => "SELECT count(*) FROM follows WHERE follower_id = ?1",
            RelationKind::Followers => "SELECT count(*) FROM follows WHERE followee_id = ?1",
            RelationKind::Friends => return self.db.graph().count_friends(user),
            RelationKind::Statuses => return self.db.statuses().count_for_user(user),
        };
        let mut stmt = self.db.conn().prepare_cached(sql)?;
        let count: i64 = stmt.query_row(params![user], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Total number of edges in the graph.
    pub fn total(&self) -> Result<usize> {
        let mut stmt = self.db.conn().prepare_cached("SELECT count(*) FROM follows")?;
        let count: i64 = stmt.query_row([], |row| row.get(0))?;
        Ok(count as usize)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewUser;

    /// In-memory database with `n` users (ids 1..=n).
    fn setup(n: usize) -> (Database, Vec<UserId>) {
        let db = Database::in_memory().expect("in-memory database should open");
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

    fn ids_of(related: &[Related]) -> Vec<UserId> {
        related.iter().map(|r| r.user.id).collect()
    }

    // -- follow / attach ---------------------------------------------------

    #[test]
    fn follow_creates_edge_in_both_views() {
        let (db, u) = setup(2);
        let follows = db.follows();

        assert!(follows.follow(u[0], u[1]).unwrap());

        assert_eq!(ids_of(&follows.list_followings(u[0]).unwrap()), vec![u[1]]);
        assert_eq!(ids_of(&follows.list_followers(u[1]).unwrap()), vec![u[0]]);
        assert!(follows.list_followers(u[0]).unwrap().is_empty());
        assert_eq!(follows.count(RelationKind::Followings, u[0]).unwrap(), 1);
        assert_eq!(follows.count(RelationKind::Followers, u[1]).unwrap(), 1);
        assert_eq!(follows.count(RelationKind::Followers, u[0]).unwrap(), 0);
    }

    #[test]
    fn attach_is_idempotent() {
        let (db, u) = setup(3);
        let follows = db.follows();

        follows.attach(u[0], u[1]).unwrap();
        follows.attach(u[0], u[2]).unwrap();
        assert!(!follows.attach(u[0], u[2]).unwrap());

        assert_eq!(follows.count(RelationKind::Followings, u[0]).unwrap(), 2);
        assert_eq!(follows.total().unwrap(), 2);
    }

    #[test]
    fn follow_unknown_user_is_not_found() {
        let (db, u) = setup(1);
        let err = db.follows().follow(u[0], UserId(999)).unwrap_err();
        assert!(matches!(err, SocialGraphError::NotFound { id: 999, .. }));

        let err = db.follows().follow(UserId(998), u[0]).unwrap_err();
        assert!(matches!(err, SocialGraphError::NotFound { id: 998, .. }));
    }

    #[test]
    fn self_follow_is_invalid() {
        let (db, u) = setup(1);
        let err = db.follows().follow(u[0], u[0]).unwrap_err();
        assert!(matches!(err, SocialGraphError::InvalidArgument(_)));
        assert_eq!(db.follows().total().unwrap(), 0);
    }

    #[test]
    fn follow_with_stores_metadata_on_new_edge_only() {
        let (db, u) = setup(2);
        let follows = db.follows();
        let mut meta = HashMap::new();
        meta.insert("via".to_string(), "search".to_string());

        assert!(follows.follow_with(u[0], u[1], &meta).unwrap());
        meta.insert("via".to_string(), "profile".to_string());
        assert!(!follows.follow_with(u[0], u[1], &meta).unwrap());

        let edge = follows.edge(u[0], u[1]).unwrap().expect("edge should exist");
        let stored = edge.metadata.expect("metadata should be stored");
        assert_eq!(stored.get("via").map(String::as_str), Some("search"));
    }

    #[test]
    fn attach_many_counts_only_new_edges() {
        let (db, u) = setup(4);
        let follows = db.follows();
        follows.follow(u[0], u[1]).unwrap();

        let created = follows.attach_many(u[0], &[u[1], u[2], u[3]]).unwrap();
        assert_eq!(created, 2);
        assert_eq!(follows.following_ids(u[0]).unwrap(), vec![u[1], u[2], u[3]]);
    }

    #[test]
    fn attach_many_validates_before_writing() {
        let (db, u) = setup(2);
        let err = db
            .follows()
            .attach_many(u[0], &[u[1], UserId(77)])
            .unwrap_err();
        assert!(matches!(err, SocialGraphError::NotFound { id: 77, .. }));
        assert_eq!(db.follows().total().unwrap(), 0);
    }

    // -- toggle ------------------------------------------------------------

    #[test]
    fn toggle_flips_edge_state() {
        let (db, u) = setup(2);
        let follows = db.follows();

        assert_eq!(follows.toggle(u[0], u[1]).unwrap(), EdgeState::Exists);
        assert!(follows.is_following(u[0], u[1]).unwrap());

        assert_eq!(follows.toggle(u[0], u[1]).unwrap(), EdgeState::Absent);
        assert!(!follows.is_following(u[0], u[1]).unwrap());
    }

    #[test]
    fn toggle_only_touches_one_direction() {
        let (db, u) = setup(2);
        let follows = db.follows();
        follows.follow(u[1], u[0]).unwrap();

        follows.toggle(u[0], u[1]).unwrap();
        follows.toggle(u[0], u[1]).unwrap();

        assert!(follows.is_following(u[1], u[0]).unwrap());
        assert!(!follows.is_following(u[0], u[1]).unwrap());
    }

    #[test]
    fn toggle_unknown_user_is_not_found() {
        let (db, u) = setup(1);
        assert!(matches!(
            db.follows().toggle(u[0], UserId(5)).unwrap_err(),
            SocialGraphError::NotFound { .. }
        ));
    }

    // -- unfollow / detach -------------------------------------------------

    #[test]
    fn unfollow_removes_edge_and_reports_count() {
        let (db, u) = setup(2);
        let follows = db.follows();
        follows.follow(u[0], u[1]).unwrap();

        assert_eq!(follows.detach(u[0], u[1]).unwrap(), 1);
        assert_eq!(follows.count(RelationKind::Followings, u[0]).unwrap(), 0);
        assert!(!follows.is_following(u[0], u[1]).unwrap());
    }

    #[test]
    fn unfollow_without_edge_is_a_noop() {
        let (db, u) = setup(3);
        let follows = db.follows();
        follows.follow(u[0], u[2]).unwrap();

        assert_eq!(follows.unfollow(u[0], u[1]).unwrap(), 0);
        assert_eq!(follows.following_ids(u[0]).unwrap(), vec![u[2]]);
    }

    #[test]
    fn unfollow_unknown_user_is_not_found() {
        let (db, u) = setup(1);
        assert!(matches!(
            db.follows().unfollow(UserId(42), u[0]).unwrap_err(),
            SocialGraphError::NotFound { id: 42, .. }
        ));
    }

    // -- queries -----------------------------------------------------------

    #[test]
    fn related_rows_carry_their_edge() {
        let (db, u) = setup(2);
        db.follows().follow(u[0], u[1]).unwrap();

        let followings = db.follows().list_followings(u[0]).unwrap();
        let following = &followings[0];
        assert_eq!(following.edge.follower_id, u[0]);
        assert_eq!(following.edge.followee_id, u[1]);

        let followers = db.follows().list_followers(u[1]).unwrap();
        let follower = &followers[0];
        assert_eq!(follower.user.id, u[0]);
        assert_eq!(follower.edge, following.edge);
    }

    #[test]
    fn lists_follow_insertion_order() {
        let (db, u) = setup(4);
        let follows = db.follows();
        follows.follow(u[0], u[3]).unwrap();
        follows.follow(u[0], u[1]).unwrap();
        follows.follow(u[0], u[2]).unwrap();

        assert_eq!(
            ids_of(&follows.list_followings(u[0]).unwrap()),
            vec![u[3], u[1], u[2]]
        );
    }

    #[test]
    fn edge_returns_none_when_absent() {
        let (db, u) = setup(2);
        assert!(db.follows().edge(u[0], u[1]).unwrap().is_none());
    }

    #[test]
    fn count_delegates_friends_and_statuses() {
        let (db, u) = setup(2);
        db.follows().follow(u[0], u[1]).unwrap();
        db.follows().follow(u[1], u[0]).unwrap();
        db.statuses().post(u[0], "hello").unwrap();

        assert_eq!(db.follows().count(RelationKind::Friends, u[0]).unwrap(), 1);
        assert_eq!(db.follows().count(RelationKind::Statuses, u[0]).unwrap(), 1);
        assert_eq!(db.follows().count(RelationKind::Statuses, u[1]).unwrap(), 0);
    }
}
