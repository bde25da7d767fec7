//! Row-to-struct converters for social graph queries.
//!
//! Converts raw `rusqlite::Row` values into the domain types defined in
//! `crate::types`. Timestamps are stored as Unix milliseconds.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::Row;

use crate::types::{FollowEdge, Related, Status, User};

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Convert a stored millisecond timestamp. Out-of-range values clamp to the
/// Unix epoch rather than failing the whole row.
pub fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}

pub fn datetime_to_millis(at: &DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Convert a row from `SELECT * FROM users` (or any query exposing the
/// `id, name, email, created_at` columns) into a [`User`].
pub fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        created_at: millis_to_datetime(row.get("created_at")?),
    })
}

// ---------------------------------------------------------------------------
// Follow edges
// ---------------------------------------------------------------------------

fn parse_properties(json: Option<String>) -> Option<HashMap<String, String>> {
    let props: HashMap<String, String> = json
        .as_deref()
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default();
    if props.is_empty() {
        None
    } else {
        Some(props)
    }
}

/// Convert a row from `SELECT * FROM follows` into a [`FollowEdge`].
///
/// The `properties` column is a JSON object of string values; anything
/// unparseable is treated as "no metadata".
pub fn row_to_follow_edge(row: &Row<'_>) -> rusqlite::Result<FollowEdge> {
    Ok(FollowEdge {
        follower_id: row.get("follower_id")?,
        followee_id: row.get("followee_id")?,
        created_at: millis_to_datetime(row.get("created_at")?),
        metadata: parse_properties(row.get("properties")?),
    })
}

/// Convert a joined user + edge row into a [`Related`].
///
/// Expects the user columns under their plain names and the edge columns
/// aliased as `edge_follower_id`, `edge_followee_id`, `edge_created_at`
/// and `edge_properties` (see [`RELATED_COLUMNS`]).
pub fn row_to_related(row: &Row<'_>) -> rusqlite::Result<Related> {
    let user = row_to_user(row)?;
    let edge = FollowEdge {
        follower_id: row.get("edge_follower_id")?,
        followee_id: row.get("edge_followee_id")?,
        created_at: millis_to_datetime(row.get("edge_created_at")?),
        metadata: parse_properties(row.get("edge_properties")?),
    };
    Ok(Related { user, edge })
}

/// Column list matching [`row_to_related`] for a query joining `users u`
/// with `follows f`.
pub const RELATED_COLUMNS: &str = "\
u.id, u.name, u.email, u.created_at, \
f.follower_id AS edge_follower_id, f.followee_id AS edge_followee_id, \
f.created_at AS edge_created_at, f.properties AS edge_properties";

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// Convert a row from `SELECT * FROM statuses` into a [`Status`].
pub fn row_to_status(row: &Row<'_>) -> rusqlite::Result<Status> {
    Ok(Status {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        body: row.get("body")?,
        created_at: millis_to_datetime(row.get("created_at")?),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
