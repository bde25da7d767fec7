//! Core domain types for the social graph.
//!
//! Users, follow edges, statuses, and the relation kinds that the count
//! queries understand.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! sql_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.0))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map($name)
            }
        }
    };
}

sql_id!(UserId);
sql_id!(StatusId);

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Registration payload for [`crate::store::users::UserStore::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Follow edges
// ---------------------------------------------------------------------------

/// A directed "follower observes followee" relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowEdge {
    pub follower_id: UserId,
    pub followee_id: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

/// A user returned from a relation query together with the edge that
/// linked it to the subject user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Related {
    pub user: User,
    pub edge: FollowEdge,
}

/// The two states a follow edge can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeState {
    Exists,
    Absent,
}

impl EdgeState {
    pub fn flipped(self) -> Self {
        match self {
            Self::Exists => Self::Absent,
            Self::Absent => Self::Exists,
        }
    }
}

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// A post owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: StatusId,
    pub user_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Relation kinds and counts
// ---------------------------------------------------------------------------

/// Relations that can be counted for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Followings,
    Followers,
    Friends,
    Statuses,
}

impl RelationKind {
    pub const ALL: [RelationKind; 4] = [
        Self::Followings,
        Self::Followers,
        Self::Friends,
        Self::Statuses,
    ];

    /// Parse from a loose string (case-insensitive, singular accepted).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "followings" | "following" => Some(Self::Followings),
            "followers" | "follower" => Some(Self::Followers),
            "friends" | "friend" => Some(Self::Friends),
            "statuses" | "status" | "posts" => Some(Self::Statuses),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Followings => "followings",
            Self::Followers => "followers",
            Self::Friends => "friends",
            Self::Statuses => "statuses",
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts attached to a user; `None` means the relation was not requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationCounts {
    pub followings: Option<usize>,
    pub followers: Option<usize>,
    pub friends: Option<usize>,
    pub statuses: Option<usize>,
}

impl RelationCounts {
    pub fn get(&self, kind: RelationKind) -> Option<usize> {
        match kind {
            RelationKind::Followings => self.followings,
            RelationKind::Followers => self.followers,
            RelationKind::Friends => self.friends,
            RelationKind::Statuses => self.statuses,
        }
    }

    pub fn set(&mut self, kind: RelationKind, count: usize) {
        let slot = match kind {
            RelationKind::Followings => &mut self.followings,
            RelationKind::Followers => &mut self.followers,
            RelationKind::Friends => &mut self.friends,
            RelationKind::Statuses => &mut self.statuses,
        };
        *slot = Some(count);
    }
}

/// A user with relation counts attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserWithCounts {
    pub user: User,
    pub counts: RelationCounts,
}

impl From<User> for UserWithCounts {
    fn from(user: User) -> Self {
        Self {
            user,
            counts: RelationCounts::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
