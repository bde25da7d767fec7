//! socialgraph: follows, friends, relation counts and timelines on SQLite.
//!
//! Open a [`Database`], then reach the repositories through it:
//! [`Database::users`], [`Database::follows`], [`Database::statuses`],
//! [`Database::graph`] and [`Database::timeline`].

pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod observability;
pub mod seed;
pub mod store;
pub mod timeline;
pub mod types;

pub use db::Database;
pub use error::{Result, SocialGraphError};
pub use types::{
    EdgeState, FollowEdge, NewUser, Related, RelationCounts, RelationKind, Status, StatusId, User,
    UserId, UserWithCounts,
};
