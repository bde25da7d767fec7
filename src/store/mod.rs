//! Repository types over the `users`, `follows` and `statuses` tables.

pub mod follows;
pub mod statuses;
pub mod users;

pub use follows::FollowStore;
pub use statuses::StatusStore;
pub use users::UserStore;
