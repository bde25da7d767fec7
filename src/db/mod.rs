//! Database layer.
//!
//! - [`schema`]: DDL and initialization (`initialize_database`).
//! - [`converters`]: Row-to-struct conversions.
//! - [`connection`]: The [`Database`] handle the stores borrow.

pub mod connection;
pub mod converters;
pub mod schema;

pub use connection::Database;
pub use converters::{row_to_follow_edge, row_to_related, row_to_status, row_to_user};
pub use schema::initialize_database;

/// Current wall-clock time as Unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
