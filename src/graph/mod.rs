//! Graph query layer: friends and aggregate relation counts.

pub mod counts;
pub mod friends;

pub use friends::GraphQuery;
