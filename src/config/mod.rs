//! Configuration system: YAML config with layered loading.

pub mod loader;
pub mod schema;

pub use loader::load_config;
pub use schema::{DatabaseConfig, SeedConfig, SocialGraphConfig, TimelineConfig};
