//! Configuration data structures.
//!
//! Defines the YAML config format: database location, timeline paging and
//! the demo seed. Every section has serde defaults so partial files load.

use serde::{Deserialize, Serialize};

use crate::timeline::TimelineScope;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
///
/// Loaded from YAML files, environment variables and explicit overrides.
/// Multiple sources are merged with well-defined priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialGraphConfig {
    /// Config format version (currently "1.0").
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub timeline: TimelineConfig,

    #[serde(default)]
    pub seed: SeedConfig,
}

impl Default for SocialGraphConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            database: DatabaseConfig::default(),
            timeline: TimelineConfig::default(),
            seed: SeedConfig::default(),
        }
    }
}

impl SocialGraphConfig {
    /// Reject values that would make later calls fail in confusing ways.
    pub fn validate(&self) -> Result<(), String> {
        if self.database.path.trim().is_empty() {
            return Err("database.path must not be empty".to_string());
        }
        if self.timeline.default_page_size == 0 {
            return Err("timeline.default_page_size must be at least 1".to_string());
        }
        if self.timeline.default_page_size > self.timeline.max_page_size {
            return Err(format!(
                "timeline.default_page_size ({}) exceeds timeline.max_page_size ({})",
                self.timeline.default_page_size, self.timeline.max_page_size
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DatabaseConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// How long a connection waits on a locked database.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// TimelineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Whose statuses a timeline includes.
    #[serde(default)]
    pub scope: TimelineScope,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            scope: TimelineScope::Own,
        }
    }
}

// ---------------------------------------------------------------------------
// SeedConfig
// ---------------------------------------------------------------------------

/// Size of the demo data set written by [`crate::seed::seed_database`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedConfig {
    #[serde(default = "default_seed_users")]
    pub users: usize,

    /// Statuses created for the first seeded user.
    #[serde(default = "default_first_user_statuses")]
    pub first_user_statuses: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            users: default_seed_users(),
            first_user_statuses: default_first_user_statuses(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_version() -> String {
    "1.0".to_string()
}

fn default_db_path() -> String {
    "socialgraph.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_page_size() -> usize {
    10
}

fn default_max_page_size() -> usize {
    100
}

fn default_seed_users() -> usize {
    3
}

fn default_first_user_statuses() -> usize {
    10
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
