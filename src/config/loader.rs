//! Multi-source config loading with priority merging.
//!
//! Priority order (highest wins):
//!   Explicit database path > Environment vars > Project config > User config > Defaults

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::schema::{DatabaseConfig, SeedConfig, SocialGraphConfig, TimelineConfig};
use crate::error::{Result, SocialGraphError};
use crate::timeline::TimelineScope;

/// File name looked up in the project directory.
pub const PROJECT_CONFIG_FILE: &str = ".socialgraph.yaml";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Load configuration from all available sources and merge them.
///
/// Sources (low → high priority):
///   1. Built-in defaults
///   2. User config (`~/.config/socialgraph/config.yaml` on Linux)
///   3. Project config (`.socialgraph.yaml` in `project_dir`)
///   4. Environment variables (`SOCIALGRAPH_DB`, `SOCIALGRAPH_PAGE_SIZE`, ...)
///   5. `db_path` argument
///
/// Missing files are skipped and malformed ones are ignored with a warning;
/// a file that exists but cannot be read is a [`SocialGraphError::Io`]. The
/// merged result is validated; an invalid combination is a
/// [`SocialGraphError::Config`].
pub fn load_config(
    db_path: Option<&str>,
    project_dir: Option<&Path>,
) -> Result<SocialGraphConfig> {
    let user = load_user_config()?;
    resolve_config(db_path, project_dir, user, |key| std::env::var(key).ok())
}

/// The layering behind [`load_config`], with the user config and the
/// variable lookup supplied by the caller.
fn resolve_config(
    db_path: Option<&str>,
    project_dir: Option<&Path>,
    user: Option<SocialGraphConfig>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SocialGraphConfig> {
    let mut config = SocialGraphConfig::default();

    if let Some(user) = user {
        config = merge_configs(config, user);
    }

    if let Some(dir) = project_dir {
        if let Some(project) = load_project_config(dir)? {
            config = merge_configs(config, project);
        }
    }

    apply_overrides(&mut config, lookup);

    if let Some(path) = db_path {
        config.database.path = path.to_string();
    }

    config.validate().map_err(SocialGraphError::Config)?;
    debug!(path = %config.database.path, scope = %config.timeline.scope, "config loaded");
    Ok(config)
}

/// Load user config from the platform-specific config directory.
///
/// Returns `None` if there is no config directory, or the file does not
/// exist or is unparseable.
pub fn load_user_config() -> Result<Option<SocialGraphConfig>> {
    match user_config_path() {
        Some(path) => load_config_file(&path),
        None => Ok(None),
    }
}

/// Load project config from `.socialgraph.yaml` in the given directory.
///
/// Returns `None` if the file does not exist or is unparseable.
pub fn load_project_config(dir: &Path) -> Result<Option<SocialGraphConfig>> {
    load_config_file(&dir.join(PROJECT_CONFIG_FILE))
}

/// Apply environment-style overrides to a config in place. `load_config`
/// passes the process environment as `lookup`.
///
/// Supported variables:
/// - `SOCIALGRAPH_DB`: database path
/// - `SOCIALGRAPH_BUSY_TIMEOUT_MS`: busy timeout in milliseconds
/// - `SOCIALGRAPH_PAGE_SIZE`: default timeline page size
/// - `SOCIALGRAPH_TIMELINE_SCOPE`: `own` or `with_followings`
pub fn apply_overrides(config: &mut SocialGraphConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("SOCIALGRAPH_DB") {
        if !val.trim().is_empty() {
            config.database.path = val;
        }
    }

    if let Some(val) = lookup("SOCIALGRAPH_BUSY_TIMEOUT_MS") {
        match val.trim().parse() {
            Ok(ms) => config.database.busy_timeout_ms = ms,
            Err(_) => warn!(value = %val, "ignoring unparseable SOCIALGRAPH_BUSY_TIMEOUT_MS"),
        }
    }

    if let Some(val) = lookup("SOCIALGRAPH_PAGE_SIZE") {
        match val.trim().parse() {
            Ok(size) => config.timeline.default_page_size = size,
            Err(_) => warn!(value = %val, "ignoring unparseable SOCIALGRAPH_PAGE_SIZE"),
        }
    }

    if let Some(val) = lookup("SOCIALGRAPH_TIMELINE_SCOPE") {
        match TimelineScope::from_str_loose(&val) {
            Some(scope) => config.timeline.scope = scope,
            None => warn!(value = %val, "ignoring unknown SOCIALGRAPH_TIMELINE_SCOPE"),
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Platform-specific user config path via the `directories` crate.
fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "socialgraph", "socialgraph")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
}

/// Load and parse a YAML config file. A missing file or bad YAML is
/// `Ok(None)`; any other read failure is an error.
fn load_config_file(path: &Path) -> Result<Option<SocialGraphConfig>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    match serde_yaml::from_str(&contents) {
        Ok(config) => Ok(Some(config)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            Ok(None)
        }
    }
}

/// Merge two configs: `overlay` fields win wherever they differ from the
/// built-in default (a file that omits a key gets the default through serde,
/// so "equals default" means "not set").
fn merge_configs(mut base: SocialGraphConfig, overlay: SocialGraphConfig) -> SocialGraphConfig {
    if overlay.version != "1.0" {
        base.version = overlay.version;
    }

    let db_default = DatabaseConfig::default();
    if overlay.database.path != db_default.path {
        base.database.path = overlay.database.path;
    }
    if overlay.database.busy_timeout_ms != db_default.busy_timeout_ms {
        base.database.busy_timeout_ms = overlay.database.busy_timeout_ms;
    }

    let tl_default = TimelineConfig::default();
    if overlay.timeline.default_page_size != tl_default.default_page_size {
        base.timeline.default_page_size = overlay.timeline.default_page_size;
    }
    if overlay.timeline.max_page_size != tl_default.max_page_size {
        base.timeline.max_page_size = overlay.timeline.max_page_size;
    }
    if overlay.timeline.scope != tl_default.scope {
        base.timeline.scope = overlay.timeline.scope;
    }

    let seed_default = SeedConfig::default();
    if overlay.seed.users != seed_default.users {
        base.seed.users = overlay.seed.users;
    }
    if overlay.seed.first_user_statuses != seed_default.first_user_statuses {
        base.seed.first_user_statuses = overlay.seed.first_user_statuses;
    }

    base
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
