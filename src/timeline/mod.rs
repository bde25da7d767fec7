//! Timeline composer: time-ordered statuses with page-at-a-time loading.
//!
//! - [`Timeline`]: builds the status query for a user and scope.
//! - [`paginator`]: [`Paginator`] / [`Page`], the lazy page sequence.

pub mod paginator;

use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TimelineConfig;
use crate::db::converters::row_to_status;
use crate::db::Database;
use crate::error::{Result, SocialGraphError};
use crate::types::{Status, UserId};

pub use paginator::{Page, Pages, Paginator};

// ---------------------------------------------------------------------------
// TimelineScope
// ---------------------------------------------------------------------------

/// Whose statuses a timeline shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineScope {
    /// Only the user's own statuses.
    #[default]
    Own,
    /// The user's statuses merged with those of everyone they follow.
    WithFollowings,
}

impl TimelineScope {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "own" | "self" => Some(Self::Own),
            "with_followings" | "with-followings" | "withfollowings" | "feed" => {
                Some(Self::WithFollowings)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Own => "own",
            Self::WithFollowings => "with_followings",
        }
    }

    /// `WHERE` clause selecting the statuses in scope for user `?1`.
    fn filter(&self) -> &'static str {
        match self {
            Self::Own => "user_id = ?1",
            Self::WithFollowings => {
                "(user_id = ?1 OR user_id IN (SELECT followee_id FROM follows WHERE follower_id = ?1))"
            }
        }
    }
}

impl std::fmt::Display for TimelineScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

/// Newest-first status feed for a user.
#[derive(Debug, Clone, Copy)]
pub struct Timeline<'a> {
    db: &'a Database,
    scope: TimelineScope,
    default_page_size: usize,
    max_page_size: Option<usize>,
}

/// Page size used by [`Timeline::paginate_default`] when no config is applied.
pub const DEFAULT_PAGE_SIZE: usize = 10;

impl<'a> Timeline<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            scope: TimelineScope::Own,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: None,
        }
    }

    /// Apply the scope and page-size ceiling from config.
    pub fn configured(mut self, config: &TimelineConfig) -> Self {
        self.scope = config.scope;
        self.default_page_size = config.default_page_size;
        self.max_page_size = Some(config.max_page_size);
        self
    }

    pub fn with_scope(mut self, scope: TimelineScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn scope(&self) -> TimelineScope {
        self.scope
    }

    /// Every status in scope for `user`, newest first.
    pub fn timeline(&self, user: UserId) -> Result<Vec<Status>> {
        self.db.users().ensure_exists(user)?;
        let sql = format!(
            "SELECT * FROM statuses WHERE {} ORDER BY created_at DESC, id DESC",
            self.scope.filter()
        );
        let mut stmt = self.db.conn().prepare_cached(&sql)?;
        let rows = stmt.query_and_then(params![user], row_to_status)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Number of statuses in scope for `user`.
    pub fn count(&self, user: UserId) -> Result<usize> {
        let sql = format!("SELECT count(*) FROM statuses WHERE {}", self.scope.filter());
        let mut stmt = self.db.conn().prepare_cached(&sql)?;
        let count: i64 = stmt.query_row(params![user], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Split the timeline into pages of `page_size`. Only the total is
    /// queried here; pages are fetched on demand.
    pub fn paginate(&self, user: UserId, page_size: usize) -> Result<Paginator<'a>> {
        if page_size == 0 {
            return Err(SocialGraphError::InvalidArgument(
                "page size must be greater than zero".to_string(),
            ));
        }
        if let Some(max) = self.max_page_size {
            if page_size > max {
                return Err(SocialGraphError::InvalidArgument(format!(
                    "page size {page_size} exceeds the maximum of {max}"
                )));
            }
        }
        self.db.users().ensure_exists(user)?;
        let total = self.count(user)?;
        debug!(%user, page_size, total, scope = %self.scope, "timeline paginated");
        Ok(Paginator::new(self.db, self.scope, user, page_size, total))
    }

    /// [`paginate`](Self::paginate) with the configured default page size.
    pub fn paginate_default(&self, user: UserId) -> Result<Paginator<'a>> {
        self.paginate(user, self.default_page_size)
    }

    /// Fetch `limit` statuses starting at `offset`, newest first.
    pub(crate) fn slice(
        db: &Database,
        scope: TimelineScope,
        user: UserId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Status>> {
        let sql = format!(
            "SELECT * FROM statuses WHERE {} ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3",
            scope.filter()
        );
        let mut stmt = db.conn().prepare_cached(&sql)?;
        let rows = stmt.query_and_then(params![user, limit as i64, offset as i64], row_to_status)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
