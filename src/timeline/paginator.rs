//! Lazy, restartable page sequence over a timeline.

use serde::Serialize;

use super::{Timeline, TimelineScope};
use crate::db::Database;
use crate::error::{Result, SocialGraphError};
use crate::types::{Status, UserId};

/// One page of statuses plus the numbers needed to render pager links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub items: Vec<Status>,
    /// 1-based page number.
    pub current_page: usize,
    pub per_page: usize,
    pub total: usize,
    pub last_page: usize,
}

impl Page {
    /// Number of items on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page
    }
}

/// Pages of a user's timeline.
///
/// The total is counted once when the paginator is built; each page is
/// fetched with `LIMIT/OFFSET` only when asked for.
#[derive(Debug, Clone, Copy)]
pub struct Paginator<'a> {
    db: &'a Database,
    scope: TimelineScope,
    user: UserId,
    per_page: usize,
    total: usize,
}

impl<'a> Paginator<'a> {
    pub(crate) fn new(
        db: &'a Database,
        scope: TimelineScope,
        user: UserId,
        per_page: usize,
        total: usize,
    ) -> Self {
        Self {
            db,
            scope,
            user,
            per_page,
            total,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// Number of non-empty pages.
    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.per_page)
    }

    /// Last valid page number; an empty timeline still has page 1.
    pub fn last_page(&self) -> usize {
        self.page_count().max(1)
    }

    /// Fetch page `number` (1-based). Pages past the end come back empty.
    pub fn page(&self, number: usize) -> Result<Page> {
        if number == 0 {
            return Err(SocialGraphError::InvalidArgument(
                "page numbers start at 1".to_string(),
            ));
        }
        let offset = (number - 1).saturating_mul(self.per_page);
        let items = if offset >= self.total {
            Vec::new()
        } else {
            Timeline::slice(self.db, self.scope, self.user, offset, self.per_page)?
        };
        Ok(Page {
            items,
            current_page: number,
            per_page: self.per_page,
            total: self.total,
            last_page: self.last_page(),
        })
    }

    pub fn first_page(&self) -> Result<Page> {
        self.page(1)
    }

    /// Iterate over every non-empty page from the start. Each call returns
    /// a fresh iterator.
    pub fn pages(&self) -> Pages<'a> {
        Pages {
            paginator: *self,
            next: 1,
        }
    }
}

/// Iterator returned by [`Paginator::pages`].
#[derive(Debug, Clone)]
pub struct Pages<'a> {
    paginator: Paginator<'a>,
    next: usize,
}

impl<'a> Iterator for Pages<'a> {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.paginator.page_count() {
            return None;
        }
        let page = self.paginator.page(self.next);
        self.next += 1;
        Some(page)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.paginator.page_count() + 1).saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}
