//! Crawl time window.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};

/// Inclusive time range `[to, from]` targeted by a crawl run.
///
/// `from` is the newer bound, `to` the older one, matching the order in
/// which a reverse-chronological source is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl CrawlWindow {
    /// Create a window, rejecting `to` later than `from`.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if to > from {
            return Err(AppError::validation(format!(
                "window lower bound {to} is after upper bound {from}"
            )));
        }
        Ok(Self { from, to })
    }

    /// Whether a timestamp lies inside the window (both ends inclusive).
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.to <= at && at <= self.from
    }
}

impl fmt::Display for CrawlWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.to.to_rfc3339(), self.from.to_rfc3339())
    }
}
