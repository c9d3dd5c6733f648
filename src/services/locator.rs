// src/services/locator.rs

//! Start page search.
//!
//! Pages are reverse-chronological, so "the oldest item on page `p` is at or
//! before `from`" is monotonic in `p`. The search doubles the page index
//! until the predicate holds, then bisects the last interval, which costs
//! O(log p) listing requests.

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::services::DiscoveryOptions;
use crate::sources::SourceAdapter;

/// What a probe learned about a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    /// Oldest usable item on the first non-sparse page at or after the probe
    Oldest(DateTime<Utc>),
    /// The source ended before a usable item was found
    Exhausted,
}

impl Probe {
    fn at_or_before(self, from: DateTime<Utc>) -> bool {
        match self {
            Probe::Oldest(oldest) => oldest <= from,
            Probe::Exhausted => true,
        }
    }
}

/// Find the smallest page whose oldest item is at or before `from`.
///
/// If every item is newer than `from`, the first page past the end of the
/// source is returned, and walking it yields nothing. Any adapter failure
/// aborts the search as a parsing error.
pub async fn locate_start_page(
    adapter: &dyn SourceAdapter,
    tag: &str,
    from: DateTime<Utc>,
    options: &DiscoveryOptions,
) -> Result<u32> {
    search(adapter, tag, from, options).await.map_err(|e| match e {
        AppError::Parsing { .. } => e,
        other => AppError::parsing(
            format!("start page search for tag '{tag}' at {}", from.to_rfc3339()),
            other,
        ),
    })
}

async fn search(
    adapter: &dyn SourceAdapter,
    tag: &str,
    from: DateTime<Utc>,
    options: &DiscoveryOptions,
) -> Result<u32> {
    if probe(adapter, tag, 1, options).await?.at_or_before(from) {
        return Ok(1);
    }

    // Expansion: `left` fails the predicate, grow `right` until it holds.
    let mut left = 1u32;
    let mut right = 2u32;
    while !probe(adapter, tag, right, options).await?.at_or_before(from) {
        left = right;
        right = right.checked_mul(2).ok_or_else(|| {
            AppError::parsing(format!("tag '{tag}'"), "page index overflow while expanding")
        })?;
    }

    // Bisection: keep pred(left) == false and pred(right) == true.
    while right - left > 1 {
        let mid = left + (right - left) / 2;
        if probe(adapter, tag, mid, options).await?.at_or_before(from) {
            right = mid;
        } else {
            left = mid;
        }
    }

    log::debug!("tag '{}': start page {} for {}", tag, right, from);
    Ok(right)
}

/// Read a page, stepping linearly past sparse (filtered-only) pages.
async fn probe(
    adapter: &dyn SourceAdapter,
    tag: &str,
    page: u32,
    options: &DiscoveryOptions,
) -> Result<Probe> {
    let mut current = page;
    loop {
        let listing = adapter.list_page(tag, current).await?;
        if let Some(oldest) = listing.oldest() {
            return Ok(Probe::Oldest(oldest));
        }
        if listing.is_exhausted() {
            return Ok(Probe::Exhausted);
        }

        let skipped = current - page + 1;
        if skipped >= options.max_sparse_pages {
            return Err(AppError::parsing(
                format!("tag '{tag}'"),
                format!("{skipped} consecutive pages from {page} had no usable items"),
            ));
        }
        log::debug!(
            "tag '{}': page {} has only filtered entries, trying next",
            tag,
            current
        );
        current += 1;
    }
}
