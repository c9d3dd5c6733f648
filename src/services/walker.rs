// src/services/walker.rs

//! Window walker.
//!
//! Reads a tag's pages forward from the start page and keeps the items that
//! fall inside the crawl window.

use crate::error::{AppError, Result};
use crate::models::{CrawlWindow, ShortItem};
use crate::services::DiscoveryOptions;
use crate::sources::SourceAdapter;

/// Collect every item of `tag` inside `window`, starting at `start_page`.
///
/// The walk ends on an exhausted page, on a page whose oldest item is older
/// than the window floor, or after too many consecutive sparse pages.
pub async fn walk(
    adapter: &dyn SourceAdapter,
    tag: &str,
    start_page: u32,
    window: CrawlWindow,
    options: &DiscoveryOptions,
) -> Result<Vec<ShortItem>> {
    let mut items = Vec::new();
    let mut page = start_page;
    let mut sparse_run = 0u32;

    loop {
        let listing = adapter.list_page(tag, page).await?;

        if listing.is_exhausted() {
            log::debug!("tag '{}': source ends at page {}", tag, page);
            break;
        }

        if listing.is_sparse() {
            sparse_run += 1;
            if sparse_run >= options.max_sparse_pages {
                log::warn!(
                    "tag '{}': {} consecutive pages without usable items, stopping at page {}",
                    tag,
                    sparse_run,
                    page
                );
                break;
            }
        } else {
            sparse_run = 0;
            let below_floor = listing.oldest().is_some_and(|oldest| oldest < window.to);
            items.extend(
                listing
                    .items
                    .into_iter()
                    .filter(|item| window.contains(item.published_at)),
            );
            if below_floor {
                break;
            }
        }

        page = page
            .checked_add(1)
            .ok_or_else(|| AppError::parsing(format!("tag '{tag}'"), "page index overflow"))?;
        if !options.page_delay.is_zero() {
            tokio::time::sleep(options.page_delay).await;
        }
    }

    log::debug!(
        "tag '{}': {} items in {} from pages {}..={}",
        tag,
        items.len(),
        window,
        start_page,
        page
    );
    Ok(items)
}
