//! Service layer for the crawl engine.
//!
//! This module contains the listing discovery logic:
//! - Start page search (`locate_start_page`)
//! - Window walking (`walk`)
//! - Concurrent tag fan-out (`collect_all`)

mod fanout;
mod locator;
mod walker;

use std::time::Duration;

use crate::models::CrawlerConfig;

pub use fanout::{FanOutReport, TagFailure, collect_all, collect_tag};
pub use locator::locate_start_page;
pub use walker::walk;

/// Limits shared by the discovery services.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Tags crawled concurrently
    pub max_workers: usize,
    /// Consecutive filtered-only pages tolerated
    pub max_sparse_pages: u32,
    /// Pause between sequential page fetches of one tag
    pub page_delay: Duration,
    /// Deadline for one tag's locate and walk
    pub tag_timeout: Option<Duration>,
}

impl DiscoveryOptions {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_workers: config.max_workers,
            max_sparse_pages: config.max_sparse_pages,
            page_delay: config.request_delay(),
            tag_timeout: config.tag_timeout(),
        }
    }
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}
