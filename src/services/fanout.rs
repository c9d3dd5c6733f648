// src/services/fanout.rs

//! Tag fan-out scheduler.
//!
//! Each tag runs locate-then-walk as one future of a bounded stream. At most
//! `max_workers` tags are in flight; a failing tag is recorded and the rest
//! carry on. Dropping `collect_all` drops every in-flight tag with it.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::error::{AppError, Result};
use crate::models::{CrawlWindow, ShortItem};
use crate::services::{DiscoveryOptions, locate_start_page, walk};
use crate::sources::SourceAdapter;

/// A tag whose discovery failed.
#[derive(Debug)]
pub struct TagFailure {
    pub tag: String,
    pub error: AppError,
}

/// Merged result of a fan-out over many tags.
#[derive(Debug, Default)]
pub struct FanOutReport {
    /// Items from every successful tag, in no particular order
    pub items: Vec<ShortItem>,
    pub failures: Vec<TagFailure>,
    pub tags_total: usize,
}

impl FanOutReport {
    pub fn tags_succeeded(&self) -> usize {
        self.tags_total - self.failures.len()
    }
}

/// Locate the start page of one tag and walk the window from there.
pub async fn collect_tag(
    adapter: &dyn SourceAdapter,
    tag: &str,
    window: CrawlWindow,
    options: &DiscoveryOptions,
) -> Result<Vec<ShortItem>> {
    let start_page = locate_start_page(adapter, tag, window.from, options).await?;
    walk(adapter, tag, start_page, window, options).await
}

async fn collect_tag_bounded(
    adapter: &dyn SourceAdapter,
    tag: &str,
    window: CrawlWindow,
    options: &DiscoveryOptions,
) -> Result<Vec<ShortItem>> {
    match options.tag_timeout {
        Some(limit) => tokio::time::timeout(limit, collect_tag(adapter, tag, window, options))
            .await
            .map_err(|_| {
                AppError::transport(
                    format!("{}/{}", adapter.name(), tag),
                    format!("tag timed out after {}s", limit.as_secs_f64()),
                )
            })?,
        None => collect_tag(adapter, tag, window, options).await,
    }
}

/// Run every tag through a bounded pool and merge the results.
pub async fn collect_all(
    adapter: Arc<dyn SourceAdapter>,
    tags: Vec<String>,
    window: CrawlWindow,
    options: &DiscoveryOptions,
) -> FanOutReport {
    let workers = options.max_workers.max(1);
    let mut report = FanOutReport {
        tags_total: tags.len(),
        ..FanOutReport::default()
    };

    log::info!(
        "{}: collecting {} tags in {} with {} workers",
        adapter.name(),
        tags.len(),
        window,
        workers
    );

    let mut results = stream::iter(tags)
        .map(|tag| {
            let adapter = Arc::clone(&adapter);
            let options = options.clone();
            async move {
                let result = collect_tag_bounded(adapter.as_ref(), &tag, window, &options).await;
                (tag, result)
            }
        })
        .buffer_unordered(workers);

    while let Some((tag, result)) = results.next().await {
        match result {
            Ok(items) => {
                log::debug!("tag '{}': {} items", tag, items.len());
                report.items.extend(items);
            }
            Err(error) => {
                log::warn!("tag '{}' failed: {}", tag, error);
                report.failures.push(TagFailure { tag, error });
            }
        }
    }

    log::info!(
        "{}: {} items from {}/{} tags",
        adapter.name(),
        report.items.len(),
        report.tags_succeeded(),
        report.tags_total
    );
    report
}
