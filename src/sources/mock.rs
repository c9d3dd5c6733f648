//! In-memory source adapter for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::error::{AppError, Result};
use crate::models::{FullArticle, ShortItem};
use crate::sources::{ListingPage, SourceAdapter};

/// Synthetic reverse-chronological source.
///
/// Every tag holds a list of pages; pages past the end are exhausted.
/// Every `list_page` call is recorded.
#[derive(Default)]
pub struct MockSource {
    pages: HashMap<String, Vec<ListingPage>>,
    failing_tags: HashSet<String>,
    failing_links: HashSet<String>,
    list_delay: Option<StdDuration>,
    calls: Mutex<Vec<(String, u32)>>,
    fetches: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Reference time for item 1 of every tag.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Publication time of the n-th item (1-based, newest first).
pub fn item_time(n: usize) -> DateTime<Utc> {
    epoch() - Duration::minutes(10 * (n as i64 - 1))
}

pub fn item_link(tag: &str, n: usize) -> String {
    format!("https://mock.test/{tag}/{n}")
}

pub fn make_item(tag: &str, n: usize) -> ShortItem {
    ShortItem {
        category: tag.to_string(),
        title: format!("Item {n}"),
        canonical_link: item_link(tag, n),
        description: format!("Description {n}"),
        author: "Mock Author".to_string(),
        published_at: item_time(n),
    }
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag with `page_count` pages of `per_page` items each.
    pub fn with_tag(mut self, tag: &str, page_count: usize, per_page: usize) -> Self {
        let pages = (0..page_count)
            .map(|p| {
                let items = (1..=per_page)
                    .map(|i| make_item(tag, p * per_page + i))
                    .collect();
                ListingPage::new(items, 0)
            })
            .collect();
        self.pages.insert(tag.to_string(), pages);
        self
    }

    /// Replace a page (1-based) with a filtered-only page.
    pub fn with_sparse_page(mut self, tag: &str, page: u32) -> Self {
        if let Some(p) = self
            .pages
            .get_mut(tag)
            .zip((page as usize).checked_sub(1))
            .and_then(|(pages, index)| pages.get_mut(index))
        {
            *p = ListingPage::new(Vec::new(), 3);
        }
        self
    }

    pub fn with_failing_tag(mut self, tag: &str) -> Self {
        self.failing_tags.insert(tag.to_string());
        self
    }

    pub fn with_failing_link(mut self, link: &str) -> Self {
        self.failing_links.insert(link.to_string());
        self
    }

    pub fn with_list_delay(mut self, delay: StdDuration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    /// Pages requested for a tag, in call order.
    pub fn calls_for(&self, tag: &str) -> Vec<u32> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == tag)
            .map(|(_, p)| *p)
            .collect()
    }

    pub fn fetched_links(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    /// Highest number of `list_page` calls observed running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn discover_tags(&self) -> Result<Vec<String>> {
        let mut tags: Vec<String> = self.pages.keys().cloned().collect();
        tags.extend(self.failing_tags.iter().cloned());
        tags.sort();
        tags.dedup();
        Ok(tags)
    }

    async fn list_page(&self, tag: &str, page: u32) -> Result<ListingPage> {
        self.calls.lock().unwrap().push((tag.to_string(), page));
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing_tags.contains(tag) {
            return Err(AppError::transport(
                format!("https://mock.test/{tag}/page/{page}"),
                "status 503 Service Unavailable",
            ));
        }
        Ok(self
            .pages
            .get(tag)
            .zip((page as usize).checked_sub(1))
            .and_then(|(pages, index)| pages.get(index))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_full(&self, item: &ShortItem) -> Result<FullArticle> {
        self.fetches
            .lock()
            .unwrap()
            .push(item.canonical_link.clone());
        if self.failing_links.contains(&item.canonical_link) {
            return Err(AppError::transport(&item.canonical_link, "connection reset"));
        }
        Ok(FullArticle::from_item(
            item,
            item.title.clone(),
            format!("Body of {}", item.title),
            format!("<html><body><h1>{}</h1></body></html>", item.title),
            "English",
        ))
    }
}
