//! Source adapters.
//!
//! A source adapter knows one site's layout: how to list a tag's pages and
//! how to turn an article page into a [`FullArticle`]. The crawl engine only
//! relies on the contract that listing pages are ordered newest first.
//!
//! - `coindesk`: HTML tag listings (`CoindeskSource`)
//! - `cointelegraph`: GraphQL tag listings (`CointelegraphSource`)

mod coindesk;
mod cointelegraph;
#[cfg(test)]
pub(crate) mod mock;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::Selector;

use crate::error::{AppError, Result};
use crate::models::{Config, FullArticle, ShortItem};
use crate::utils::http::Transport;
use crate::utils::{parse_source_url, site_host};

pub use coindesk::CoindeskSource;
pub use cointelegraph::CointelegraphSource;

/// One listing page of a tag.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// Usable entries, newest first
    pub items: Vec<ShortItem>,
    /// Entries dropped as non-articles (videos, promos)
    pub filtered: usize,
}

impl ListingPage {
    pub fn new(items: Vec<ShortItem>, filtered: usize) -> Self {
        Self { items, filtered }
    }

    /// No entries at all: the source has no more pages.
    pub fn is_exhausted(&self) -> bool {
        self.items.is_empty() && self.filtered == 0
    }

    /// Entries existed but none were usable.
    pub fn is_sparse(&self) -> bool {
        self.items.is_empty() && self.filtered > 0
    }

    pub fn newest(&self) -> Option<DateTime<Utc>> {
        self.items.iter().map(|i| i.published_at).max()
    }

    pub fn oldest(&self) -> Option<DateTime<Utc>> {
        self.items.iter().map(|i| i.published_at).min()
    }
}

/// Per-site listing and article access.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short site identifier used in logs.
    fn name(&self) -> &str;

    /// Tags (categories, feeds) the site exposes.
    async fn discover_tags(&self) -> Result<Vec<String>>;

    /// Fetch one listing page of a tag. Pages are 1-based.
    async fn list_page(&self, tag: &str, page: u32) -> Result<ListingPage>;

    /// Fetch and parse the article behind a listing entry.
    async fn fetch_full(&self, item: &ShortItem) -> Result<FullArticle>;
}

/// Maps site hosts to adapters.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    adapters: HashMap<String, Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in site adapter.
    pub fn with_defaults(transport: Arc<dyn Transport>, config: &Config) -> Self {
        let mut registry = Self::new();
        registry.register(
            coindesk::HOST,
            Arc::new(CoindeskSource::new(
                Arc::clone(&transport),
                config.sources.coindesk.clone(),
            )),
        );
        registry.register(
            cointelegraph::HOST,
            Arc::new(CointelegraphSource::new(
                transport,
                config.sources.cointelegraph.clone(),
            )),
        );
        registry
    }

    /// Register an adapter for a host (without `www.`).
    pub fn register(&mut self, host: impl Into<String>, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(host.into().to_lowercase(), adapter);
    }

    /// Find the adapter for a user-supplied source URL.
    pub fn resolve(&self, input: &str) -> Result<Arc<dyn SourceAdapter>> {
        let host = parse_source_url(input)
            .as_ref()
            .and_then(site_host)
            .ok_or_else(|| AppError::no_adapter(input))?;

        self.adapters
            .get(&host)
            .cloned()
            .ok_or_else(|| AppError::no_adapter(input))
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }
}

/// Parse a CSS selector, mapping failures to [`AppError::Selector`].
pub(crate) fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Text content of an element, whitespace-normalized.
pub(crate) fn element_text(element: &scraper::ElementRef<'_>) -> String {
    crate::utils::normalize_whitespace(&element.text().collect::<String>())
}
