//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage locations, relative to the storage directory
    #[serde(default)]
    pub paths: PathsConfig,

    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Per-site adapter settings
    #[serde(default)]
    pub sources: SourcesConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_workers == 0 {
            return Err(AppError::validation("crawler.max_workers must be > 0"));
        }
        if self.crawler.item_workers == 0 {
            return Err(AppError::validation("crawler.item_workers must be > 0"));
        }
        if self.crawler.max_sparse_pages == 0 {
            return Err(AppError::validation(
                "crawler.max_sparse_pages must be > 0",
            ));
        }
        if self.sources.cointelegraph.page_size == 0 {
            return Err(AppError::validation(
                "sources.cointelegraph.page_size must be > 0",
            ));
        }
        if self.paths.archive_dir.as_os_str().is_empty() {
            return Err(AppError::validation("paths.archive_dir is empty"));
        }
        Ok(())
    }
}

/// Storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding one archive per article
    #[serde(default = "defaults::archive_dir")]
    pub archive_dir: PathBuf,

    /// SQLite ledger file
    #[serde(default = "defaults::ledger_file")]
    pub ledger_file: PathBuf,

    /// File holding the last run timestamp
    #[serde(default = "defaults::last_run_file")]
    pub last_run_file: PathBuf,
}

impl PathsConfig {
    /// Resolve a configured path against the storage directory.
    fn resolve(root: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }

    pub fn archive_dir(&self, root: &Path) -> PathBuf {
        Self::resolve(root, &self.archive_dir)
    }

    pub fn ledger_file(&self, root: &Path) -> PathBuf {
        Self::resolve(root, &self.ledger_file)
    }

    pub fn last_run_file(&self, root: &Path) -> PathBuf {
        Self::resolve(root, &self.last_run_file)
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            archive_dir: defaults::archive_dir(),
            ledger_file: defaults::ledger_file(),
            last_run_file: defaults::last_run_file(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Timeout applied to every network call, in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between sequential page fetches in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum tags crawled concurrently
    #[serde(default = "defaults::max_workers")]
    pub max_workers: usize,

    /// Maximum articles fetched and archived concurrently
    #[serde(default = "defaults::item_workers")]
    pub item_workers: usize,

    /// Consecutive filtered-only pages tolerated before giving up
    #[serde(default = "defaults::max_sparse_pages")]
    pub max_sparse_pages: u32,

    /// Optional deadline for one tag's locate and walk, 0 disables it
    #[serde(default)]
    pub tag_timeout_secs: u64,
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn tag_timeout(&self) -> Option<Duration> {
        (self.tag_timeout_secs > 0).then(|| Duration::from_secs(self.tag_timeout_secs))
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_workers: defaults::max_workers(),
            item_workers: defaults::item_workers(),
            max_sparse_pages: defaults::max_sparse_pages(),
            tag_timeout_secs: 0,
        }
    }
}

/// Per-site adapter settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub coindesk: CoindeskConfig,

    #[serde(default)]
    pub cointelegraph: CointelegraphConfig,
}

/// CoinDesk settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoindeskConfig {
    /// Tag slugs to crawl; the site exposes no tag index
    #[serde(default = "defaults::coindesk_tags")]
    pub tags: Vec<String>,
}

impl Default for CoindeskConfig {
    fn default() -> Self {
        Self {
            tags: defaults::coindesk_tags(),
        }
    }
}

/// Cointelegraph settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CointelegraphConfig {
    /// Posts requested per listing page
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    /// Site locale passed to the listing query
    #[serde(default = "defaults::locale")]
    pub locale: String,
}

impl Default for CointelegraphConfig {
    fn default() -> Self {
        Self {
            page_size: defaults::page_size(),
            locale: defaults::locale(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Path defaults
    pub fn archive_dir() -> PathBuf {
        PathBuf::from("archives")
    }
    pub fn ledger_file() -> PathBuf {
        PathBuf::from("news_journal.sqlite")
    }
    pub fn last_run_file() -> PathBuf {
        PathBuf::from("last_parsing.txt")
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; harvester/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        0
    }
    pub fn max_workers() -> usize {
        4
    }
    pub fn item_workers() -> usize {
        4
    }
    pub fn max_sparse_pages() -> u32 {
        5
    }

    // Source defaults
    pub fn coindesk_tags() -> Vec<String> {
        ["yuga-labs", "nfts", "metaverse", "dao", "gaming"]
            .into_iter()
            .map(String::from)
            .collect()
    }
    pub fn page_size() -> u32 {
        15
    }
    pub fn locale() -> String {
        "en".into()
    }
}
