// src/pipeline/crawl.rs

//! Crawl orchestration.
//!
//! One run: resolve sources, fan out over tags, then push every new item
//! through fetch, archive and ledger. Item failures are logged and counted;
//! only configuration errors abort the run.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::models::{Config, CrawlWindow, ShortItem};
use crate::services::{DiscoveryOptions, collect_all};
use crate::sources::{SourceAdapter, SourceRegistry};
use crate::storage::{ArchiveStore, Ledger, RunState};
use crate::utils::http::{HttpTransport, Transport};

/// Everything a run needs, opened once.
pub struct CrawlContext {
    pub config: Config,
    pub registry: SourceRegistry,
    pub ledger: Ledger,
    pub archive: ArchiveStore,
    pub state: RunState,
}

impl CrawlContext {
    pub fn new(
        config: Config,
        registry: SourceRegistry,
        ledger: Ledger,
        archive: ArchiveStore,
        state: RunState,
    ) -> Self {
        Self {
            config,
            registry,
            ledger,
            archive,
            state,
        }
    }

    /// Validate `config` and open the stores under `storage_dir`.
    pub async fn open(config: Config, storage_dir: &Path) -> Result<Self> {
        config.validate()?;

        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.crawler)?);
        let registry = SourceRegistry::with_defaults(transport, &config);
        let ledger = Ledger::open(config.paths.ledger_file(storage_dir)).await?;
        let archive = ArchiveStore::new(config.paths.archive_dir(storage_dir));
        let state = RunState::new(config.paths.last_run_file(storage_dir));

        Ok(Self::new(config, registry, ledger, archive, state))
    }
}

/// What to crawl.
#[derive(Debug, Clone, Default)]
pub struct CrawlRequest {
    /// Source URLs, resolved through the registry
    pub sources: Vec<String>,
    /// Tags to crawl on every source; empty means discover them
    pub tags: Vec<String>,
    /// Explicit window; `None` means from the last run until now
    pub window: Option<CrawlWindow>,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub sources: usize,
    /// Sources whose tag discovery failed
    pub source_failures: usize,
    pub tags_total: usize,
    pub tag_failures: usize,
    /// Items found across all tags, duplicates included
    pub discovered: usize,
    pub unique: usize,
    /// Already in the ledger
    pub skipped: usize,
    pub archived: usize,
    pub failed: usize,
}

enum ItemOutcome {
    Skipped,
    Archived,
}

/// Run one crawl.
pub async fn run_crawler(ctx: &CrawlContext, request: &CrawlRequest) -> Result<CrawlReport> {
    let started = Utc::now();

    let adapters = request
        .sources
        .iter()
        .map(|source| ctx.registry.resolve(source))
        .collect::<Result<Vec<_>>>()?;

    let window = match request.window {
        Some(window) => window,
        None => {
            let last_run = ctx.state.load_last_run().await?;
            CrawlWindow::new(started, last_run.min(started))?
        }
    };

    log::info!(
        "Crawl starting: {} sources, window {}",
        adapters.len(),
        window
    );

    let options = DiscoveryOptions::from_config(&ctx.config.crawler);
    let mut report = CrawlReport {
        sources: adapters.len(),
        ..CrawlReport::default()
    };

    let mut seen = HashSet::new();
    let mut queue: Vec<(Arc<dyn SourceAdapter>, ShortItem)> = Vec::new();

    for adapter in adapters {
        let tags = if request.tags.is_empty() {
            match adapter.discover_tags().await {
                Ok(tags) => tags,
                Err(error) => {
                    log::warn!("{}: tag discovery failed: {}", adapter.name(), error);
                    report.source_failures += 1;
                    continue;
                }
            }
        } else {
            request.tags.clone()
        };

        let fan_out = collect_all(Arc::clone(&adapter), tags, window, &options).await;
        report.tags_total += fan_out.tags_total;
        report.tag_failures += fan_out.failures.len();
        report.discovered += fan_out.items.len();

        for item in fan_out.items {
            if seen.insert(item.canonical_link.clone()) {
                queue.push((Arc::clone(&adapter), item));
            }
        }
    }
    report.unique = queue.len();

    let workers = ctx.config.crawler.item_workers.max(1);
    let mut outcomes = stream::iter(queue)
        .map(|(adapter, item)| async move {
            let outcome = process_item(ctx, adapter.as_ref(), &item).await;
            (item.canonical_link, outcome)
        })
        .buffer_unordered(workers);

    while let Some((link, outcome)) = outcomes.next().await {
        match outcome {
            Ok(ItemOutcome::Skipped) => report.skipped += 1,
            Ok(ItemOutcome::Archived) => report.archived += 1,
            Err(error) => {
                log::warn!("Item {} failed: {}", link, error);
                report.failed += 1;
            }
        }
    }

    // Backfills with an explicit window leave the incremental marker alone.
    if request.window.is_none() {
        ctx.state.save_last_run(started).await?;
    }

    log::info!(
        "Crawl complete: {} archived, {} skipped, {} failed ({} unique of {} discovered, {}/{} tags ok)",
        report.archived,
        report.skipped,
        report.failed,
        report.unique,
        report.discovered,
        report.tags_total - report.tag_failures,
        report.tags_total
    );
    Ok(report)
}

async fn process_item(
    ctx: &CrawlContext,
    adapter: &dyn SourceAdapter,
    item: &ShortItem,
) -> Result<ItemOutcome> {
    if ctx.ledger.is_parsed(&item.canonical_link).await? {
        log::debug!("{} already archived", item.canonical_link);
        return Ok(ItemOutcome::Skipped);
    }

    let article = adapter.fetch_full(item).await?;
    let archived = ctx.archive.archive(&article).await?;
    ctx.ledger.upsert(&article, &archived.path).await?;

    log::debug!("{} -> {}", item.canonical_link, archived.path.display());
    Ok(ItemOutcome::Archived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::sources::mock::{MockSource, item_link, item_time};
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        ctx: CrawlContext,
    }

    async fn harness(sources: &[(&str, Arc<MockSource>)]) -> Harness {
        let dir = TempDir::new().unwrap();
        let mut registry = SourceRegistry::new();
        for (host, source) in sources {
            registry.register(*host, Arc::clone(source) as Arc<dyn SourceAdapter>);
        }
        let ctx = CrawlContext::new(
            Config::default(),
            registry,
            Ledger::in_memory().await.unwrap(),
            ArchiveStore::new(dir.path().join("archives")),
            RunState::new(dir.path().join("last_parsing.txt")),
        );
        Harness { _dir: dir, ctx }
    }

    fn request(tags: &[&str], window: Option<CrawlWindow>) -> CrawlRequest {
        CrawlRequest {
            sources: vec!["https://mock.test".into()],
            tags: tags.iter().map(|t| t.to_string()).collect(),
            window,
        }
    }

    fn scenario_window() -> Option<CrawlWindow> {
        Some(CrawlWindow::new(item_time(30), item_time(70)).unwrap())
    }

    fn archive_count(ctx: &CrawlContext) -> usize {
        std::fs::read_dir(ctx.archive.root()).unwrap().count()
    }

    #[tokio::test]
    async fn test_scenario_archives_window_once() {
        let source = Arc::new(MockSource::new().with_tag("news", 5, 20));
        let h = harness(&[("mock.test", source.clone())]).await;

        let report = run_crawler(&h.ctx, &request(&[], scenario_window())).await.unwrap();

        assert_eq!(report.tags_total, 1);
        assert_eq!(report.unique, 41);
        assert_eq!(report.archived, 41);
        assert_eq!(report.failed, 0);
        assert_eq!(h.ctx.ledger.count().await.unwrap(), 41);
        assert_eq!(archive_count(&h.ctx), 41);
        assert!(h.ctx.ledger.is_parsed(&item_link("news", 30)).await.unwrap());
        assert!(!h.ctx.ledger.is_parsed(&item_link("news", 29)).await.unwrap());
        assert!(!source.calls_for("news").contains(&5));
    }

    #[tokio::test]
    async fn test_second_run_skips_everything() {
        let source = Arc::new(MockSource::new().with_tag("news", 5, 20));
        let h = harness(&[("mock.test", source.clone())]).await;

        run_crawler(&h.ctx, &request(&[], scenario_window())).await.unwrap();
        let fetched = source.fetched_links().len();
        let report = run_crawler(&h.ctx, &request(&[], scenario_window())).await.unwrap();

        assert_eq!(report.skipped, 41);
        assert_eq!(report.archived, 0);
        assert_eq!(source.fetched_links().len(), fetched);
        assert_eq!(h.ctx.ledger.count().await.unwrap(), 41);
    }

    #[tokio::test]
    async fn test_item_failure_does_not_stop_run() {
        let broken = item_link("news", 50);
        let source = Arc::new(MockSource::new().with_tag("news", 5, 20).with_failing_link(&broken));
        let h = harness(&[("mock.test", source)]).await;

        let report = run_crawler(&h.ctx, &request(&[], scenario_window())).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.archived, 40);
        assert!(!h.ctx.ledger.is_parsed(&broken).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_source_aborts_before_work() {
        let source = Arc::new(MockSource::new().with_tag("news", 5, 20));
        let h = harness(&[("mock.test", source.clone())]).await;
        let mut request = request(&[], scenario_window());
        request.sources.push("https://unknown.test/tags".into());

        let err = run_crawler(&h.ctx, &request).await.unwrap_err();

        assert!(matches!(err, AppError::NoAdapter { .. }));
        assert!(err.is_config_error());
        assert!(source.calls_for("news").is_empty());
    }

    #[tokio::test]
    async fn test_explicit_tags_override_discovery() {
        let source = Arc::new(
            MockSource::new()
                .with_tag("alpha", 5, 20)
                .with_tag("beta", 5, 20),
        );
        let h = harness(&[("mock.test", source.clone())]).await;

        let report = run_crawler(&h.ctx, &request(&["alpha"], scenario_window()))
            .await
            .unwrap();

        assert_eq!(report.tags_total, 1);
        assert_eq!(report.archived, 41);
        assert!(source.calls_for("beta").is_empty());
    }

    #[tokio::test]
    async fn test_failing_tag_is_counted_and_isolated() {
        let source = Arc::new(
            MockSource::new()
                .with_tag("alpha", 5, 20)
                .with_failing_tag("broken"),
        );
        let h = harness(&[("mock.test", source)]).await;

        let report = run_crawler(&h.ctx, &request(&[], scenario_window())).await.unwrap();

        assert_eq!(report.tags_total, 2);
        assert_eq!(report.tag_failures, 1);
        assert_eq!(report.archived, 41);
    }

    #[tokio::test]
    async fn test_duplicate_links_are_processed_once() {
        let source = Arc::new(MockSource::new().with_tag("news", 5, 20));
        let h = harness(&[("mock.test", source.clone()), ("mirror.test", source.clone())]).await;
        let mut request = request(&[], scenario_window());
        request.sources.push("mirror.test".into());

        let report = run_crawler(&h.ctx, &request).await.unwrap();

        assert_eq!(report.discovered, 82);
        assert_eq!(report.unique, 41);
        assert_eq!(report.archived, 41);
        assert_eq!(source.fetched_links().len(), 41);
    }

    #[tokio::test]
    async fn test_incremental_window_uses_last_run() {
        let source = Arc::new(MockSource::new().with_tag("news", 5, 20));
        let h = harness(&[("mock.test", source)]).await;
        h.ctx.state.save_last_run(item_time(10)).await.unwrap();

        let before = Utc::now();
        let report = run_crawler(&h.ctx, &request(&[], None)).await.unwrap();

        assert_eq!(report.archived, 10);
        let last_run = h.ctx.state.load_last_run().await.unwrap();
        assert!(last_run >= before);
    }

    #[tokio::test]
    async fn test_explicit_window_keeps_last_run() {
        let source = Arc::new(MockSource::new().with_tag("news", 5, 20));
        let h = harness(&[("mock.test", source)]).await;
        h.ctx.state.save_last_run(item_time(10)).await.unwrap();

        run_crawler(&h.ctx, &request(&[], scenario_window())).await.unwrap();

        assert_eq!(h.ctx.state.load_last_run().await.unwrap(), item_time(10));
    }
}
