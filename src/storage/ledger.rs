//! SQLite ledger of archived links.
//!
//! One row per canonical link. A link counts as parsed once its row carries
//! a non-empty archive path.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::error::Result;
use crate::models::FullArticle;
use crate::utils::content_address;

/// Version stamped on rows written by the current article parsers.
pub const PARSER_VERSION: i64 = 0;

/// A ledger row.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct LedgerEntry {
    pub href: String,
    pub slug: String,
    pub published_at: Option<DateTime<Utc>>,
    pub parsed_at: Option<DateTime<Utc>>,
    pub parser_version: i64,
    pub archive_path: String,
}

/// Durable record of which links have been archived.
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    /// Open (creating if needed) the ledger database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let ledger = Self { pool };
        ledger.run_migrations().await?;
        log::debug!("ledger opened at {}", path.display());
        Ok(ledger)
    }

    /// Ephemeral ledger for tests and dry runs.
    ///
    /// A single connection that never idles out, since every new in-memory
    /// connection would see an empty database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let ledger = Self { pool };
        ledger.run_migrations().await?;
        Ok(ledger)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS article_links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                href TEXT NOT NULL UNIQUE,
                slug TEXT NOT NULL,
                published_at TEXT,
                parsed_at TEXT,
                parser_version INTEGER NOT NULL DEFAULT 0,
                archive_path TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Whether `link` has a row with a recorded archive.
    pub async fn is_parsed(&self, link: &str) -> Result<bool> {
        let path: Option<String> =
            sqlx::query_scalar("SELECT archive_path FROM article_links WHERE href = ?")
                .bind(link)
                .fetch_optional(&self.pool)
                .await?;
        Ok(path.is_some_and(|p| !p.is_empty()))
    }

    pub async fn get(&self, link: &str) -> Result<Option<LedgerEntry>> {
        let entry = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT href, slug, published_at, parsed_at, parser_version, archive_path
            FROM article_links
            WHERE href = ?
            "#,
        )
        .bind(link)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    /// Insert or refresh the row for an archived article.
    ///
    /// Runs as one statement in its own transaction; a failure leaves no
    /// partial row behind.
    pub async fn upsert(&self, article: &FullArticle, archive_path: &Path) -> Result<()> {
        let now = Utc::now();
        let link = article.link();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO article_links
                (href, slug, published_at, parsed_at, parser_version, archive_path, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(href) DO UPDATE SET
                published_at = excluded.published_at,
                parsed_at = excluded.parsed_at,
                parser_version = excluded.parser_version,
                archive_path = excluded.archive_path,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(link)
        .bind(content_address(link))
        .bind(article.published_at())
        .bind(article.parsed_at)
        .bind(PARSER_VERSION)
        .bind(archive_path.to_string_lossy().into_owned())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM article_links")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
