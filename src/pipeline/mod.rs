//! Pipeline entry points.
//!
//! - `run_crawler`: Discover, fetch, archive and record new articles
//! - `retrieve_article` / `extract_article`: Read archived articles back

pub mod crawl;
pub mod extract;

pub use crawl::{CrawlContext, CrawlReport, CrawlRequest, run_crawler};
pub use extract::{extract_article, locate_archive, retrieve_article};
