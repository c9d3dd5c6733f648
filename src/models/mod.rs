// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod article;
mod config;
mod window;

// Re-export all public types
pub use article::{FullArticle, ShortItem};
pub use config::{
    CoindeskConfig, CointelegraphConfig, Config, CrawlerConfig, PathsConfig, SourcesConfig,
};
pub use window::CrawlWindow;
