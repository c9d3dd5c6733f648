// src/lib.rs

//! Harvester Library
//!
//! Incremental, date-windowed crawling of paginated news sources. Each
//! article is archived and recorded exactly once.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod sources;
pub mod storage;
pub mod utils;
