//! Durable storage for harvested articles.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml              # Harvester configuration
//! ├── news_journal.sqlite      # Ledger of archived links
//! ├── last_parsing.txt         # Last run timestamp
//! └── archives/
//!     └── <sha256(link)>.zip   # article.html + article.json
//! ```

pub mod archive;
pub mod ledger;
pub mod state;

pub use archive::{ArchiveStore, Archived};
pub use ledger::{Ledger, LedgerEntry};
pub use state::RunState;
