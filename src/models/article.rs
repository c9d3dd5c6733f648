//! Article data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A listing entry discovered on a source page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShortItem {
    /// Listing category or badge
    pub category: String,

    /// Article title as shown on the listing
    pub title: String,

    /// Normalized article URL, the identity key
    pub canonical_link: String,

    /// Lead text or teaser
    pub description: String,

    /// Author display name
    pub author: String,

    /// Publication time
    pub published_at: DateTime<Utc>,
}

/// A fully fetched article.
///
/// The JSON projection omits `raw_markup`; the archive stores it as a
/// separate part.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FullArticle {
    #[serde(flatten)]
    pub item: ShortItem,

    /// Article headline from the article page
    pub header: String,

    /// Extracted body text
    pub body_text: String,

    /// Raw page markup
    #[serde(skip)]
    pub raw_markup: String,

    /// Time the article page was parsed
    pub parsed_at: DateTime<Utc>,

    /// Page language as reported by the site
    pub language: String,

    /// URL the article was fetched from
    pub source_href: String,
}

impl FullArticle {
    /// Build an article from a listing entry and the parsed page parts.
    pub fn from_item(
        item: &ShortItem,
        header: impl Into<String>,
        body_text: impl Into<String>,
        raw_markup: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            source_href: item.canonical_link.clone(),
            item: item.clone(),
            header: header.into(),
            body_text: body_text.into(),
            raw_markup: raw_markup.into(),
            parsed_at: Utc::now(),
            language: language.into(),
        }
    }

    pub fn link(&self) -> &str {
        &self.item.canonical_link
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.item.published_at
    }
}
