// src/sources/cointelegraph.rs

//! Cointelegraph adapter.
//!
//! Tag listings come from the site's GraphQL endpoint; tags are discovered
//! from the home page news menu and article pages are plain HTML.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::Html;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::models::{CointelegraphConfig, FullArticle, ShortItem};
use crate::sources::{ListingPage, SourceAdapter, element_text, parse_selector};
use crate::utils::http::{RequestOptions, Transport};

pub(crate) const HOST: &str = "cointelegraph.com";
const HOME_URL: &str = "https://cointelegraph.com/";
const GRAPHQL_URL: &str = "https://conpletus.cointelegraph.com/v1/";
const NEWS_URL: &str = "https://cointelegraph.com/news/";
const TAG_PREFIX: &str = "/tags/";

const TAG_PAGE_QUERY: &str = r#"query TagPageQuery($short: String, $slug: String!, $order: String, $offset: Int!, $length: Int!) {
  locale(short: $short) {
    tag(slug: $slug) {
      posts(order: $order, offset: $offset, length: $length) {
        data {
          slug
          postTranslate { title published leadText author { authorTranslates { name } } }
          postBadge { postBadgeTranslates { title } }
        }
      }
    }
  }
}"#;

mod selectors {
    pub const MENU_TAGS: &str = "div.menu-desktop__row nav ul li a[href^=\"/tags/\"]";
    pub const TITLE: &str = "h1.post__title";
    pub const LEAD: &str = "p.post__lead";
    pub const BODY: &str = "div.post-content > p, div.post-content > h2";
    pub const PUBLISHED: &str = "div.post-meta time[datetime]";
    pub const LANGUAGE: &str = "div.header-side-links__select";
}

/// Cointelegraph GraphQL listings and article pages.
pub struct CointelegraphSource {
    transport: Arc<dyn Transport>,
    config: CointelegraphConfig,
}

impl CointelegraphSource {
    pub fn new(transport: Arc<dyn Transport>, config: CointelegraphConfig) -> Self {
        Self { transport, config }
    }

    fn listing_request(&self, tag: &str, page: u32) -> Result<Value> {
        let offset = page
            .saturating_sub(1)
            .checked_mul(self.config.page_size)
            .ok_or_else(|| {
                AppError::parsing(
                    format!("cointelegraph tag {tag} page {page}"),
                    "listing offset overflow",
                )
            })?;
        Ok(json!({
            "operationName": "TagPageQuery",
            "query": TAG_PAGE_QUERY,
            "variables": {
                "slug": tag,
                "order": "postPublishedTime",
                "offset": offset,
                "length": self.config.page_size,
                "short": self.config.locale,
                "cacheTimeInMS": 300000,
            },
        }))
    }
}

#[async_trait]
impl SourceAdapter for CointelegraphSource {
    fn name(&self) -> &str {
        "cointelegraph"
    }

    async fn discover_tags(&self) -> Result<Vec<String>> {
        let html = self
            .transport
            .get_text(HOME_URL, &RequestOptions::default())
            .await?;
        parse_menu_tags(&html)
    }

    async fn list_page(&self, tag: &str, page: u32) -> Result<ListingPage> {
        log::debug!(
            "cointelegraph: tag {} page {} ({} per page)",
            tag,
            page,
            self.config.page_size
        );
        let body = self.listing_request(tag, page)?;
        let response = self
            .transport
            .post_json(GRAPHQL_URL, &body, &RequestOptions::default())
            .await?;
        parse_listing(response)
            .map_err(|e| AppError::parsing(format!("cointelegraph tag {tag} page {page}"), e))
    }

    async fn fetch_full(&self, item: &ShortItem) -> Result<FullArticle> {
        let html = self
            .transport
            .get_text(&item.canonical_link, &RequestOptions::default())
            .await?;
        parse_article(item, html)
    }
}

#[derive(Debug, Deserialize)]
struct TagPageResponse {
    data: Option<TagPageData>,
}

#[derive(Debug, Deserialize)]
struct TagPageData {
    locale: Option<LocaleNode>,
}

#[derive(Debug, Deserialize)]
struct LocaleNode {
    tag: Option<TagNode>,
}

#[derive(Debug, Deserialize)]
struct TagNode {
    posts: PostsNode,
}

#[derive(Debug, Deserialize)]
struct PostsNode {
    #[serde(default)]
    data: Vec<PostNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostNode {
    slug: String,
    post_translate: PostTranslate,
    post_badge: Option<PostBadge>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostTranslate {
    title: String,
    published: String,
    #[serde(default)]
    lead_text: Option<String>,
    author: Option<AuthorNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorNode {
    #[serde(default)]
    author_translates: Vec<NamedNode>,
}

#[derive(Debug, Deserialize)]
struct NamedNode {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostBadge {
    #[serde(default)]
    post_badge_translates: Vec<TitledNode>,
}

#[derive(Debug, Deserialize)]
struct TitledNode {
    title: String,
}

impl PostNode {
    fn into_item(self) -> Result<ShortItem> {
        let published_at = DateTime::parse_from_rfc3339(&self.post_translate.published)
            .map_err(|e| {
                AppError::parsing(
                    format!("post {}", self.slug),
                    format!("bad publish time '{}': {e}", self.post_translate.published),
                )
            })?
            .with_timezone(&Utc);

        let author = self
            .post_translate
            .author
            .and_then(|a| a.author_translates.into_iter().next())
            .map(|n| n.name.trim().to_string())
            .unwrap_or_default();
        let category = self
            .post_badge
            .and_then(|b| b.post_badge_translates.into_iter().next())
            .map(|t| t.title)
            .unwrap_or_default();

        Ok(ShortItem {
            category,
            title: self.post_translate.title,
            canonical_link: format!("{NEWS_URL}{}", self.slug),
            description: self.post_translate.lead_text.unwrap_or_default(),
            author,
            published_at,
        })
    }
}

/// Convert a GraphQL tag page response into a listing page.
fn parse_listing(response: Value) -> Result<ListingPage> {
    let response: TagPageResponse = serde_json::from_value(response)?;
    let tag = response
        .data
        .and_then(|d| d.locale)
        .and_then(|l| l.tag)
        .ok_or_else(|| AppError::parsing("TagPageQuery", "response has no tag node"))?;

    let items = tag
        .posts
        .data
        .into_iter()
        .map(PostNode::into_item)
        .collect::<Result<Vec<_>>>()?;
    Ok(ListingPage::new(items, 0))
}

/// Tag slugs linked from the home page news menu.
fn parse_menu_tags(html: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let sel = parse_selector(selectors::MENU_TAGS)?;

    let mut tags: Vec<String> = Vec::new();
    for link in document.select(&sel) {
        let Some(slug) = link
            .value()
            .attr("href")
            .and_then(|href| href.strip_prefix(TAG_PREFIX))
            .map(|s| s.trim_end_matches('/'))
        else {
            continue;
        };
        if !slug.is_empty() && !tags.iter().any(|t| t == slug) {
            tags.push(slug.to_string());
        }
    }

    if tags.is_empty() {
        return Err(AppError::parsing(
            "cointelegraph home page",
            "no tags found in news menu",
        ));
    }
    Ok(tags)
}

fn parse_article(item: &ShortItem, html: String) -> Result<FullArticle> {
    let context = format!("cointelegraph article {}", item.canonical_link);
    let document = Html::parse_document(&html);

    let first_text = |selector: &str| -> Result<Option<String>> {
        let sel = parse_selector(selector)?;
        Ok(document.select(&sel).next().map(|e| element_text(&e)))
    };

    let header = first_text(selectors::TITLE)?
        .ok_or_else(|| AppError::parsing(&context, "missing title"))?;
    let mut body = first_text(selectors::LEAD)?
        .ok_or_else(|| AppError::parsing(&context, "missing lead"))?;

    let body_sel = parse_selector(selectors::BODY)?;
    for block in document.select(&body_sel) {
        body.push('\n');
        body.push_str(&element_text(&block));
    }

    let language = first_text(selectors::LANGUAGE)?.unwrap_or_else(|| "English".into());

    let time_sel = parse_selector(selectors::PUBLISHED)?;
    let published_at = document
        .select(&time_sel)
        .next()
        .and_then(|t| t.value().attr("datetime"))
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let mut article = FullArticle::from_item(item, header, body, String::new(), language);
    if let Some(published_at) = published_at {
        article.item.published_at = published_at;
    }
    article.raw_markup = html;
    Ok(article)
}
