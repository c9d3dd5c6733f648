// src/sources/coindesk.rs

//! CoinDesk adapter.
//!
//! Tag listings are server-rendered HTML at `/tag/{tag}/{page}`. Listing
//! dates look like `Jun 7, 2023 at 10:15 p.m. UTC`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use scraper::{ElementRef, Html};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CoindeskConfig, FullArticle, ShortItem};
use crate::sources::{ListingPage, SourceAdapter, element_text, parse_selector};
use crate::utils::http::{RequestOptions, Transport};
use crate::utils::resolve_url;

pub(crate) const HOST: &str = "coindesk.com";
const BASE_URL: &str = "https://www.coindesk.com";

mod selectors {
    pub const CARD: &str = "div.articleTextSection";
    pub const TITLE: &str = "a.card-title";
    pub const CATEGORY: &str = "a.category";
    pub const DESCRIPTION: &str = "span.content-text";
    pub const AUTHOR: &str = "a.ac-author";
    pub const DATE: &str = "div.timing-data span";

    pub const HEADLINE: &str = ".at-headline";
    pub const SUBHEADLINE: &str = ".at-subheadline";
    pub const CONTENT: &str = ".at-content-section";
    pub const CREATED: &str = "div.at-created > div > span";
    pub const LANGUAGE: &str = "div.footer-selectstyles__StyledRootContainer-sxto8j-0 > button";
}

/// CoinDesk tag listings and article pages.
pub struct CoindeskSource {
    transport: Arc<dyn Transport>,
    config: CoindeskConfig,
}

impl CoindeskSource {
    pub fn new(transport: Arc<dyn Transport>, config: CoindeskConfig) -> Self {
        Self { transport, config }
    }

    fn listing_url(tag: &str, page: u32) -> String {
        format!("{BASE_URL}/tag/{tag}/{page}")
    }
}

#[async_trait]
impl SourceAdapter for CoindeskSource {
    fn name(&self) -> &str {
        "coindesk"
    }

    async fn discover_tags(&self) -> Result<Vec<String>> {
        Ok(self.config.tags.clone())
    }

    async fn list_page(&self, tag: &str, page: u32) -> Result<ListingPage> {
        let url = Self::listing_url(tag, page);
        let html = self
            .transport
            .get_text(&url, &RequestOptions::default())
            .await?;
        parse_listing(&html, &url)
    }

    async fn fetch_full(&self, item: &ShortItem) -> Result<FullArticle> {
        let html = self
            .transport
            .get_text(&item.canonical_link, &RequestOptions::default())
            .await?;
        parse_article(item, html)
    }
}

/// Parse a listing page. Video cards count as filtered entries.
fn parse_listing(html: &str, page_url: &str) -> Result<ListingPage> {
    let document = Html::parse_document(html);
    let card_sel = parse_selector(selectors::CARD)?;
    let base = Url::parse(page_url)?;

    let mut items = Vec::new();
    let mut filtered = 0;
    for card in document.select(&card_sel) {
        match parse_card(&card, &base) {
            Ok(Some(item)) => items.push(item),
            Ok(None) => filtered += 1,
            Err(e) => {
                return Err(AppError::parsing(
                    format!("coindesk listing {page_url}"),
                    e,
                ));
            }
        }
    }
    Ok(ListingPage::new(items, filtered))
}

fn parse_card(card: &ElementRef<'_>, base: &Url) -> Result<Option<ShortItem>> {
    let title_sel = parse_selector(selectors::TITLE)?;
    let title = card
        .select(&title_sel)
        .next()
        .ok_or_else(|| AppError::parsing("card", "missing title link"))?;
    let href = title
        .value()
        .attr("href")
        .ok_or_else(|| AppError::parsing("card", "title link has no href"))?;
    if href.contains("/video/") {
        return Ok(None);
    }

    let date_text = select_text(card, selectors::DATE)?
        .ok_or_else(|| AppError::parsing("card", "missing date"))?;
    let published_at = parse_listing_date(&date_text)
        .ok_or_else(|| AppError::parsing("card", format!("unparseable date '{date_text}'")))?;

    Ok(Some(ShortItem {
        category: select_text(card, selectors::CATEGORY)?.unwrap_or_default(),
        title: element_text(&title),
        canonical_link: resolve_url(base, href),
        description: select_text(card, selectors::DESCRIPTION)?.unwrap_or_default(),
        author: select_text(card, selectors::AUTHOR)?.unwrap_or_default(),
        published_at,
    }))
}

fn select_text(scope: &ElementRef<'_>, selector: &str) -> Result<Option<String>> {
    let sel = parse_selector(selector)?;
    Ok(scope.select(&sel).next().map(|e| element_text(&e)))
}

/// Parse `Jun 7, 2023 at 10:15 p.m. UTC` style dates as UTC.
fn parse_listing_date(text: &str) -> Option<DateTime<Utc>> {
    let cleaned = text.replace('.', "");
    let cleaned = cleaned.trim();
    let without_zone = cleaned
        .strip_suffix("UTC")
        .or_else(|| cleaned.strip_suffix("GMT"))
        .unwrap_or(cleaned)
        .trim();
    NaiveDateTime::parse_from_str(without_zone, "%b %d, %Y at %I:%M %p")
        .ok()
        .map(|naive| naive.and_utc())
}

fn parse_article(item: &ShortItem, html: String) -> Result<FullArticle> {
    let context = format!("coindesk article {}", item.canonical_link);
    let document = Html::parse_document(&html);
    let root = document.root_element();

    let header = select_text(&root, selectors::HEADLINE)?
        .ok_or_else(|| AppError::parsing(&context, "missing headline"))?;
    let mut body = select_text(&root, selectors::SUBHEADLINE)?
        .ok_or_else(|| AppError::parsing(&context, "missing sub-headline"))?;

    let content_sel = parse_selector(selectors::CONTENT)?;
    for section in document.select(&content_sel) {
        body.push('\n');
        body.push_str(&element_text(&section));
    }

    let language = select_text(&root, selectors::LANGUAGE)?.unwrap_or_else(|| "English".into());

    let mut article = FullArticle::from_item(item, header, body, String::new(), language);
    if let Some(published_at) = select_text(&root, selectors::CREATED)?
        .as_deref()
        .and_then(parse_listing_date)
    {
        article.item.published_at = published_at;
    }
    article.raw_markup = html;
    Ok(article)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LISTING: &str = r#"
        <html><body>
          <div class="articleTextSection">
            <a class="category" href="/markets/">Markets</a>
            <a class="card-title" href="/markets/2023/06/07/ether-climbs/">Ether Climbs</a>
            <span class="content-text">ETH rose 5%.</span>
            <a class="ac-author" href="/author/jane">Jane Doe</a>
            <div class="timing-data"><span>Jun 7, 2023 at 10:15 p.m. UTC</span></div>
          </div>
          <div class="articleTextSection">
            <a class="category" href="/tv/">TV</a>
            <a class="card-title" href="/video/some-show/">Some Show</a>
            <div class="timing-data"><span>Jun 7, 2023 at 9:00 a.m. UTC</span></div>
          </div>
          <div class="articleTextSection">
            <a class="category" href="/policy/">Policy</a>
            <a class="card-title" href="/policy/2023/06/07/sec-rule/">SEC Rule</a>
            <span class="content-text">New rule.</span>
            <a class="ac-author" href="/author/john">John Roe</a>
            <div class="timing-data"><span>Jun 7, 2023 at 8:05 a.m. UTC</span></div>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_parse_listing_filters_videos() {
        let page = parse_listing(LISTING, "https://www.coindesk.com/tag/markets/1").unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.filtered, 1);
        assert_eq!(page.items[0].title, "Ether Climbs");
        assert_eq!(
            page.items[0].canonical_link,
            "https://www.coindesk.com/markets/2023/06/07/ether-climbs/"
        );
        assert_eq!(page.items[0].author, "Jane Doe");
        assert_eq!(page.items[0].category, "Markets");
        assert_eq!(
            page.items[0].published_at,
            Utc.with_ymd_and_hms(2023, 6, 7, 22, 15, 0).unwrap()
        );
    }

    #[test]
    fn test_empty_listing_is_exhausted() {
        let page = parse_listing("<html><body></body></html>", "https://www.coindesk.com/tag/x/9")
            .unwrap();
        assert!(page.is_exhausted());
    }

    #[test]
    fn test_card_without_date_is_parsing_error() {
        let html = r#"<div class="articleTextSection"><a class="card-title" href="/a/">A</a></div>"#;
        let err = parse_listing(html, "https://www.coindesk.com/tag/x/1").unwrap_err();
        assert!(matches!(err, AppError::Parsing { .. }));
    }

    #[test]
    fn test_parse_listing_date_variants() {
        assert_eq!(
            parse_listing_date("Jan 12, 2024 at 1:02 a.m. UTC"),
            Some(Utc.with_ymd_and_hms(2024, 1, 12, 1, 2, 0).unwrap())
        );
        assert_eq!(
            parse_listing_date("Dec 31, 2023 at 11:59 PM GMT"),
            Some(Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 0).unwrap())
        );
        assert_eq!(parse_listing_date("yesterday"), None);
    }

    #[test]
    fn test_parse_article() {
        let item = ShortItem {
            category: "Markets".into(),
            title: "Ether Climbs".into(),
            canonical_link: "https://www.coindesk.com/markets/2023/06/07/ether-climbs/".into(),
            description: String::new(),
            author: "Jane Doe".into(),
            published_at: Utc.with_ymd_and_hms(2023, 6, 7, 22, 0, 0).unwrap(),
        };
        let html = r#"
            <html><body>
              <div class="at-headline"><h1>Ether Climbs 5%</h1></div>
              <div class="at-subheadline"><h2>Traders cheer.</h2></div>
              <div class="at-created"><div><span>Jun 7, 2023 at 10:15 p.m. UTC</span></div></div>
              <div class="at-content-section"><p>First paragraph.</p></div>
              <div class="at-content-section"><p>Second paragraph.</p></div>
            </body></html>
        "#;

        let article = parse_article(&item, html.to_string()).unwrap();
        assert_eq!(article.header, "Ether Climbs 5%");
        assert_eq!(article.body_text, "Traders cheer.\nFirst paragraph.\nSecond paragraph.");
        assert_eq!(article.language, "English");
        assert_eq!(article.raw_markup, html);
        assert_eq!(article.source_href, item.canonical_link);
        assert_eq!(
            article.published_at(),
            Utc.with_ymd_and_hms(2023, 6, 7, 22, 15, 0).unwrap()
        );
    }

    #[test]
    fn test_article_without_headline_fails() {
        let item = ShortItem {
            category: String::new(),
            title: String::new(),
            canonical_link: "https://www.coindesk.com/x/".into(),
            description: String::new(),
            author: String::new(),
            published_at: Utc::now(),
        };
        let err = parse_article(&item, "<html><body></body></html>".into()).unwrap_err();
        assert!(matches!(err, AppError::Parsing { .. }));
    }
}
