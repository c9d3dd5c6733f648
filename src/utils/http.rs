// src/utils/http.rs

//! HTTP transport.
//!
//! Source adapters never talk to `reqwest` directly; they go through the
//! [`Transport`] trait so tests can substitute canned responses.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Extra headers and cookies for a single request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    fn header_map(&self, url: &str) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AppError::transport(url, format!("bad header name: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| AppError::transport(url, format!("bad header value: {e}")))?;
            map.insert(name, value);
        }
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            let value = HeaderValue::from_str(&cookie)
                .map_err(|e| AppError::transport(url, format!("bad cookie: {e}")))?;
            map.insert(COOKIE, value);
        }
        Ok(map)
    }
}

/// Turns a URL into raw text or JSON.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET a page as text. Fails on network errors, non-2xx status or an
    /// empty body.
    async fn get_text(&self, url: &str, options: &RequestOptions) -> Result<String>;

    /// POST a JSON body and decode the JSON response.
    async fn post_json(&self, url: &str, body: &Value, options: &RequestOptions)
    -> Result<Value>;
}

/// `reqwest`-backed transport with a per-request timeout.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport from crawler settings.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn send(&self, url: &str, request: reqwest::RequestBuilder) -> Result<String> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::transport(url, format!("status {status}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AppError::transport(url, e))?;
        if text.trim().is_empty() {
            return Err(AppError::transport(url, "empty response body"));
        }
        Ok(text)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_text(&self, url: &str, options: &RequestOptions) -> Result<String> {
        log::debug!("GET {}", url);
        let request = self.client.get(url).headers(options.header_map(url)?);
        self.send(url, request).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        options: &RequestOptions,
    ) -> Result<Value> {
        log::debug!("POST {}", url);
        let request = self
            .client
            .post(url)
            .headers(options.header_map(url)?)
            .json(body);
        let text = self.send(url, request).await?;
        serde_json::from_str(&text)
            .map_err(|e| AppError::transport(url, format!("invalid JSON response: {e}")))
    }
}
