//! Game news shown on the launcher's start page.
//!
//! The official site has no feed, so the news index HTML is scraped. Article links
//! look like `/news/<year>/<month>/<slug>`; the title, date, author and excerpt are
//! pulled out of the link body and each article page is then fetched for its
//! preview image. Image lookups run concurrently and never fail the whole fetch.
//!
//! Results are cached in-process for ten minutes. When a refresh fails and older
//! results are cached, those are returned instead of the error.

use anyhow::Result;
use futures::future::join_all;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{LazyLock, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::constants::{NEWS_ARTICLE_TIMEOUT, NEWS_CACHE_TTL, NEWS_FETCH_TIMEOUT};
use crate::core::LauncherError;
use crate::download::http_client;

/// Site the news is scraped from.
pub const NEWS_BASE_URL: &str = "https://hytale.com";

/// Link bodies shorter than this are navigation, not articles.
const MIN_ARTICLE_MARKUP: usize = 50;
const MAX_TITLE_CHARS: usize = 100;
const MAX_EXCERPT_CHARS: usize = 200;

/// A single news article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub title: String,
    pub excerpt: String,
    pub url: String,
    /// Publication date as printed on the site, e.g. `January 15th 2026`.
    pub date: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

struct Patterns {
    link: Regex,
    title: Regex,
    date: Regex,
    author: Regex,
    tag: Regex,
    whitespace: Regex,
    images: [Regex; 3],
    inline_image: Regex,
}

impl Patterns {
    fn compile() -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            link: Regex::new(r#"<a[^>]+href="(/news/\d+/\d+/[^"]+)"[^>]*>([\s\S]*?)</a>"#)?,
            title: Regex::new(r"(?i)<h[1-6][^>]*>([^<]+)</h[1-6]>|<strong>([^<]+)</strong>")?,
            date: Regex::new(
                r"(January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2}(?:st|nd|rd|th)?\s+\d{4}",
            )?,
            author: Regex::new(r"Posted by ([^<\n]+)")?,
            tag: Regex::new(r"<[^>]*>")?,
            whitespace: Regex::new(r"\s+")?,
            images: [
                Regex::new(r#"<meta[^>]+property=["']og:image["'][^>]+content=["']([^"']+)["']"#)?,
                Regex::new(r#"<meta[^>]+content=["']([^"']+)["'][^>]+property=["']og:image["']"#)?,
                Regex::new(r#"<meta[^>]+name=["']twitter:image["'][^>]+content=["']([^"']+)["']"#)?,
            ],
            inline_image: Regex::new(r#"<img[^>]+src=["']([^"']+(?:jpg|jpeg|png|webp)[^"']*)["']"#)?,
        })
    }
}

static PATTERNS: LazyLock<Option<Patterns>> = LazyLock::new(|| Patterns::compile().ok());

fn patterns() -> Result<&'static Patterns> {
    PATTERNS.as_ref().ok_or_else(|| {
        LauncherError::Other {
            message: "news patterns failed to compile".to_string(),
        }
        .into()
    })
}

struct CachedNews {
    items: Vec<NewsItem>,
    fetched_at: Instant,
}

/// Fetches and caches game news.
pub struct NewsFeed {
    client: reqwest::Client,
    base_url: String,
    ttl: Duration,
    cache: Mutex<Option<CachedNews>>,
}

impl NewsFeed {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: NEWS_BASE_URL.to_string(),
            ttl: NEWS_CACHE_TTL,
            cache: Mutex::new(None),
        })
    }

    /// Scrapes a different site root (mock servers in tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns up to `limit` articles, newest first.
    ///
    /// Served from the cache while it is fresh unless `force` is set.
    ///
    /// # Errors
    ///
    /// [`LauncherError::RemoteError`] for a non-200 index page and
    /// [`LauncherError::TransportError`] when the site is unreachable, unless
    /// stale results are cached.
    pub async fn fetch(&self, limit: usize, force: bool) -> Result<Vec<NewsItem>> {
        if !force && let Some(items) = self.cached(limit, true) {
            debug!("Serving {} news items from cache", items.len());
            return Ok(items);
        }

        match self.fetch_fresh(limit).await {
            Ok(items) => {
                if let Ok(mut cache) = self.cache.lock() {
                    *cache = Some(CachedNews {
                        items: items.clone(),
                        fetched_at: Instant::now(),
                    });
                }
                Ok(items)
            }
            Err(e) => match self.cached(limit, false) {
                Some(items) => {
                    warn!("Failed to refresh news, serving cached results: {e}");
                    Ok(items)
                }
                None => Err(e),
            },
        }
    }

    fn cached(&self, limit: usize, fresh_only: bool) -> Option<Vec<NewsItem>> {
        let cache = self.cache.lock().ok()?;
        let cached = cache.as_ref()?;
        if cached.items.is_empty() || (fresh_only && cached.fetched_at.elapsed() >= self.ttl) {
            return None;
        }
        Some(cached.items.iter().take(limit).cloned().collect())
    }

    async fn fetch_fresh(&self, limit: usize) -> Result<Vec<NewsItem>> {
        let url = format!("{}/news", self.base_url);
        let html = self.get_html(&url, NEWS_FETCH_TIMEOUT).await?;

        let mut items = parse_index(&html, &self.base_url, limit)?;
        debug!("Parsed {} news items from {}", items.len(), url);

        let images = join_all(items.iter().map(|item| self.fetch_image(&item.url))).await;
        for (item, image) in items.iter_mut().zip(images) {
            item.image_url = image;
        }
        Ok(items)
    }

    async fn fetch_image(&self, article_url: &str) -> Option<String> {
        match self.get_html(article_url, NEWS_ARTICLE_TIMEOUT).await {
            Ok(html) => extract_image(&html, &self.base_url),
            Err(e) => {
                debug!("No preview image for {article_url}: {e}");
                None
            }
        }
    }

    async fn get_html(&self, url: &str, timeout: Duration) -> Result<String> {
        let transport = |e: reqwest::Error| LauncherError::TransportError {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/html")
            .timeout(timeout)
            .send()
            .await
            .map_err(transport)?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(LauncherError::RemoteError {
                url: url.to_string(),
                status: response.status().as_u16(),
            }
            .into());
        }

        Ok(response.text().await.map_err(transport)?)
    }
}

/// Extracts article entries from the news index page.
fn parse_index(html: &str, base_url: &str, limit: usize) -> Result<Vec<NewsItem>> {
    let patterns = patterns()?;
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for caps in patterns.link.captures_iter(html) {
        if items.len() >= limit {
            break;
        }
        let (Some(href), Some(body)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let body = body.as_str();
        if body.len() < MIN_ARTICLE_MARKUP {
            continue;
        }

        let url = format!("{base_url}{}", href.as_str());
        if seen.contains(&url) {
            continue;
        }

        let text = strip_tags(patterns, body);
        let title = heading(patterns, body).unwrap_or_else(|| {
            let first_line = text.lines().next().unwrap_or_default().trim();
            truncate(first_line, MAX_TITLE_CHARS)
        });
        if title.is_empty() {
            continue;
        }

        let excerpt = text.strip_prefix(title.as_str()).unwrap_or(&text).trim();
        let date = patterns.date.find(body).map(|m| m.as_str().to_string()).unwrap_or_default();
        let author = patterns
            .author
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        seen.insert(url.clone());
        items.push(NewsItem {
            excerpt: truncate(excerpt, MAX_EXCERPT_CHARS),
            title,
            url,
            date,
            author,
            image_url: None,
        });
    }

    Ok(items)
}

fn heading(patterns: &Patterns, body: &str) -> Option<String> {
    let caps = patterns.title.captures(body)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Picks an article's preview image: `og:image`, then `twitter:image`, then the
/// first inline picture.
fn extract_image(html: &str, base_url: &str) -> Option<String> {
    let patterns = PATTERNS.as_ref()?;

    let meta = patterns
        .images
        .iter()
        .find_map(|re| re.captures(html)?.get(1).map(|m| m.as_str().to_string()));
    if meta.is_some() {
        return meta;
    }

    let src = patterns.inline_image.captures(html)?.get(1)?.as_str();
    if src.starts_with("http") {
        Some(src.to_string())
    } else {
        Some(format!("{base_url}{src}"))
    }
}

fn strip_tags(patterns: &Patterns, html: &str) -> String {
    let text = patterns.tag.replace_all(html, " ");
    patterns.whitespace.replace_all(&text, " ").trim().to_string()
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
