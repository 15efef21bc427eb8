//! Retrieval and parsing of a single feed source.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use feed_rs::model::{Entry, Feed};
use html_escape::decode_html_entities;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::{FetchCause, FetchError};
use crate::types::{RawFeed, RawItem};

pub const CHANNEL_FEED_BASE: &str = "https://www.youtube.com/feeds/videos.xml";

/// Fetches one source and returns its parsed items. Failures are per source.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, source_id: &str) -> Result<RawFeed, FetchError>;
}

/// Transport settings for [`HttpFeedFetcher`].
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("tubefeed/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Fetches feeds over HTTP with a shared client.
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self { Self { client } }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, source_id: &str) -> Result<RawFeed, FetchError> {
        let url = resolve_feed_url(source_id).map_err(|c| FetchError::new(source_id, c))?;
        debug!(source = source_id, %url, "fetching feed");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::new(source_id, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(source_id, FetchCause::Status(status.as_u16())));
        }
        let bytes = response.bytes().await.map_err(|e| FetchError::new(source_id, e))?;
        let feed = parse_feed(&bytes).map_err(|e| FetchError::new(source_id, e))?;
        debug!(source = source_id, items = feed.items.len(), "parsed feed");
        Ok(feed)
    }
}

/// Build the retrieval URL: http(s) URLs pass through, anything else is a channel id.
pub fn resolve_feed_url(source_id: &str) -> Result<Url, FetchCause> {
    let id = source_id.trim();
    if id.is_empty() {
        return Err(FetchCause::InvalidSource("empty source identifier".to_string()));
    }
    if let Ok(url) = Url::parse(id) {
        return match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(FetchCause::InvalidSource(format!("unsupported scheme `{other}` in {id}"))),
        };
    }
    let mut url = Url::parse(CHANNEL_FEED_BASE)
        .map_err(|e| FetchCause::InvalidSource(format!("{id}: {e}")))?;
    url.query_pairs_mut().append_pair("channel_id", id);
    Ok(url)
}

/// Parse Atom/RSS bytes into the loosely-typed ingestion shape.
pub fn parse_feed(bytes: &[u8]) -> Result<RawFeed, feed_rs::parser::ParseFeedError> {
    let feed: Feed = feed_rs::parser::parse(bytes)?;
    Ok(RawFeed {
        title: feed.title.map(|t| t.content).filter(|t| !t.trim().is_empty()),
        items: feed.entries.iter().map(raw_item_from_entry).collect(),
    })
}

fn raw_item_from_entry(entry: &Entry) -> RawItem {
    let link = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| entry.links.first())
        .map(|l| l.href.clone());

    let mut media = entry.media.iter();
    let media_group_thumbnails = media
        .next()
        .map(|m| m.thumbnails.iter().map(|t| t.image.uri.clone()).collect())
        .unwrap_or_default();
    let media_thumbnail = media
        .flat_map(|m| m.thumbnails.iter())
        .map(|t| t.image.uri.clone())
        .next();
    let media_description = entry
        .media
        .iter()
        .find_map(|m| m.description.as_ref())
        .map(|d| d.content.clone());

    let summary = entry.summary.as_ref().map(|s| s.content.clone());
    let content = entry
        .content
        .as_ref()
        .and_then(|c| c.body.clone())
        .or_else(|| summary.clone());
    let content_snippet = summary
        .as_deref()
        .map(strip_html)
        .filter(|s| !s.is_empty())
        .or(media_description);

    RawItem {
        title: entry.title.as_ref().map(|t| t.content.clone()),
        link,
        // feed-rs discards date text it cannot parse, so only parsed dates reach the normalizer.
        pub_date: entry.published.or(entry.updated).map(|d| d.to_rfc3339()),
        media_group_thumbnails,
        media_thumbnail,
        content,
        content_snippet,
    }
}

fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    decode_html_entities(&out).split_whitespace().collect::<Vec<_>>().join(" ")
}
