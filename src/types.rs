use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical video record. Every field is resolved by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub title: String,
    pub link: String,
    pub thumbnail: String,
    pub channel: String,
    pub publish_date: DateTime<Utc>,
    pub description: String,
}

/// Loosely-typed item as it comes out of the feed parser.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub pub_date: Option<String>,
    /// `media:group/media:thumbnail` URLs, in document order.
    pub media_group_thumbnails: Vec<String>,
    /// A standalone `media:thumbnail` outside the group.
    pub media_thumbnail: Option<String>,
    pub content: Option<String>,
    pub content_snippet: Option<String>,
}

/// One parsed feed: its own title plus raw items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeed {
    pub title: Option<String>,
    pub items: Vec<RawItem>,
}

/// Ordered list of source identifiers (channel IDs or feed URLs).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSourceConfig {
    #[serde(default)]
    pub feeds: Vec<String>,
}

impl FeedSourceConfig {
    pub fn new<I, S>(feeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { feeds: feeds.into_iter().map(Into::into).collect() }
    }

    pub fn is_empty(&self) -> bool { self.feeds.is_empty() }
    pub fn len(&self) -> usize { self.feeds.len() }
}

/// Per-source failure description recorded during aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceError {
    pub source_id: String,
    pub message: String,
}

/// Result of one aggregation run, sorted newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub videos: Vec<VideoRecord>,
    pub partial_errors: Vec<SourceError>,
    /// Number of sources the run attempted.
    pub source_count: usize,
}

impl AggregationResult {
    /// True when every attempted source failed.
    pub fn is_total_failure(&self) -> bool {
        self.source_count > 0 && self.partial_errors.len() >= self.source_count
    }
}
