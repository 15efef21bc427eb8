use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::fetcher::FeedFetcher;
use crate::normalize::normalize;
use crate::types::{AggregationResult, FeedSourceConfig, SourceError, VideoRecord};

/// Aggregator fans out over all configured sources and merges the normalized results.
#[derive(Clone)]
pub struct Aggregator {
    fetcher: Arc<dyn FeedFetcher>,
}

impl Aggregator {
    pub fn new(fetcher: Arc<dyn FeedFetcher>) -> Self { Self { fetcher } }

    /// Fetch every source concurrently, tolerate per-source failures, sort newest first.
    /// Never fails as a whole.
    pub async fn aggregate(&self, sources: &FeedSourceConfig) -> AggregationResult {
        let fetches = sources.feeds.iter().map(|source| async move {
            (source.as_str(), self.fetcher.fetch(source).await)
        });
        let settled = join_all(fetches).await;

        let mut videos: Vec<VideoRecord> = Vec::new();
        let mut partial_errors = Vec::new();
        for (source, outcome) in settled {
            match outcome {
                Ok(feed) => {
                    let label = feed.title.as_deref().unwrap_or_else(|| source.trim());
                    info!(source, items = feed.items.len(), "fetched feed");
                    videos.extend(feed.items.iter().map(|item| normalize(item, label)));
                }
                Err(e) => {
                    warn!(source, error = %e.cause, "failed to fetch feed");
                    partial_errors.push(SourceError { source_id: source.to_string(), message: e.cause.to_string() });
                }
            }
        }

        // Stable: ties keep first-seen order.
        videos.sort_by(|a, b| b.publish_date.cmp(&a.publish_date));
        info!(videos = videos.len(), failed = partial_errors.len(), sources = sources.len(), "aggregation finished");
        AggregationResult { videos, partial_errors, source_count: sources.len() }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::{FetchCause, FetchError};
    use crate::fetcher::FeedFetcher;
    use crate::types::{RawFeed, RawItem};

    /// Scripted fetcher: per-source feeds, failing sources return HTTP 500.
    #[derive(Default)]
    pub(crate) struct StubFetcher {
        feeds: Mutex<HashMap<String, RawFeed>>,
        delays: HashMap<String, Duration>,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        pub(crate) fn with_feed(self, source: &str, title: Option<&str>, items: Vec<RawItem>) -> Self {
            self.set_feed(source, title, items);
            self
        }

        pub(crate) fn with_delay(mut self, source: &str, delay: Duration) -> Self {
            self.delays.insert(source.to_string(), delay);
            self
        }

        pub(crate) fn set_feed(&self, source: &str, title: Option<&str>, items: Vec<RawItem>) {
            let feed = RawFeed { title: title.map(str::to_string), items };
            self.feeds.lock().unwrap().insert(source.to_string(), feed);
        }

        pub(crate) fn remove_feed(&self, source: &str) {
            self.feeds.lock().unwrap().remove(source);
        }

        pub(crate) fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
    }

    #[async_trait]
    impl FeedFetcher for StubFetcher {
        async fn fetch(&self, source_id: &str) -> Result<RawFeed, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(source_id) {
                tokio::time::sleep(*delay).await;
            }
            let feed = self.feeds.lock().unwrap().get(source_id).cloned();
            feed.ok_or_else(|| FetchError::new(source_id, FetchCause::Status(500)))
        }
    }

    pub(crate) fn item(title: &str, date: &str) -> RawItem {
        RawItem {
            title: Some(title.to_string()),
            link: Some(format!("https://www.youtube.com/watch?v={}", title.replace(' ', "_"))),
            pub_date: Some(date.to_string()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{item, StubFetcher};
    use super::*;
    use std::time::Duration;

    fn titles(result: &AggregationResult) -> Vec<&str> {
        result.videos.iter().map(|v| v.title.as_str()).collect()
    }

    #[tokio::test]
    async fn partial_failure_keeps_other_sources() {
        let stub = StubFetcher::default()
            .with_feed("A", Some("Channel A"), vec![item("a1", "2024-01-01T00:00:00Z"), item("a2", "2024-01-03T00:00:00Z")])
            .with_feed("C", Some("Channel C"), vec![item("c1", "2024-01-02T00:00:00Z")]);
        let agg = Aggregator::new(Arc::new(stub));

        let result = agg.aggregate(&FeedSourceConfig::new(["A", "B", "C"])).await;

        assert_eq!(titles(&result), vec!["a2", "c1", "a1"]);
        assert_eq!(result.partial_errors.len(), 1);
        assert_eq!(result.partial_errors[0].source_id, "B");
        assert!(!result.is_total_failure());
    }

    #[tokio::test]
    async fn channel_falls_back_to_source_id() {
        let stub = StubFetcher::default()
            .with_feed("UCnamed", Some("Named"), vec![item("n", "2024-01-01T00:00:00Z")])
            .with_feed("UCanon", None, vec![item("x", "2024-01-02T00:00:00Z")]);
        let agg = Aggregator::new(Arc::new(stub));

        let result = agg.aggregate(&FeedSourceConfig::new(["UCnamed", "UCanon"])).await;

        assert_eq!(result.videos[0].channel, "UCanon");
        assert_eq!(result.videos[1].channel, "Named");
    }

    #[tokio::test]
    async fn ties_keep_first_seen_order() {
        let same = "2024-02-02T00:00:00Z";
        let stub = StubFetcher::default()
            .with_feed("A", None, vec![item("a1", same), item("a2", same)])
            .with_feed("B", None, vec![item("b1", same)]);
        let agg = Aggregator::new(Arc::new(stub));

        let result = agg.aggregate(&FeedSourceConfig::new(["A", "B"])).await;

        assert_eq!(titles(&result), vec!["a1", "a2", "b1"]);
    }

    #[tokio::test]
    async fn all_sources_failing_is_empty_not_an_error() {
        let agg = Aggregator::new(Arc::new(StubFetcher::default()));

        let result = agg.aggregate(&FeedSourceConfig::new(["X", "Y"])).await;

        assert!(result.videos.is_empty());
        assert_eq!(result.partial_errors.len(), 2);
        assert!(result.is_total_failure());
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_run_concurrently() {
        let stub = StubFetcher::default()
            .with_feed("slow1", None, vec![item("s1", "2024-01-01T00:00:00Z")])
            .with_feed("slow2", None, vec![item("s2", "2024-01-02T00:00:00Z")])
            .with_delay("slow1", Duration::from_secs(10))
            .with_delay("slow2", Duration::from_secs(10));
        let agg = Aggregator::new(Arc::new(stub));

        let start = tokio::time::Instant::now();
        let result = agg.aggregate(&FeedSourceConfig::new(["slow1", "slow2"])).await;

        assert_eq!(result.videos.len(), 2);
        assert!(start.elapsed() < Duration::from_secs(15));
    }
}
