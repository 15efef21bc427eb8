use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tubefeed::fetcher::parse_feed;
use tubefeed::normalize::PLACEHOLDER_THUMBNAIL;
use tubefeed::prelude::*;

/// Serves canned Atom documents keyed by source id.
struct FixtureFetcher {
    docs: HashMap<String, String>,
    calls: AtomicUsize,
}

#[async_trait]
impl FeedFetcher for FixtureFetcher {
    async fn fetch(&self, source_id: &str) -> Result<RawFeed, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let doc = self
            .docs
            .get(source_id)
            .ok_or_else(|| FetchError::new(source_id, FetchCause::Status(404)))?;
        parse_feed(doc.as_bytes()).map_err(|e| FetchError::new(source_id, e))
    }
}

fn atom(channel: &str, entries: &[(&str, &str, &str)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, title, published)| {
            format!(
                r#"<entry><id>yt:video:{id}</id><title>{title}</title>
<link rel="alternate" href="https://www.youtube.com/watch?v={id}"/>
<published>{published}</published></entry>"#
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:media="http://search.yahoo.com/mrss/">
<id>yt:channel:{channel}</id><title>{channel}</title>{body}</feed>"#
    )
}

fn subscriptions(body: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    f.write_all(body.as_bytes()).unwrap();
    f
}

#[tokio::test]
async fn end_to_end_merge_cache_and_refresh() {
    let fetcher = Arc::new(FixtureFetcher {
        docs: HashMap::from([
            ("UCalpha".to_string(), atom("Alpha", &[("a1", "Alpha One", "2024-03-01T00:00:00Z"), ("a2", "Alpha Two", "2024-03-05T00:00:00Z")])),
            ("UCgamma".to_string(), atom("Gamma", &[("g1", "Gamma One", "2024-03-03T00:00:00Z")])),
            ("UCbroken".to_string(), "<not-a-feed".to_string()),
        ]),
        calls: AtomicUsize::new(0),
    });
    let file = subscriptions("feeds:\n  - UCalpha\n  - UCbroken\n  - UCmissing\n  - UCgamma\n");
    let service = FeedService::new(
        TtlCache::with_settings(Duration::from_secs(900), Duration::from_secs(300)),
        Aggregator::new(fetcher.clone()),
        Arc::new(SubscriptionFile::new(file.path())),
        Duration::from_secs(900),
    );

    let fresh = service.get_feeds().await;
    assert!(!fresh.cached);
    assert!(fresh.error.is_none());
    let titles: Vec<_> = fresh.videos.iter().map(|v| v.title.as_str()).collect();
    assert_eq!(titles, vec!["Alpha Two", "Gamma One", "Alpha One"]);
    assert_eq!(fresh.videos[0].channel, "Alpha");
    assert_eq!(fresh.videos[0].thumbnail, "https://img.youtube.com/vi/a2/maxresdefault.jpg");
    assert!(fresh.videos.iter().all(|v| v.thumbnail != PLACEHOLDER_THUMBNAIL));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 4);

    let cached = service.get_feeds().await;
    assert!(cached.cached);
    assert_eq!(cached.videos, fresh.videos);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 4);

    let refreshed = service.refresh_feeds().await;
    assert!(refreshed.success);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 8);

    let info = service.cache_info();
    assert_eq!(info.cache_info.stats.valid_entries, 1);
    assert_eq!(info.cache_info.stats.total_videos, 3);

    service.clear_cache();
    assert!(!service.get_feeds().await.cached);
    service.shutdown();
    assert!(!service.cache().sweeper_running());
}

#[tokio::test]
async fn missing_subscriptions_file_surfaces_error() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FixtureFetcher { docs: HashMap::new(), calls: AtomicUsize::new(0) });
    let service = FeedService::new(
        TtlCache::without_sweeper(Duration::from_secs(900)),
        Aggregator::new(fetcher.clone()),
        Arc::new(SubscriptionFile::new(dir.path().join("subscriptions.yaml"))),
        Duration::from_secs(900),
    );

    let resp = service.get_feeds().await;
    assert!(resp.videos.is_empty());
    assert!(resp.error.as_deref().unwrap().contains("Subscriptions file not found"));

    let refresh = service.refresh_feeds().await;
    assert!(!refresh.success);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);

    let json = serde_json::to_value(&refresh).unwrap();
    assert_eq!(json["success"], false);
    assert!(json.get("videos").is_none());
    assert!(json["timestamp"].is_i64());
}
