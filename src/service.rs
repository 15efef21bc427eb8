use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::aggregator::Aggregator;
use crate::api::{CacheInfoResponse, ClearCacheResponse, FeedsResponse, RefreshResponse};
use crate::cache::TtlCache;
use crate::config::{Settings, SubscriptionFile, Subscriptions};
use crate::error::ServiceError;
use crate::fetcher::HttpFeedFetcher;
use crate::types::AggregationResult;

pub const CACHE_KEY: &str = "rss_feeds";

/// Cache-first front door over the aggregator. One instance per process.
pub struct FeedService {
    cache: TtlCache,
    aggregator: Aggregator,
    subscriptions: Arc<dyn Subscriptions>,
    cache_ttl: Duration,
}

impl FeedService {
    pub fn new(cache: TtlCache, aggregator: Aggregator, subscriptions: Arc<dyn Subscriptions>, cache_ttl: Duration) -> Self {
        Self { cache, aggregator, subscriptions, cache_ttl }
    }

    /// Wire up HTTP fetching, the subscription file and a sweeping cache from settings.
    /// Must be called inside a Tokio runtime for the sweeper to run.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let fetcher = HttpFeedFetcher::new(&settings.fetcher)?;
        let cache = TtlCache::with_settings(settings.cache_ttl, settings.sweep_interval);
        Ok(Self::new(
            cache,
            Aggregator::new(Arc::new(fetcher)),
            Arc::new(SubscriptionFile::new(settings.subscriptions.clone())),
            settings.cache_ttl,
        ))
    }

    pub fn cache(&self) -> &TtlCache { &self.cache }

    /// Load subscriptions and aggregate, bypassing the cache.
    pub async fn fetch_fresh(&self) -> Result<AggregationResult, ServiceError> {
        let sources = self.subscriptions.load().await?;
        let result = self.aggregator.aggregate(&sources).await;
        if result.is_total_failure() {
            return Err(ServiceError::AllSourcesFailed { failed: result.partial_errors.len() });
        }
        Ok(result)
    }

    pub async fn get_feeds(&self) -> FeedsResponse {
        if let Some(hit) = self.cache.get_entry(CACHE_KEY) {
            info!(videos = hit.data.len(), "serving feeds from cache");
            return FeedsResponse {
                videos: hit.data.as_ref().clone(),
                cached: true,
                cache_timestamp: hit.created_at.timestamp_millis(),
                error: None,
            };
        }

        match self.fetch_fresh().await {
            Ok(result) => {
                self.write_through(&result);
                FeedsResponse { videos: result.videos, cached: false, cache_timestamp: now_millis(), error: None }
            }
            Err(e) => {
                warn!(error = %e, "feed fetch failed");
                let error = match e {
                    ServiceError::Config(c) => c.to_string(),
                    ServiceError::AllSourcesFailed { .. } => "Failed to fetch feeds".to_string(),
                };
                FeedsResponse { videos: Vec::new(), cached: false, cache_timestamp: now_millis(), error: Some(error) }
            }
        }
    }

    /// Always re-aggregates. On success the cache entry is overwritten;
    /// on failure the previous entry is kept.
    pub async fn refresh_feeds(&self) -> RefreshResponse {
        info!("refreshing feeds");
        match self.fetch_fresh().await {
            Ok(result) => {
                self.write_through(&result);
                RefreshResponse {
                    success: true,
                    message: Some("Feeds refreshed successfully".to_string()),
                    videos: Some(result.videos),
                    error: None,
                    timestamp: now_millis(),
                }
            }
            Err(e) => {
                warn!(error = %e, "feed refresh failed");
                RefreshResponse {
                    success: false,
                    message: None,
                    videos: None,
                    error: Some(format!("Failed to refresh feeds: {e}")),
                    timestamp: now_millis(),
                }
            }
        }
    }

    pub fn cache_info(&self) -> CacheInfoResponse {
        CacheInfoResponse { success: true, cache_info: self.cache.cache_info(), timestamp: now_millis() }
    }

    pub fn clear_cache(&self) -> ClearCacheResponse {
        self.cache.clear();
        info!("cache cleared");
        ClearCacheResponse { success: true, message: "Cache cleared successfully".to_string(), timestamp: now_millis() }
    }

    /// Stop background work owned by the service.
    pub fn shutdown(&self) { self.cache.shutdown(); }

    fn write_through(&self, result: &AggregationResult) {
        self.cache.set(CACHE_KEY, result.videos.clone(), Some(self.cache_ttl));
        info!(videos = result.videos.len(), failed = result.partial_errors.len(), "cache updated with fresh feeds");
    }
}

fn now_millis() -> i64 { Utc::now().timestamp_millis() }
