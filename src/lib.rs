pub mod aggregator;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod normalize;
pub mod service;
pub mod types;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::aggregator::Aggregator;
    pub use crate::api::{CacheInfoResponse, ClearCacheResponse, FeedsResponse, RefreshResponse};
    pub use crate::cache::{CacheInfo, CacheStats, TtlCache};
    pub use crate::config::{Settings, SubscriptionFile, Subscriptions};
    pub use crate::error::{ConfigError, FetchCause, FetchError, ServiceError};
    pub use crate::fetcher::{FeedFetcher, FetcherConfig, HttpFeedFetcher};
    pub use crate::service::{FeedService, CACHE_KEY};
    pub use crate::types::{AggregationResult, FeedSourceConfig, RawFeed, RawItem, SourceError, VideoRecord};
}

pub use service::FeedService;
