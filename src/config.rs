use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::cache::{DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL};
use crate::error::ConfigError;
use crate::fetcher::FetcherConfig;
use crate::types::FeedSourceConfig;

pub const DEFAULT_SUBSCRIPTIONS_FILE: &str = "subscriptions.yaml";

/// Supplies the source list at request time.
#[async_trait]
pub trait Subscriptions: Send + Sync {
    async fn load(&self) -> Result<FeedSourceConfig, ConfigError>;
}

/// A fixed in-memory list.
#[async_trait]
impl Subscriptions for FeedSourceConfig {
    async fn load(&self) -> Result<FeedSourceConfig, ConfigError> {
        let cleaned = clean(self.feeds.iter().map(String::as_str));
        if cleaned.is_empty() { return Err(ConfigError::NoSources); }
        Ok(cleaned)
    }
}

/// `feeds: [...]` read from a YAML file, or TOML when the extension is `.toml`.
/// Re-read on every load.
#[derive(Debug, Clone)]
pub struct SubscriptionFile {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct SubscriptionDoc {
    feeds: Option<Vec<String>>,
}

impl SubscriptionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
    pub fn path(&self) -> &Path { &self.path }

    fn parse(&self, text: &str) -> Result<SubscriptionDoc, String> {
        let is_toml = self.path.extension().and_then(|e| e.to_str()) == Some("toml");
        if is_toml {
            toml::from_str(text).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(text).map_err(|e| e.to_string())
        }
    }
}

#[async_trait]
impl Subscriptions for SubscriptionFile {
    async fn load(&self) -> Result<FeedSourceConfig, ConfigError> {
        let path = &self.path;
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(io) if io.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "subscriptions file not found");
                return Err(ConfigError::NotFound(path.clone()));
            }
            Err(io) => return Err(ConfigError::Read { path: path.clone(), io }),
        };
        let doc = self.parse(&text).map_err(|reason| {
            warn!(path = %path.display(), %reason, "invalid subscriptions file");
            ConfigError::Invalid { path: path.clone(), reason }
        })?;
        let Some(feeds) = doc.feeds else {
            return Err(ConfigError::Invalid { path: path.clone(), reason: "missing `feeds` list".to_string() });
        };
        let config = clean(feeds.iter().map(String::as_str));
        if config.is_empty() { return Err(ConfigError::Empty(path.clone())); }
        debug!(path = %path.display(), sources = config.len(), "loaded subscriptions");
        Ok(config)
    }
}

fn clean<'a>(feeds: impl Iterator<Item = &'a str>) -> FeedSourceConfig {
    FeedSourceConfig::new(feeds.map(str::trim).filter(|f| !f.is_empty()))
}

/// Runtime settings, read from `TUBEFEED_*` environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    pub subscriptions: PathBuf,
    pub cache_ttl: Duration,
    pub sweep_interval: Duration,
    pub fetcher: FetcherConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            subscriptions: PathBuf::from(DEFAULT_SUBSCRIPTIONS_FILE),
            cache_ttl: DEFAULT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            fetcher: FetcherConfig::default(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self { Self::from_lookup(|k| std::env::var(k).ok()) }

    /// Unparseable values fall back to defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| {
            get(key).and_then(|s| s.trim().parse::<u64>().ok()).map(Duration::from_secs).unwrap_or(default)
        };
        Self {
            subscriptions: get("TUBEFEED_SUBSCRIPTIONS").filter(|s| !s.trim().is_empty()).map(PathBuf::from).unwrap_or(defaults.subscriptions),
            cache_ttl: secs("TUBEFEED_CACHE_TTL_SECS", defaults.cache_ttl),
            sweep_interval: secs("TUBEFEED_SWEEP_SECS", defaults.sweep_interval),
            fetcher: FetcherConfig {
                timeout: secs("TUBEFEED_HTTP_TIMEOUT_SECS", defaults.fetcher.timeout),
                user_agent: get("TUBEFEED_USER_AGENT").unwrap_or(defaults.fetcher.user_agent),
            },
        }
    }
}
