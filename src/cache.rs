//! In-memory TTL cache for aggregation results.
//!
//! `get` always re-validates, so the background sweep is housekeeping only.
//! The map lock is never held across an await point.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::types::VideoRecord;

pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Arc<Vec<VideoRecord>>,
    created_at: Instant,
    created_wall: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    fn is_valid_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) <= self.ttl
    }
}

/// A cache hit together with the wall-clock time it was stored.
#[derive(Debug, Clone)]
pub struct CachedFeed {
    pub data: Arc<Vec<VideoRecord>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub total_videos: usize,
    /// Milliseconds.
    #[serde(rename = "defaultTTL")]
    pub default_ttl: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    pub size: usize,
    pub keys: Vec<String>,
    pub stats: CacheStats,
}

type Entries = Mutex<HashMap<String, CacheEntry>>;

pub struct TtlCache {
    entries: Arc<Entries>,
    default_ttl: Duration,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl TtlCache {
    /// Cache with default TTL (15 min) and sweep period (5 min).
    pub fn new() -> Self { Self::with_settings(DEFAULT_TTL, DEFAULT_SWEEP_INTERVAL) }

    /// Starts the background sweeper when called inside a Tokio runtime.
    /// A zero `sweep_interval` disables it.
    pub fn with_settings(default_ttl: Duration, sweep_interval: Duration) -> Self {
        if sweep_interval.is_zero() {
            return Self::without_sweeper(default_ttl);
        }
        let entries: Arc<Entries> = Arc::new(Mutex::new(HashMap::new()));
        let sweeper = match tokio::runtime::Handle::try_current() {
            Ok(handle) => Some(handle.spawn(sweep_loop(Arc::downgrade(&entries), sweep_interval))),
            Err(_) => {
                warn!("no Tokio runtime; cache sweeper not started");
                None
            }
        };
        Self { entries, default_ttl, sweeper: Mutex::new(sweeper) }
    }

    /// Cache without a background sweeper.
    pub fn without_sweeper(default_ttl: Duration) -> Self {
        Self { entries: Arc::new(Mutex::new(HashMap::new())), default_ttl, sweeper: Mutex::new(None) }
    }

    pub fn default_ttl(&self) -> Duration { self.default_ttl }

    /// Store `data` under `key`, replacing any previous entry.
    /// A missing or zero `ttl` uses the default.
    pub fn set(&self, key: &str, data: Vec<VideoRecord>, ttl: Option<Duration>) {
        let entry = CacheEntry {
            data: Arc::new(data),
            created_at: Instant::now(),
            created_wall: Utc::now(),
            ttl: ttl.filter(|t| !t.is_zero()).unwrap_or(self.default_ttl),
        };
        self.lock().insert(key.to_string(), entry);
    }

    pub fn get(&self, key: &str) -> Option<Arc<Vec<VideoRecord>>> {
        self.get_entry(key).map(|hit| hit.data)
    }

    /// Like [`get`](Self::get) but also returns when the entry was stored.
    /// Expired entries are evicted during the lookup.
    pub fn get_entry(&self, key: &str) -> Option<CachedFeed> {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_valid_at(now) => {
                Some(CachedFeed { data: entry.data.clone(), created_at: entry.created_wall })
            }
            Some(_) => {
                entries.remove(key);
                debug!(key, "evicted expired cache entry");
                None
            }
            None => None,
        }
    }

    pub fn has(&self, key: &str) -> bool { self.get_entry(key).is_some() }

    pub fn remove(&self, key: &str) -> bool { self.lock().remove(key).is_some() }

    pub fn clear(&self) { self.lock().clear(); }

    /// Snapshot of the cache. Does not evict.
    pub fn cache_info(&self) -> CacheInfo {
        let now = Instant::now();
        let entries = self.lock();
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        let (mut valid, mut expired, mut videos) = (0, 0, 0);
        for entry in entries.values() {
            if entry.is_valid_at(now) {
                valid += 1;
                videos += entry.data.len();
            } else {
                expired += 1;
            }
        }
        CacheInfo {
            size: entries.len(),
            keys,
            stats: CacheStats {
                total_entries: entries.len(),
                valid_entries: valid,
                expired_entries: expired,
                total_videos: videos,
                default_ttl: self.default_ttl.as_millis() as u64,
            },
        }
    }

    /// Evict every expired entry now. Returns how many were removed.
    pub fn sweep(&self) -> usize { sweep_entries(&self.entries) }

    /// Stop the background sweeper. Idempotent.
    pub fn shutdown(&self) {
        let handle = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            handle.abort();
            debug!("cache sweeper stopped");
        }
    }

    pub fn sweeper_running(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TtlCache {
    fn default() -> Self { Self::new() }
}

impl Drop for TtlCache {
    fn drop(&mut self) { self.shutdown(); }
}

impl std::fmt::Debug for TtlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &self.lock().len())
            .field("default_ttl", &self.default_ttl)
            .field("sweeper_running", &self.sweeper_running())
            .finish()
    }
}

async fn sweep_loop(entries: Weak<Entries>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // First tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(map) = entries.upgrade() else { break };
        sweep_entries(&map);
    }
}

fn sweep_entries(entries: &Entries) -> usize {
    let now = Instant::now();
    let mut map = entries.lock().unwrap_or_else(PoisonError::into_inner);
    let before = map.len();
    map.retain(|_, e| e.is_valid_at(now));
    let removed = before - map.len();
    if removed > 0 {
        debug!(removed, "cleaned up expired cache entries");
    }
    removed
}
