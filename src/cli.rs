use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Aggregate and cache YouTube channel feeds
#[derive(Parser)]
#[command(name = "tubefeed")]
#[command(about = "Fetch, merge and cache YouTube channel feeds", long_about = None)]
pub struct Cli {
    /// Subscriptions file (YAML, or TOML by extension). Overrides TUBEFEED_SUBSCRIPTIONS.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub subscriptions: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the merged feed (cache-first)
    Feeds,
    /// Re-fetch every source and overwrite the cache
    Refresh,
    /// Print cache statistics
    CacheInfo,
    /// Drop all cached entries
    ClearCache,
    /// Poll the feed repeatedly against one in-process cache
    Watch {
        /// Seconds between polls
        #[arg(long, default_value_t = 60)]
        interval_secs: u64,
        /// Stop after this many polls (runs until Ctrl-C when omitted)
        #[arg(long)]
        count: Option<u64>,
    },
}
