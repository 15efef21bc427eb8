mod cli;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use tubefeed::config::Settings;
use tubefeed::FeedService;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tubefeed=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::from_env();
    if let Some(path) = cli.subscriptions {
        settings.subscriptions = path;
    }
    info!(subscriptions = %settings.subscriptions.display(), ttl = ?settings.cache_ttl, "starting");

    let service = FeedService::from_settings(&settings)?;
    let outcome = run(&service, cli.command).await;
    service.shutdown();
    outcome
}

async fn run(service: &FeedService, command: Commands) -> Result<()> {
    match command {
        Commands::Feeds => print_json(&service.get_feeds().await),
        Commands::Refresh => print_json(&service.refresh_feeds().await),
        Commands::CacheInfo => print_json(&service.cache_info()),
        Commands::ClearCache => print_json(&service.clear_cache()),
        Commands::Watch { interval_secs, count } => {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            let mut round = 0u64;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = tokio::signal::ctrl_c() => {
                        info!("interrupted");
                        break;
                    }
                }
                let resp = service.get_feeds().await;
                info!(round, videos = resp.videos.len(), cached = resp.cached, error = ?resp.error, "polled feeds");
                round += 1;
                if count.is_some_and(|c| round >= c) {
                    print_json(&service.cache_info())?;
                    break;
                }
            }
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("serializing response")?;
    println!("{out}");
    Ok(())
}
