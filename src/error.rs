use std::path::PathBuf;

use thiserror::Error;

/// A single source could not be retrieved or parsed.
#[derive(Debug, Error)]
#[error("{source_id}: {cause}")]
pub struct FetchError {
    pub source_id: String,
    pub cause: FetchCause,
}

impl FetchError {
    pub fn new(source_id: impl Into<String>, cause: impl Into<FetchCause>) -> Self {
        Self { source_id: source_id.into(), cause: cause.into() }
    }
}

#[derive(Debug, Error)]
pub enum FetchCause {
    #[error("invalid source identifier: {0}")]
    InvalidSource(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("feed parse error: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

/// The subscription list could not be produced.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Subscriptions file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read subscriptions file {}: {io}", .path.display())]
    Read { path: PathBuf, io: std::io::Error },

    #[error("Invalid subscriptions format in {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("No feeds configured in {}", .0.display())]
    Empty(PathBuf),

    #[error("No feeds configured")]
    NoSources,
}

/// Service-level failure reported to callers of the orchestration layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("all {failed} sources failed")]
    AllSourcesFailed { failed: usize },
}
