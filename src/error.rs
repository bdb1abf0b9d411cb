//! Error types shared across the fetch, store and configuration layers

use reqwest::StatusCode;
use thiserror::Error;

/// Startup errors. Any of these aborts the process before the scheduler runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("database url is empty")]
    MissingDatabaseUrl,
    #[error("no provider selected")]
    NoProviders,
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("invalid upstream proxy {proxy}: {source}")]
    InvalidProxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Failure of a single provider HTTP step. Never leaves the provider:
/// callers log it and degrade to an empty batch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: StatusCode },
    #[error("failed to decode {encoding} body: {source}")]
    Decode {
        encoding: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("no session cookie returned by {url}")]
    MissingCookie { url: String },
    #[error("no request key found in response from {url}")]
    MissingKey { url: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}
