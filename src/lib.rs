//! Pxier Fetcher - public proxy list harvester
//!
//! Periodically pulls proxy listings from several heterogeneous providers,
//! normalizes them into [`ProxyRecord`]s and reconciles every batch into a
//! persistent store keyed on `(address, dial_type)`.

pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod scheduler;

pub use config::Config;
pub use database::{SqliteStore, Store};
pub use error::{ConfigError, FetchError, StoreError};
pub use proxy::*;
pub use scheduler::{reconcile, ReconcileStats, Scheduler};

/// Application result type
pub type Result<T> = anyhow::Result<T>;
