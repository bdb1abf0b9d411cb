//! Fetch scheduling and reconciliation into the store
//!
//! Every tick spawns one task per provider. A task fetches, then reconciles
//! its own batch as soon as it has it; there is no barrier between
//! providers and no wait for the previous tick, so a slow provider can
//! overlap its own next run. The per-request timeout is the only bound.

use crate::database::Store;
use crate::proxy::models::{now_epoch, ProxyRecord};
use crate::proxy::provider::Provider;
use std::ops::AddAssign;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Outcome of reconciling one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Already stored, `updated_at` refreshed
    pub touched: usize,
    /// First sighting
    pub inserted: usize,
    /// Store error; the record is simply missing from this cycle
    pub failed: usize,
}

impl AddAssign for ReconcileStats {
    fn add_assign(&mut self, rhs: Self) {
        self.touched += rhs.touched;
        self.inserted += rhs.inserted;
        self.failed += rhs.failed;
    }
}

/// Upsert every record on `(address, dial_type)`: touch, and insert when
/// nothing matched. A failing record does not stop the rest of the batch.
pub async fn reconcile(store: &dyn Store, batch: Vec<ProxyRecord>, now: i64) -> ReconcileStats {
    let mut stats = ReconcileStats::default();

    for mut record in batch {
        match store.touch(&record.address, record.dial_type, now).await {
            Ok(true) => stats.touched += 1,
            Ok(false) => {
                record.error_count = 0;
                record.created_at = now;
                record.updated_at = now;
                match store.insert(&record).await {
                    Ok(()) => stats.inserted += 1,
                    Err(e) => {
                        warn!(proxy = %record, error = %e, "failed to insert proxy");
                        stats.failed += 1;
                    }
                }
            }
            Err(e) => {
                warn!(proxy = %record, error = %e, "failed to update proxy");
                stats.failed += 1;
            }
        }
    }

    stats
}

pub struct Scheduler {
    providers: Vec<Arc<dyn Provider>>,
    store: Arc<dyn Store>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(store: Arc<dyn Store>, interval: Duration) -> Self {
        Self {
            providers: Vec::new(),
            store,
            interval,
        }
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        info!(provider = %provider.kind(), "registered provider");
        self.providers.push(provider);
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Launch one fetch+reconcile task per provider and return immediately
    pub fn tick(&self) -> Vec<JoinHandle<ReconcileStats>> {
        self.providers
            .iter()
            .map(|provider| {
                let provider = Arc::clone(provider);
                let store = Arc::clone(&self.store);
                tokio::spawn(async move {
                    let kind = provider.kind();
                    let batch = provider.fetch().await;
                    if batch.is_empty() {
                        debug!(provider = %kind, "nothing to reconcile");
                        return ReconcileStats::default();
                    }

                    let count = batch.len();
                    let stats = reconcile(store.as_ref(), batch, now_epoch()).await;
                    info!(
                        provider = %kind,
                        count,
                        touched = stats.touched,
                        inserted = stats.inserted,
                        failed = stats.failed,
                        "reconciled batch"
                    );
                    stats
                })
            })
            .collect()
    }

    /// A single tick, waiting for every provider to finish
    pub async fn run_once(&self) -> ReconcileStats {
        let mut total = ReconcileStats::default();
        for result in futures::future::join_all(self.tick()).await {
            match result {
                Ok(stats) => total += stats,
                Err(e) => warn!(error = %e, "provider task panicked"),
            }
        }
        total
    }

    /// Tick forever. The first tick fires immediately.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            info!(providers = self.providers.len(), "fetching");
            // Handles are dropped on purpose: tasks run detached.
            drop(self.tick());
        }
    }
}
