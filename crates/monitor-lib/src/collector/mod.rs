//! Periodic collection daemon
//!
//! Drives a [`Sampler`] on a fixed cadence and appends each sample to the
//! [`MetricStore`]. Failure isolation per tick is the core reliability
//! property: a failed OS read or a disk hiccup degrades to one missing
//! data point, never a crash, and never touches already-persisted data.

use crate::error::{CollectionError, StorageError};
use crate::models::StoredSample;
use crate::sampler::Sampler;
use crate::store::MetricStore;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// How many ticks between cadence log lines.
const STATS_LOG_EVERY: u64 = 10;

/// A single tick failed at one of its two steps.
#[derive(Debug, Error)]
pub enum TickError {
    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Long-running collector: sample, persist, sleep, repeat.
pub struct CollectorDaemon {
    sampler: Arc<dyn Sampler>,
    store: MetricStore,
    ticks: u64,
    failed_ticks: u64,
}

impl CollectorDaemon {
    pub fn new(sampler: Arc<dyn Sampler>, store: MetricStore) -> Self {
        Self {
            sampler,
            store,
            ticks: 0,
            failed_ticks: 0,
        }
    }

    /// Run until the shutdown channel fires.
    ///
    /// The sleep is uncompensated wall-clock time, so the actual period is
    /// at least `interval` plus the sampling window. Both the in-flight
    /// sample and the sleep are cancellation points, so shutdown is prompt
    /// rather than tick-aligned.
    pub async fn run(mut self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = interval.as_secs(),
            "Starting collection daemon"
        );

        loop {
            let result = tokio::select! {
                result = self.tick() => result,
                _ = shutdown.recv() => break,
            };
            self.log_tick(result);

            tokio::select! {
                _ = sleep(interval) => {}
                _ = shutdown.recv() => break,
            }
        }

        info!(
            ticks = self.ticks,
            failed = self.failed_ticks,
            "Collection daemon stopped"
        );
    }

    /// One tick: sample, then persist. Either failure aborts only this
    /// tick.
    async fn tick(&self) -> Result<StoredSample, TickError> {
        let sample = self.sampler.sample().await?;
        let stored = self.store.append(&sample)?;
        Ok(stored)
    }

    fn log_tick(&mut self, result: Result<StoredSample, TickError>) {
        self.ticks += 1;

        match result {
            Ok(stored) => {
                debug!(
                    id = stored.id,
                    cpu = stored.sample.cpu_percent,
                    memory = stored.sample.memory_percent,
                    "Collected and persisted sample"
                );
            }
            Err(e) => {
                self.failed_ticks += 1;
                warn!(error = %e, "Tick failed, continuing on next interval");
            }
        }

        if self.ticks % STATS_LOG_EVERY == 0 {
            debug!(
                ticks = self.ticks,
                failed = self.failed_ticks,
                "Collection cadence stats"
            );
        }
    }
}
