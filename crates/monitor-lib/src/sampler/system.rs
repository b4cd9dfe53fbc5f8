//! sysinfo-backed sampler
//!
//! CPU and memory utilization and the process table come from `sysinfo`;
//! active network connections are counted from `/proc/net/tcp` and
//! `/proc/net/tcp6` (ESTABLISHED and LISTEN states).

use super::{async_trait, Sampler};
use crate::error::CollectionError;
use crate::models::Sample;
use chrono::Utc;
use std::time::Duration;
use sysinfo::{ProcessesToUpdate, System, MINIMUM_CPU_UPDATE_INTERVAL};
use tracing::debug;

/// Default CPU averaging window (matches the 1s utilization window the
/// report statistics assume).
const DEFAULT_CPU_WINDOW: Duration = Duration::from_secs(1);

/// Samples live OS counters via `sysinfo` and procfs.
pub struct SystemSampler {
    cpu_window: Duration,
}

impl SystemSampler {
    pub fn new() -> Self {
        Self {
            cpu_window: DEFAULT_CPU_WINDOW,
        }
    }

    /// Override the CPU averaging window. Values below the minimum interval
    /// `sysinfo` needs between refreshes are clamped up.
    pub fn with_cpu_window(mut self, window: Duration) -> Self {
        self.cpu_window = window.max(MINIMUM_CPU_UPDATE_INTERVAL);
        self
    }

    /// CPU utilization averaged over the configured window.
    ///
    /// Requires two refreshes around a sleep; the sleep is the cancellation
    /// point that lets the daemon stop mid-sample.
    async fn cpu_percent(&self) -> Result<f64, CollectionError> {
        let mut sys = System::new();
        sys.refresh_cpu_usage();

        if sys.cpus().is_empty() {
            return Err(CollectionError::new("cpu", "no CPUs reported"));
        }

        tokio::time::sleep(self.cpu_window).await;
        sys.refresh_cpu_usage();

        Ok(f64::from(sys.global_cpu_usage()))
    }

    fn memory_percent(sys: &System) -> Result<f64, CollectionError> {
        let total = sys.total_memory();
        if total == 0 {
            return Err(CollectionError::new("memory", "total memory reported as zero"));
        }
        Ok(sys.used_memory() as f64 / total as f64 * 100.0)
    }

    fn process_count(sys: &System) -> Result<u64, CollectionError> {
        let count = sys.processes().len() as u64;
        if count == 0 {
            return Err(CollectionError::new("processes", "empty process table"));
        }
        Ok(count)
    }

    #[cfg(target_os = "linux")]
    fn connection_count() -> Result<u64, CollectionError> {
        let tcp = std::fs::read_to_string("/proc/net/tcp")
            .map_err(|e| CollectionError::new("network", e.to_string()))?;
        let mut count = count_active_states(&tcp);

        // tcp6 may be absent on ipv4-only kernels
        if let Ok(tcp6) = std::fs::read_to_string("/proc/net/tcp6") {
            count += count_active_states(&tcp6);
        }

        Ok(count)
    }

    #[cfg(not(target_os = "linux"))]
    fn connection_count() -> Result<u64, CollectionError> {
        Err(CollectionError::new(
            "network",
            "connection counting is only supported on linux",
        ))
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sampler for SystemSampler {
    async fn sample(&self) -> Result<Sample, CollectionError> {
        let cpu_percent = self.cpu_percent().await?;

        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_processes(ProcessesToUpdate::All, true);

        let memory_percent = Self::memory_percent(&sys)?;
        let process_count = Self::process_count(&sys)?;
        let active_network_connections = Self::connection_count()?;

        let sample = Sample {
            timestamp: Utc::now(),
            cpu_percent,
            memory_percent,
            process_count,
            active_network_connections,
        };

        debug!(
            cpu = sample.cpu_percent,
            memory = sample.memory_percent,
            processes = sample.process_count,
            connections = sample.active_network_connections,
            "Sampled host counters"
        );

        Ok(sample)
    }
}

/// Count sockets in ESTABLISHED (01) or LISTEN (0A) state in a
/// `/proc/net/tcp`-format table.
#[cfg(target_os = "linux")]
fn count_active_states(table: &str) -> u64 {
    table
        .lines()
        .skip(1) // header
        .filter_map(|line| line.split_whitespace().nth(3))
        .filter(|state| matches!(*state, "01" | "0A"))
        .count() as u64
}
