//! `hostwatch collect` - foreground collection daemon

use crate::config::HostwatchConfig;
use crate::output;
use anyhow::Result;
use monitor_lib::{CollectorDaemon, MetricStore, SystemSampler};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub async fn run(config: &HostwatchConfig, interval: Option<u64>) -> Result<()> {
    let interval = Duration::from_secs(interval.unwrap_or(config.interval_secs));

    let store = MetricStore::open(&config.store_path())?;
    store.init()?;

    let daemon = CollectorDaemon::new(Arc::new(SystemSampler::new()), store);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    output::print_info(&format!(
        "Collecting metrics every {}s into {} (Ctrl-C to stop)",
        interval.as_secs(),
        config.store_path().display()
    ));

    daemon.run(interval, shutdown_rx).await;
    output::print_success("Collector stopped");

    Ok(())
}
