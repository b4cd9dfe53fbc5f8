//! Hostwatch CLI
//!
//! A command-line front end for the monitoring pipeline: run the collector
//! daemon in the foreground, print a report over the collected history, or
//! fit and persist the anomaly model.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Hostwatch - host metrics monitor
#[derive(Parser)]
#[command(name = "hostwatch")]
#[command(author, version, about = "Host resource monitor", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the collection daemon in the foreground until Ctrl-C
    Collect {
        /// Seconds between samples
        #[arg(long, env = "HOSTWATCH_INTERVAL_SECS")]
        interval: Option<u64>,
    },

    /// Print a report over the collected history
    Report,

    /// Fit the anomaly model over the full history and persist it
    Train {
        /// Expected fraction of outliers in the training data, in (0, 1)
        #[arg(long, default_value_t = 0.01)]
        contamination: f64,

        /// RNG seed for the fit
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = config::HostwatchConfig::load()?;

    match cli.command {
        Commands::Collect { interval } => commands::collect::run(&config, interval).await?,
        Commands::Report => commands::report::run(&config)?,
        Commands::Train {
            contamination,
            seed,
        } => commands::train::run(&config, contamination, seed)?,
    }

    Ok(())
}
