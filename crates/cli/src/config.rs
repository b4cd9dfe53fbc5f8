//! CLI configuration
//!
//! Loaded from `HOSTWATCH_`-prefixed environment variables with serde
//! defaults. The persisted state (sample store and model artifact) lives
//! at fixed names under the data directory.

use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

const STORE_FILE: &str = "monitoring.sqlite3";
const MODEL_FILE: &str = "anomaly_model.json";

/// Hostwatch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HostwatchConfig {
    /// Directory holding the sample store and the model artifact
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Default collection interval in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_interval_secs() -> u64 {
    60
}

impl HostwatchConfig {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        // try_parsing so numeric env values deserialize into u64 instead
        // of failing the whole config over to defaults
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("HOSTWATCH").try_parsing(true))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| HostwatchConfig {
            data_dir: default_data_dir(),
            interval_secs: default_interval_secs(),
        }))
    }

    /// Path of the durable sample store.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE)
    }

    /// Path of the most recent fitted model artifact.
    pub fn model_path(&self) -> PathBuf {
        self.data_dir.join(MODEL_FILE)
    }
}
