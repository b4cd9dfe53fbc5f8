//! `hostwatch report` - one-shot report over the full history

use crate::config::HostwatchConfig;
use anyhow::Result;
use monitor_lib::{generate, AnomalyModel, MetricStore};

pub fn run(config: &HostwatchConfig) -> Result<()> {
    let store = MetricStore::open(&config.store_path())?;
    store.init()?;
    let history = store.all()?;

    // a missing artifact is a normal state the report spells out itself
    let model = AnomalyModel::load_if_present(&config.model_path())?;

    let report = generate(&history, model.as_ref());
    println!("{report}");

    Ok(())
}
