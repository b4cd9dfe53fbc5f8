//! `hostwatch train` - offline model fit over the stored history

use crate::config::HostwatchConfig;
use crate::output;
use anyhow::Result;
use monitor_lib::{AnomalyModel, FeatureRow, MetricStore};

pub fn run(config: &HostwatchConfig, contamination: f64, seed: u64) -> Result<()> {
    let store = MetricStore::open(&config.store_path())?;
    store.init()?;
    let history = store.all()?;

    let rows: Vec<FeatureRow> = history
        .iter()
        .map(|s| s.sample.features())
        .filter(FeatureRow::is_finite)
        .collect();

    let skipped = history.len() - rows.len();
    if skipped > 0 {
        output::print_warning(&format!(
            "Skipping {skipped} sample(s) with non-finite feature values"
        ));
    }

    let model = AnomalyModel::fit(&rows, contamination, seed)?;
    model.save(&config.model_path())?;

    output::print_success(&format!(
        "Model fitted on {} samples (contamination {}) and saved to {}",
        rows.len(),
        contamination,
        config.model_path().display()
    ));

    Ok(())
}
