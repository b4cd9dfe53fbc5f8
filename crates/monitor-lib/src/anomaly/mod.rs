//! Isolation-forest anomaly model
//!
//! Unsupervised: an offline `fit` over a history snapshot learns a boundary
//! separating roughly a `contamination` fraction of the training rows from
//! the rest. Prediction is a deterministic tree traversal and needs no
//! training data, so the fitted model round-trips through its JSON
//! artifact.

mod forest;

use crate::error::{ModelError, TrainingError};
use crate::models::FeatureRow;
use chrono::{DateTime, Utc};
use forest::{average_path_length, IsolationTree};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Bumped whenever the artifact layout changes incompatibly.
const ARTIFACT_VERSION: u32 = 1;

const NUM_TREES: usize = 100;
const MAX_SUBSAMPLE: usize = 256;

/// Classification of one feature row against the fitted boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Inlier,
    Outlier,
}

/// A fitted isolation forest plus the parameters that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyModel {
    version: u32,
    trees: Vec<IsolationTree>,
    subsample_size: usize,
    score_threshold: f64,
    contamination: f64,
    seed: u64,
    trained_at: DateTime<Utc>,
}

impl AnomalyModel {
    /// Fit a model over the given feature rows.
    ///
    /// The score threshold is set so that `ceil(contamination * n)` of the
    /// training rows (the highest-scoring ones) fall on the outlier side.
    pub fn fit(
        rows: &[FeatureRow],
        contamination: f64,
        seed: u64,
    ) -> Result<Self, TrainingError> {
        if rows.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        if !(contamination > 0.0 && contamination < 1.0) {
            return Err(TrainingError::InvalidContamination(contamination));
        }
        if let Some(row) = rows.iter().position(|r| !r.is_finite()) {
            return Err(TrainingError::NonFiniteFeature { row });
        }

        let data: Vec<[f64; FeatureRow::DIM]> = rows.iter().map(FeatureRow::as_array).collect();
        let n = data.len();
        let subsample_size = n.min(MAX_SUBSAMPLE);
        let max_depth = (subsample_size as f64).log2().ceil().max(1.0) as usize;

        let mut rng = StdRng::seed_from_u64(seed);
        let trees: Vec<IsolationTree> = (0..NUM_TREES)
            .map(|_| {
                let indices: Vec<usize> = if n <= subsample_size {
                    (0..n).collect()
                } else {
                    rand::seq::index::sample(&mut rng, n, subsample_size).into_vec()
                };
                IsolationTree::fit(&data, &indices, max_depth, &mut rng)
            })
            .collect();

        let mut model = Self {
            version: ARTIFACT_VERSION,
            trees,
            subsample_size,
            score_threshold: 0.0,
            contamination,
            seed,
            trained_at: Utc::now(),
        };

        let mut scores: Vec<f64> = data.iter().map(|row| model.raw_score(row)).collect();
        scores.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        let k = ((contamination * n as f64).ceil() as usize).clamp(1, n);
        model.score_threshold = scores[k - 1];

        info!(
            rows = n,
            trees = NUM_TREES,
            contamination,
            seed,
            threshold = model.score_threshold,
            "Fitted anomaly model"
        );

        Ok(model)
    }

    /// Anomaly score in (0, 1]; higher means more isolated.
    ///
    /// Fails on non-finite input: the typed row rules out missing features,
    /// so NaN or infinity is the only malformed shape left, and it is
    /// rejected rather than scored best-effort.
    pub fn score(&self, row: &FeatureRow) -> Result<f64, ModelError> {
        if !row.is_finite() {
            return Err(ModelError::NonFiniteFeature);
        }
        Ok(self.raw_score(&row.as_array()))
    }

    /// Classify a row against the fitted boundary. Deterministic.
    pub fn predict(&self, row: &FeatureRow) -> Result<Label, ModelError> {
        let score = self.score(row)?;
        Ok(if score >= self.score_threshold {
            Label::Outlier
        } else {
            Label::Inlier
        })
    }

    fn raw_score(&self, row: &[f64; FeatureRow::DIM]) -> f64 {
        let mean_path = self
            .trees
            .iter()
            .map(|tree| tree.path_length(row))
            .sum::<f64>()
            / self.trees.len() as f64;

        let normalizer = average_path_length(self.subsample_size);
        if normalizer <= 0.0 {
            // degenerate single-row fit: everything is fully isolated
            return 1.0;
        }

        2f64.powf(-mean_path / normalizer)
    }

    /// The contamination rate this model was fitted with.
    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    /// The RNG seed this model was fitted with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Persist the artifact with atomic-replace semantics: write to a temp
    /// file, fsync, rename over the target. Concurrent retrains racing on
    /// the same path leave one complete artifact, never a mix.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec(self)?;
        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)?;

        debug!(path = %path.display(), bytes = json.len(), "Saved model artifact");
        Ok(())
    }

    /// Load a fitted model from its artifact.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::Unavailable {
                path: path.to_path_buf(),
            });
        }

        let json = fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&json)?;
        if model.version != ARTIFACT_VERSION {
            return Err(ModelError::UnsupportedVersion(model.version));
        }

        Ok(model)
    }

    /// Load the model if the artifact exists; absence is a recognized
    /// state for the report path, not a failure.
    pub fn load_if_present(path: &Path) -> Result<Option<Self>, ModelError> {
        match Self::load(path) {
            Ok(model) => Ok(Some(model)),
            Err(ModelError::Unavailable { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn row(cpu: f64, mem: f64, net: f64) -> FeatureRow {
        FeatureRow {
            cpu_percent: cpu,
            memory_percent: mem,
            active_network_connections: net,
        }
    }

    /// A quiet baseline plus one loud outlier.
    fn three_rows() -> Vec<FeatureRow> {
        vec![
            row(10.0, 20.0, 5.0),
            row(12.0, 22.0, 6.0),
            row(95.0, 90.0, 300.0),
        ]
    }

    #[test]
    fn test_fit_rejects_empty_dataset() {
        let err = AnomalyModel::fit(&[], 0.1, 42).unwrap_err();
        assert!(matches!(err, TrainingError::EmptyDataset));
    }

    #[test]
    fn test_fit_rejects_invalid_contamination() {
        let rows = three_rows();
        assert!(matches!(
            AnomalyModel::fit(&rows, 0.0, 42),
            Err(TrainingError::InvalidContamination(_))
        ));
        assert!(matches!(
            AnomalyModel::fit(&rows, 1.0, 42),
            Err(TrainingError::InvalidContamination(_))
        ));
        assert!(matches!(
            AnomalyModel::fit(&rows, -0.5, 42),
            Err(TrainingError::InvalidContamination(_))
        ));
    }

    #[test]
    fn test_fit_rejects_non_finite_rows() {
        let mut rows = three_rows();
        rows.push(row(f64::NAN, 10.0, 1.0));

        let err = AnomalyModel::fit(&rows, 0.1, 42).unwrap_err();
        assert!(matches!(err, TrainingError::NonFiniteFeature { row: 3 }));
    }

    #[test]
    fn test_three_sample_scenario_flags_the_outlier() {
        let rows = three_rows();
        let model = AnomalyModel::fit(&rows, 0.33, 42).unwrap();

        assert_eq!(model.predict(&rows[0]).unwrap(), Label::Inlier);
        assert_eq!(model.predict(&rows[1]).unwrap(), Label::Inlier);
        assert_eq!(model.predict(&rows[2]).unwrap(), Label::Outlier);
    }

    #[test]
    fn test_training_set_outlier_fraction_tracks_contamination() {
        let mut rng = StdRng::seed_from_u64(9);
        let rows: Vec<FeatureRow> = (0..100)
            .map(|_| {
                row(
                    20.0 + rng.random::<f64>() * 10.0,
                    40.0 + rng.random::<f64>() * 10.0,
                    10.0 + rng.random::<f64>() * 5.0,
                )
            })
            .collect();

        let model = AnomalyModel::fit(&rows, 0.1, 42).unwrap();
        let flagged = rows
            .iter()
            .filter(|r| model.predict(r).unwrap() == Label::Outlier)
            .count();

        // ceil(0.1 * 100) = 10, tolerance for score ties
        assert!((8..=12).contains(&flagged), "flagged {flagged} of 100");
    }

    #[test]
    fn test_predict_is_deterministic() {
        let rows = three_rows();
        let model = AnomalyModel::fit(&rows, 0.33, 42).unwrap();

        let probe = row(50.0, 50.0, 50.0);
        let first = model.predict(&probe).unwrap();
        for _ in 0..10 {
            assert_eq!(model.predict(&probe).unwrap(), first);
        }
    }

    #[test]
    fn test_same_seed_fits_identical_models() {
        let rows = three_rows();
        let a = AnomalyModel::fit(&rows, 0.33, 7).unwrap();
        let b = AnomalyModel::fit(&rows, 0.33, 7).unwrap();

        for probe in &[row(1.0, 2.0, 3.0), row(60.0, 70.0, 80.0)] {
            assert_eq!(a.score(probe).unwrap(), b.score(probe).unwrap());
        }
    }

    #[test]
    fn test_predict_rejects_non_finite_input() {
        let model = AnomalyModel::fit(&three_rows(), 0.33, 42).unwrap();
        let err = model.predict(&row(f64::INFINITY, 1.0, 1.0)).unwrap_err();
        assert!(matches!(err, ModelError::NonFiniteFeature));
    }

    #[test]
    fn test_save_load_round_trip_predicts_identically() {
        let rows = three_rows();
        let model = AnomalyModel::fit(&rows, 0.33, 42).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        model.save(&path).unwrap();
        let loaded = AnomalyModel::load(&path).unwrap();

        // held-out probes, not just the training rows
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..25 {
            let probe = row(
                rng.random::<f64>() * 100.0,
                rng.random::<f64>() * 100.0,
                rng.random::<f64>() * 400.0,
            );
            assert_eq!(
                model.predict(&probe).unwrap(),
                loaded.predict(&probe).unwrap()
            );
            assert_eq!(model.score(&probe).unwrap(), loaded.score(&probe).unwrap());
        }

        assert_eq!(loaded.contamination(), 0.33);
        assert_eq!(loaded.seed(), 42);
    }

    #[test]
    fn test_save_overwrites_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        AnomalyModel::fit(&three_rows(), 0.33, 1)
            .unwrap()
            .save(&path)
            .unwrap();
        AnomalyModel::fit(&three_rows(), 0.33, 2)
            .unwrap()
            .save(&path)
            .unwrap();

        let loaded = AnomalyModel::load(&path).unwrap();
        assert_eq!(loaded.seed(), 2);
    }

    #[test]
    fn test_load_missing_artifact_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        assert!(matches!(
            AnomalyModel::load(&path),
            Err(ModelError::Unavailable { .. })
        ));
        assert!(AnomalyModel::load_if_present(&path).unwrap().is_none());
    }

    #[test]
    fn test_load_corrupt_artifact_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            AnomalyModel::load(&path),
            Err(ModelError::Corrupt(_))
        ));
    }
}
