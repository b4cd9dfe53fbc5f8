//! Error taxonomy for the monitoring pipeline
//!
//! Each failure domain gets its own enum so callers handle the kinds they
//! can recover from: the collector daemon absorbs `CollectionError` and
//! `StorageError` per tick, while training and reporting propagate.

use std::path::PathBuf;
use thiserror::Error;

/// An OS counter could not be read.
///
/// Carries the name of the signal that failed; a sample is never returned
/// partially populated.
#[derive(Debug, Error)]
#[error("failed to read {signal} counters: {reason}")]
pub struct CollectionError {
    /// Which signal failed ("cpu", "memory", "processes", "network")
    pub signal: &'static str,
    pub reason: String,
}

impl CollectionError {
    pub fn new(signal: &'static str, reason: impl Into<String>) -> Self {
        Self {
            signal,
            reason: reason.into(),
        }
    }
}

/// A durable read or write against the sample store failed.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned by an earlier panic")]
    LockPoisoned,
}

/// A model fit was attempted on unusable data or parameters.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("cannot fit a model on an empty dataset")]
    EmptyDataset,

    #[error("contamination must be in (0, 1), got {0}")]
    InvalidContamination(f64),

    #[error("training row {row} contains a non-finite feature value")]
    NonFiniteFeature { row: usize },
}

/// Failures around the persisted model artifact and inference inputs.
///
/// `Unavailable` is a recognized absence rather than a hard fault; the
/// report path maps it to a "no model" section instead of failing.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no model artifact at {path}")]
    Unavailable { path: PathBuf },

    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("model artifact is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("unsupported model artifact version {0}")]
    UnsupportedVersion(u32),

    #[error("feature values must be finite")]
    NonFiniteFeature,
}
