//! Core library for the hostwatch monitoring pipeline
//!
//! This crate provides the core functionality for:
//! - Sampling host-level OS counters
//! - Durable, append-only sample storage
//! - Periodic collection daemon
//! - Isolation-forest anomaly scoring
//! - Report generation over the full history

pub mod anomaly;
pub mod collector;
pub mod error;
pub mod models;
pub mod report;
pub mod sampler;
pub mod store;

pub use anomaly::{AnomalyModel, Label};
pub use collector::CollectorDaemon;
pub use error::{CollectionError, ModelError, StorageError, TrainingError};
pub use models::{FeatureRow, Sample, StoredSample};
pub use report::{generate, Report};
pub use sampler::{Sampler, SystemSampler};
pub use store::MetricStore;
