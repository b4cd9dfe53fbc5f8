//! Core data models for the monitoring pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped observation of host resource metrics.
///
/// Immutable once created; the store assigns its identity at persistence
/// time. Timestamps are kept at second precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub process_count: u64,
    pub active_network_connections: u64,
}

impl Sample {
    /// The fixed feature subset used for anomaly scoring.
    pub fn features(&self) -> FeatureRow {
        FeatureRow {
            cpu_percent: self.cpu_percent,
            memory_percent: self.memory_percent,
            active_network_connections: self.active_network_connections as f64,
        }
    }
}

/// A sample as persisted: the auto-assigned sequence id plus the sample.
///
/// Ids are strictly increasing in append order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSample {
    pub id: i64,
    pub sample: Sample,
}

/// The 3-dimensional feature space the anomaly model is trained over.
///
/// A typed row instead of a column-name lookup: a missing feature is
/// unrepresentable, only non-finite values remain to guard against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub active_network_connections: f64,
}

impl FeatureRow {
    pub const DIM: usize = 3;

    pub fn as_array(&self) -> [f64; Self::DIM] {
        [
            self.cpu_percent,
            self.memory_percent,
            self.active_network_connections,
        ]
    }

    /// True when every feature value is finite (no NaN or infinity).
    pub fn is_finite(&self) -> bool {
        self.as_array().iter().all(|v| v.is_finite())
    }
}
