//! Report generation over the full metric history
//!
//! `generate` is a pure function of the history and an optional fitted
//! model. Empty history is a normal outcome rendered as "no data", never
//! an error.

use crate::anomaly::{AnomalyModel, Label};
use crate::models::StoredSample;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// How many anomalous samples the report lists individually.
const LISTED_ANOMALIES: usize = 5;

/// Mean/min/max over one metric across the full history.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricSummary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricSummary {
    fn over<F>(history: &[StoredSample], metric: F) -> Self
    where
        F: Fn(&StoredSample) -> f64,
    {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for stored in history {
            let v = metric(stored);
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        Self {
            mean: sum / history.len() as f64,
            min,
            max,
        }
    }
}

/// Summary statistics for the four collected metrics.
#[derive(Debug, Clone, Serialize)]
pub struct Summaries {
    pub cpu_percent: MetricSummary,
    pub memory_percent: MetricSummary,
    pub process_count: MetricSummary,
    pub active_network_connections: MetricSummary,
}

/// One sample the model classified as an outlier.
#[derive(Debug, Clone, Serialize)]
pub struct AnomalousSample {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub active_network_connections: u64,
}

/// Outcome of the anomaly pass.
#[derive(Debug, Clone, Serialize)]
pub enum AnomalySection {
    /// No fitted model artifact was available.
    ModelUnavailable,
    /// The history was scored against a fitted model.
    Scored {
        /// Total samples classified as outliers
        flagged_count: usize,
        /// The earliest flagged samples by timestamp, at most
        /// `LISTED_ANOMALIES`
        earliest: Vec<AnomalousSample>,
        /// Samples excluded from scoring for non-finite feature values
        excluded_count: usize,
    },
}

/// Derived summary over the full metric history.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub total_samples: usize,
    /// First and last timestamp observed; `None` when the history is empty
    pub time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub summaries: Option<Summaries>,
    pub anomalies: AnomalySection,
}

/// Build a report from an ordered history and an optional fitted model.
pub fn generate(history: &[StoredSample], model: Option<&AnomalyModel>) -> Report {
    let anomalies = match model {
        None => AnomalySection::ModelUnavailable,
        Some(model) => score_history(history, model),
    };

    if history.is_empty() {
        return Report {
            total_samples: 0,
            time_range: None,
            summaries: None,
            anomalies,
        };
    }

    let timestamps = history.iter().map(|s| s.sample.timestamp);
    let time_range = Some((
        timestamps.clone().min().unwrap_or_default(),
        timestamps.max().unwrap_or_default(),
    ));

    let summaries = Summaries {
        cpu_percent: MetricSummary::over(history, |s| s.sample.cpu_percent),
        memory_percent: MetricSummary::over(history, |s| s.sample.memory_percent),
        process_count: MetricSummary::over(history, |s| s.sample.process_count as f64),
        active_network_connections: MetricSummary::over(history, |s| {
            s.sample.active_network_connections as f64
        }),
    };

    Report {
        total_samples: history.len(),
        time_range,
        summaries: Some(summaries),
        anomalies,
    }
}

fn score_history(history: &[StoredSample], model: &AnomalyModel) -> AnomalySection {
    let mut flagged = Vec::new();
    let mut excluded_count = 0usize;

    for stored in history {
        let row = stored.sample.features();
        if !row.is_finite() {
            excluded_count += 1;
            continue;
        }
        match model.predict(&row) {
            Ok(Label::Outlier) => flagged.push(AnomalousSample {
                id: stored.id,
                timestamp: stored.sample.timestamp,
                cpu_percent: stored.sample.cpu_percent,
                memory_percent: stored.sample.memory_percent,
                active_network_connections: stored.sample.active_network_connections,
            }),
            Ok(Label::Inlier) => {}
            // finiteness is pre-checked, but a rejected row is still an
            // exclusion rather than a report failure
            Err(_) => excluded_count += 1,
        }
    }

    let flagged_count = flagged.len();
    flagged.sort_by_key(|a| a.timestamp);
    flagged.truncate(LISTED_ANOMALIES);

    AnomalySection::Scored {
        flagged_count,
        earliest: flagged,
        excluded_count,
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Host Metrics Report ---")?;

        if self.total_samples == 0 {
            writeln!(f, "No metrics collected yet.")?;
            writeln!(f, "---------------------------")?;
            return Ok(());
        }

        writeln!(f, "Total samples: {}", self.total_samples)?;
        if let Some((first, last)) = &self.time_range {
            writeln!(
                f,
                "Time range: {} to {}",
                first.format("%Y-%m-%d %H:%M:%S"),
                last.format("%Y-%m-%d %H:%M:%S")
            )?;
        }

        if let Some(s) = &self.summaries {
            write_section(f, "CPU Usage", &s.cpu_percent, "%", 2)?;
            write_section(f, "Memory Usage", &s.memory_percent, "%", 2)?;
            write_section(f, "Process Count", &s.process_count, "", 0)?;
            write_section(
                f,
                "Active Network Connections",
                &s.active_network_connections,
                "",
                0,
            )?;
        }

        writeln!(f, "\n--- Anomaly Detection ---")?;
        match &self.anomalies {
            AnomalySection::ModelUnavailable => {
                writeln!(f, "  No anomaly model available. Run 'train' first.")?;
            }
            AnomalySection::Scored {
                flagged_count,
                earliest,
                excluded_count,
            } => {
                if *excluded_count > 0 {
                    writeln!(
                        f,
                        "  {} sample(s) excluded from scoring (non-finite feature values).",
                        excluded_count
                    )?;
                }
                if *flagged_count == 0 {
                    writeln!(f, "  No significant anomalies detected in this period.")?;
                } else {
                    writeln!(f, "  {} potential anomalies detected.", flagged_count)?;
                    writeln!(f, "  Earliest anomalies:")?;
                    for a in earliest {
                        writeln!(
                            f,
                            "    - {}: CPU={:.1}%, Mem={:.1}%, Net={}",
                            a.timestamp.format("%Y-%m-%d %H:%M:%S"),
                            a.cpu_percent,
                            a.memory_percent,
                            a.active_network_connections
                        )?;
                    }
                    if *flagged_count > earliest.len() {
                        writeln!(f, "    (and more...)")?;
                    }
                }
            }
        }

        writeln!(f, "---------------------------")?;
        Ok(())
    }
}

fn write_section(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    summary: &MetricSummary,
    unit: &str,
    decimals: usize,
) -> fmt::Result {
    writeln!(f, "\n--- {} ---", title)?;
    writeln!(f, "Average: {:.*}{}", decimals, summary.mean, unit)?;
    writeln!(f, "Max: {:.*}{}", decimals, summary.max, unit)?;
    writeln!(f, "Min: {:.*}{}", decimals, summary.min, unit)?;
    Ok(())
}
