//! End-to-end pipeline tests: store -> fit -> artifact -> report

use chrono::{TimeZone, Utc};
use monitor_lib::{generate, AnomalyModel, MetricStore, Sample};

fn sample(secs_offset: i64, cpu: f64, mem: f64, proc_count: u64, net: u64) -> Sample {
    Sample {
        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
            + chrono::Duration::seconds(secs_offset),
        cpu_percent: cpu,
        memory_percent: mem,
        process_count: proc_count,
        active_network_connections: net,
    }
}

#[test]
fn store_fit_and_report_flag_the_spike() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("data").join("monitoring.sqlite3");
    let model_path = dir.path().join("data").join("anomaly_model.json");

    let store = MetricStore::open(&store_path).unwrap();
    store.init().unwrap();
    store.append(&sample(0, 10.0, 20.0, 100, 5)).unwrap();
    store.append(&sample(60, 12.0, 22.0, 102, 6)).unwrap();
    store.append(&sample(120, 95.0, 90.0, 500, 300)).unwrap();

    // offline training path: history snapshot -> fit -> persisted artifact
    let history = store.all().unwrap();
    let rows: Vec<_> = history.iter().map(|s| s.sample.features()).collect();
    let model = AnomalyModel::fit(&rows, 0.33, 42).unwrap();
    model.save(&model_path).unwrap();

    // report path: fresh read connection, lazily loaded artifact
    let reader = MetricStore::open(&store_path).unwrap();
    let history = reader.all().unwrap();
    let loaded = AnomalyModel::load_if_present(&model_path)
        .unwrap()
        .expect("artifact was just saved");

    let report = generate(&history, Some(&loaded));
    let text = report.to_string();

    assert_eq!(report.total_samples, 3);
    assert!(text.contains("1 potential anomalies detected"));
    // the spike is the listed anomaly
    assert!(text.contains("CPU=95.0%"));
}

#[test]
fn report_without_model_states_absence_and_correct_stats() {
    let store = MetricStore::open_in_memory().unwrap();
    store.init().unwrap();
    store.append(&sample(0, 10.0, 20.0, 100, 5)).unwrap();
    store.append(&sample(60, 30.0, 40.0, 120, 9)).unwrap();

    let history = store.all().unwrap();
    let report = generate(&history, None);
    let text = report.to_string();

    assert!(text.contains("No anomaly model available"));
    let cpu = &report.summaries.as_ref().unwrap().cpu_percent;
    assert_eq!(cpu.min, 10.0);
    assert_eq!(cpu.max, 30.0);
    assert_eq!(cpu.mean, 20.0);
}

#[test]
fn fresh_store_reports_no_data() {
    let store = MetricStore::open_in_memory().unwrap();
    store.init().unwrap();

    let history = store.all().unwrap();
    assert!(history.is_empty());

    let report = generate(&history, None);
    assert!(report.to_string().contains("No metrics collected yet"));
}
