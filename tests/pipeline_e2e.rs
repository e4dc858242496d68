// tests/pipeline_e2e.rs
//
// Full runs against export files in a temp dir: load → reconcile → write artifact.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use health_reconciler::aggregate;
use health_reconciler::config::SourcePaths;
use health_reconciler::store;
use health_reconciler::{bootstrap_snapshot, run_once, Metric, ReconcileConfig, Source};

const APPLE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<HealthData locale="en_US">
 <Record type="HKQuantityTypeIdentifierStepCount" unit="count" value="8000" startDate="2024-03-01 12:00:00 +0100" endDate="2024-03-01 13:00:00 +0100"/>
 <Record type="HKQuantityTypeIdentifierStepCount" unit="count" value="6500" startDate="2024-03-03 12:00:00 +0100" endDate="2024-03-03 13:00:00 +0100"/>
 <Record type="HKQuantityTypeIdentifierRestingHeartRate" unit="count/min" value="57" startDate="2024-03-03 08:00:00 +0100" endDate="2024-03-03 08:00:00 +0100"/>
</HealthData>
"#;

const OURA_JSON: &str = r#"{
  "daily_activity": [
    { "day": "2024-03-01", "steps": 0 },
    { "day": "2024-03-02", "steps": 5000 }
  ],
  "sleep": [
    {
      "day": "2024-03-03",
      "type": "long_sleep",
      "bedtime_start": "2024-03-02T23:30:00+01:00",
      "total_sleep_duration": 27000,
      "average_hrv": 45,
      "lowest_heart_rate": 50
    }
  ]
}"#;

fn config_in(dir: &Path) -> ReconcileConfig {
    ReconcileConfig {
        sources: SourcePaths {
            apple: Some(dir.join("apple.xml")),
            oura: Some(dir.join("oura.json")),
            // never written: a missing export just contributes nothing
            strava: Some(dir.join("strava.json")),
        },
        output_path: dir.join("out").join("unified.json"),
        priority_table_path: dir.join("source_priority.toml"),
        ..ReconcileConfig::default()
    }
}

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[test]
fn run_writes_sorted_provenance_tagged_artifact() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("apple.xml"), APPLE_XML).unwrap();
    fs::write(dir.path().join("oura.json"), OURA_JSON).unwrap();
    let cfg = config_in(dir.path());

    let run = run_once(&cfg).unwrap();
    let records = &run.reconciliation.records;
    let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![d("2024-03-01"), d("2024-03-02"), d("2024-03-03")]);

    // apple primary for steps; oura's zero on the 1st is ignored anyway
    assert_eq!(records[0].steps.map(|s| (s.value(), s.source())), Some((8000.0, Source::Apple)));
    // only oura has the 2nd
    assert_eq!(records[1].steps.map(|s| s.source()), Some(Source::Oura));
    // oura night of the 2nd carries hrv; nothing else for that night
    assert_eq!(records[1].hrv.map(|s| s.value()), Some(45.0));
    // oura has no value for the 3rd, apple fills resting HR
    assert_eq!(records[2].resting_hr.map(|s| s.source()), Some(Source::Apple));

    let on_disk = store::read_unified(&cfg.output_path).unwrap();
    assert_eq!(&on_disk, records);

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&cfg.output_path).unwrap()).unwrap();
    assert!(raw["data"][0]["vo2_max"].is_null());
    assert_eq!(raw["data"][0]["steps"]["source"], "apple");

    let summary = aggregate::period_summary(&on_disk, Metric::Steps, d("2024-03-03"), 90);
    assert_eq!(summary.average, Some(6500.0));
    assert_eq!(summary.days_with_data, 3);
    assert_eq!(summary.source, Some(Source::Apple));
}

#[test]
fn rerun_on_same_inputs_is_identical() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("apple.xml"), APPLE_XML).unwrap();
    fs::write(dir.path().join("oura.json"), OURA_JSON).unwrap();
    let cfg = config_in(dir.path());

    run_once(&cfg).unwrap();
    let first = fs::read_to_string(&cfg.output_path).unwrap();
    run_once(&cfg).unwrap();
    let second = fs::read_to_string(&cfg.output_path).unwrap();
    assert_eq!(first, second);
}

#[test]
fn malformed_source_aborts_and_keeps_previous_artifact() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("apple.xml"), APPLE_XML).unwrap();
    fs::write(dir.path().join("oura.json"), OURA_JSON).unwrap();
    let cfg = config_in(dir.path());
    run_once(&cfg).unwrap();
    let before = fs::read_to_string(&cfg.output_path).unwrap();

    fs::write(dir.path().join("oura.json"), r#"{"daily_activity": [ {"day": "#).unwrap();
    let err = run_once(&cfg).unwrap_err();
    assert!(format!("{err:#}").contains("oura"));

    let after = fs::read_to_string(&cfg.output_path).unwrap();
    assert_eq!(before, after);
}

#[test]
fn priority_overrides_file_reorders_sources() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("apple.xml"), APPLE_XML).unwrap();
    fs::write(
        dir.path().join("oura.json"),
        r#"{"daily_activity": [ { "day": "2024-03-01", "steps": 7700 } ]}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("source_priority.toml"),
        r#"
[[priority]]
metric = "steps"
primary = "oura"
fallbacks = ["apple"]
rationale = "ring worn all day"
"#,
    )
    .unwrap();
    let cfg = config_in(dir.path());

    let run = run_once(&cfg).unwrap();
    let first = &run.reconciliation.records[0];
    assert_eq!(first.steps.map(|s| (s.value(), s.source())), Some((7700.0, Source::Oura)));
    assert_eq!(run.table.entry(Metric::Steps).map(|e| e.primary), Some(Source::Oura));
}

#[test]
fn no_exports_at_all_yields_empty_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_in(dir.path());
    let run = run_once(&cfg).unwrap();
    assert!(run.reconciliation.records.is_empty());
    assert!(store::read_unified(&cfg.output_path).unwrap().is_empty());
}

#[test]
fn bootstrap_from_previous_artifact_reports_configured_table() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("apple.xml"), APPLE_XML).unwrap();
    fs::write(dir.path().join("oura.json"), OURA_JSON).unwrap();
    fs::write(
        dir.path().join("source_priority.toml"),
        r#"
[[priority]]
metric = "steps"
primary = "oura"
fallbacks = ["apple"]
"#,
    )
    .unwrap();
    let cfg = config_in(dir.path());
    let previous = run_once(&cfg).unwrap();

    // the next boot cannot reconcile, so it serves what is on disk
    fs::write(dir.path().join("apple.xml"), "<HealthData><Record").unwrap();
    let snap = bootstrap_snapshot(&cfg);

    assert_eq!(snap.records, previous.reconciliation.records);
    assert!(snap.usage.is_none());
    assert_eq!(snap.table.entry(Metric::Steps).map(|e| e.primary), Some(Source::Oura));
}
