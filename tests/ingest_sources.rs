// tests/ingest_sources.rs
//
// Normalizers fed with small inline exports, the way each provider writes them.

use chrono::NaiveDate;
use health_reconciler::ingest::providers::{AppleHealthNormalizer, OuraNormalizer, StravaNormalizer};
use health_reconciler::ingest::types::{NormalizeOptions, SourceNormalizer};
use health_reconciler::record::ProviderDay;
use health_reconciler::Metric;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
}

fn hr_records(day: &str) -> String {
    (0..10)
        .map(|i| {
            format!(
                r#"<Record type="HKQuantityTypeIdentifierHeartRate" unit="count/min" value="{}" startDate="{day} {:02}:00:00 +0100" endDate="{day} {:02}:00:00 +0100"/>"#,
                60 + 2 * i,
                8 + i,
                8 + i
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn apple_export() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<HealthData locale="en_US">
 <ExportDate value="2024-03-05 10:00:00 +0100"/>
 <Record type="HKQuantityTypeIdentifierStepCount" sourceName="Watch" unit="count" value="3000" startDate="2024-03-01 09:00:00 +0100" endDate="2024-03-01 10:00:00 +0100"/>
 <Record type="HKQuantityTypeIdentifierStepCount" sourceName="Watch" unit="count" value="5000" startDate="2024-03-01 17:00:00 +0100" endDate="2024-03-01 18:00:00 +0100"/>
 <Record type="HKQuantityTypeIdentifierStepCount" sourceName="Watch" unit="count" value="n/a" startDate="2024-03-01 19:00:00 +0100" endDate="2024-03-01 19:30:00 +0100"/>
 <Record type="HKQuantityTypeIdentifierDistanceWalkingRunning" unit="m" value="1500" startDate="2024-03-01 09:00:00 +0100" endDate="2024-03-01 10:00:00 +0100"/>
 <Record type="HKQuantityTypeIdentifierOxygenSaturation" unit="%" value="0.97" startDate="2024-03-01 03:00:00 +0100" endDate="2024-03-01 03:00:00 +0100"/>
 {hr}
 <Record type="HKCategoryTypeIdentifierSleepAnalysis" value="HKCategoryValueSleepAnalysisInBed" startDate="2024-03-02 01:20:00 +0100" endDate="2024-03-02 07:10:00 +0100"/>
 <Record type="HKCategoryTypeIdentifierSleepAnalysis" value="HKCategoryValueSleepAnalysisAsleepCore" startDate="2024-03-02 01:30:00 +0100" endDate="2024-03-02 07:00:00 +0100"/>
 <Workout workoutActivityType="HKWorkoutActivityTypeRunning" duration="30"/>
</HealthData>
"#,
        hr = hr_records("2024-03-01")
    )
}

#[test]
fn apple_export_folds_into_daily_values() {
    let out = AppleHealthNormalizer::default()
        .normalize(&apple_export())
        .expect("valid export");

    let day = out.get(&d("2024-03-01")).expect("day present");
    assert_eq!(day.reading(Metric::Steps), Some(8000.0));
    assert_eq!(day.reading(Metric::DistanceKm), Some(1.5));
    assert_eq!(day.reading(Metric::Spo2), Some(97.0));
    assert_eq!(day.reading(Metric::AvgHr), Some(69.0));
    // no RestingHeartRate record, so the lowest tenth of ten samples is used
    assert_eq!(day.reading(Metric::RestingHr), Some(60.0));
}

#[test]
fn apple_sleep_after_midnight_belongs_to_previous_night() {
    let out = AppleHealthNormalizer::default()
        .normalize(&apple_export())
        .expect("valid export");

    let night = out.get(&d("2024-03-01")).expect("night present");
    assert_eq!(night.reading(Metric::SleepMinutes), Some(330.0));
    assert_eq!(night.reading(Metric::LightSleepMinutes), Some(330.0));
    assert_eq!(night.reading(Metric::SleepEfficiency), Some(94.3));

    let next = out.get(&d("2024-03-02"));
    assert!(next.map_or(true, |p| p.reading(Metric::SleepMinutes).is_none()));
}

#[test]
fn apple_cutoff_hour_is_configurable() {
    let opts = NormalizeOptions {
        sleep_cutoff_hour: 1,
        ..NormalizeOptions::default()
    };
    let out = AppleHealthNormalizer::new(opts)
        .normalize(&apple_export())
        .expect("valid export");
    let night = out.get(&d("2024-03-02")).expect("night moved to start date");
    assert_eq!(night.reading(Metric::SleepMinutes), Some(330.0));
}

#[test]
fn apple_sleep_across_dst_change_uses_elapsed_time() {
    // clocks go forward at 02:00 local: 23:00 +0100 to 07:00 +0200 is seven hours
    let xml = r#"<HealthData>
 <Record type="HKCategoryTypeIdentifierSleepAnalysis" value="HKCategoryValueSleepAnalysisAsleepCore" startDate="2024-03-30 23:00:00 +0100" endDate="2024-03-31 07:00:00 +0200"/>
</HealthData>"#;
    let out = AppleHealthNormalizer::default().normalize(xml).expect("valid export");
    let night = out.get(&d("2024-03-30")).expect("night present");
    assert_eq!(night.reading(Metric::SleepMinutes), Some(420.0));
    assert!(out.get(&d("2024-03-31")).is_none());
}

#[test]
fn apple_malformed_xml_is_fatal() {
    let broken = r#"<HealthData><Record type="HKQuantityTypeIdentifierStepCount" value="1"></HealthDate>"#;
    assert!(AppleHealthNormalizer::default().normalize(broken).is_err());
}

#[test]
fn apple_document_without_root_is_fatal() {
    let err = AppleHealthNormalizer::default()
        .normalize(r#"<Export><Record type="x"/></Export>"#)
        .unwrap_err();
    assert!(err.to_string().contains("HealthData"));
}

#[test]
fn apple_record_with_bad_timestamp_is_fatal() {
    let xml = r#"<HealthData><Record type="HKQuantityTypeIdentifierStepCount" unit="count" value="10" startDate="yesterday" endDate="today"/></HealthData>"#;
    assert!(AppleHealthNormalizer::default().normalize(xml).is_err());
}

const OURA_EXPORT: &str = r#"{
  "sleep": [
    {
      "day": "2024-03-02",
      "type": "long_sleep",
      "bedtime_start": "2024-03-01T23:10:00+01:00",
      "total_sleep_duration": 25200,
      "deep_sleep_duration": 5400,
      "rem_sleep_duration": 6000,
      "light_sleep_duration": 13800,
      "awake_time": 1800,
      "efficiency": 93,
      "average_heart_rate": 54.5,
      "lowest_heart_rate": 48,
      "average_hrv": 45,
      "average_breath": 14.2
    },
    {
      "day": "2024-03-02",
      "type": "rest",
      "bedtime_start": "2024-03-02T15:00:00+01:00",
      "total_sleep_duration": 1200
    }
  ],
  "daily_sleep": [ { "day": "2024-03-02", "score": 84 } ],
  "daily_activity": [
    {
      "day": "2024-03-01",
      "steps": 7421,
      "active_calories": 512,
      "equivalent_walking_distance": 6400,
      "high_activity_time": 600,
      "medium_activity_time": 1800
    },
    { "day": "2024-03-02", "steps": 0 }
  ],
  "daily_readiness": [ { "day": "2024-03-02", "score": 79, "temperature_deviation": -0.21 } ],
  "daily_spo2": [ { "day": "2024-03-02", "spo2_percentage": { "average": 96.8 }, "breathing_disturbance_index": 3 } ]
}"#;

#[test]
fn oura_night_metrics_land_on_the_night_date() {
    let out = OuraNormalizer::default().normalize(OURA_EXPORT).expect("valid export");
    let night = out.get(&d("2024-03-01")).expect("night present");
    assert_eq!(night.reading(Metric::SleepMinutes), Some(420.0));
    assert_eq!(night.reading(Metric::DeepSleepMinutes), Some(90.0));
    assert_eq!(night.reading(Metric::RestingHr), Some(48.0));
    assert_eq!(night.reading(Metric::Hrv), Some(45.0));
    // daily_sleep is keyed by wake-up day and follows its session
    assert_eq!(night.reading(Metric::SleepScore), Some(84.0));
}

#[test]
fn oura_day_lists_convert_units() {
    let out = OuraNormalizer::default().normalize(OURA_EXPORT).expect("valid export");
    let day = out.get(&d("2024-03-01")).expect("activity day present");
    assert_eq!(day.reading(Metric::Steps), Some(7421.0));
    assert_eq!(day.reading(Metric::DistanceKm), Some(6.4));
    assert_eq!(day.reading(Metric::ExerciseMinutes), Some(40.0));

    let next = out.get(&d("2024-03-02")).expect("readiness day present");
    assert_eq!(next.reading(Metric::ReadinessScore), Some(79.0));
    assert_eq!(next.reading(Metric::TemperatureDeviation), Some(-0.2));
    assert_eq!(next.reading(Metric::Spo2), Some(96.8));
    // zero steps is not a reading
    assert_eq!(next.reading(Metric::Steps), None);
}

#[test]
fn oura_sleep_score_without_session_goes_to_previous_night() {
    let out = OuraNormalizer::default()
        .normalize(r#"{"daily_sleep":[{"day":"2024-03-02","score":84}],"sleep":[]}"#)
        .expect("valid export");
    let night = out.get(&d("2024-03-01")).expect("score on the night before wake-up");
    assert_eq!(night.reading(Metric::SleepScore), Some(84.0));
    assert!(out.get(&d("2024-03-02")).is_none());
}

#[test]
fn oura_malformed_json_is_fatal() {
    assert!(OuraNormalizer::default().normalize("{ \"sleep\": [").is_err());
    assert!(OuraNormalizer::default()
        .normalize(r#"{"daily_activity":[{"day":"03/01/2024","steps":10}]}"#)
        .is_err());
}

#[test]
fn strava_activities_sum_per_local_day() {
    let raw = r#"[
        {"start_date_local":"2024-03-01T07:00:00Z","distance":10000,"moving_time":3000,"calories":700,"average_heartrate":152},
        {"start_date_local":"2024-03-01T23:45:00Z","distance":2500,"moving_time":900}
    ]"#;
    let out = StravaNormalizer.normalize(raw).expect("valid export");
    assert_eq!(out.len(), 1);
    let day = &out[&d("2024-03-01")];
    assert!(matches!(day, ProviderDay::Strava(_)));
    assert_eq!(day.reading(Metric::DistanceKm), Some(12.5));
    assert_eq!(day.reading(Metric::ExerciseMinutes), Some(65.0));
    assert_eq!(day.reading(Metric::AvgHr), Some(152.0));
}
