//! Oura ring JSON export normalizer.
//!
//! The export bundles the day-lists (`daily_activity`, `daily_sleep`, `daily_readiness`,
//! `daily_spo2`) and the sleep session-list (`sleep`). Only the longest `long_sleep`
//! session per night feeds nightly aggregates; naps and rest periods are ignored.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::ingest::types::{DailyMap, NormalizeOptions, SourceNormalizer};
use crate::ingest::{lenient_f64, night_of, parse_day, record_dropped, DayAccumulator};
use crate::metric::Metric;
use crate::record::{OuraDay, ProviderDay};
use crate::source::Source;

const MAIN_SLEEP: &str = "long_sleep";

#[derive(Debug, Default, Deserialize)]
struct OuraExport {
    #[serde(default)]
    sleep: Vec<SleepSession>,
    #[serde(default)]
    daily_sleep: Vec<DailySleep>,
    #[serde(default)]
    daily_activity: Vec<DailyActivity>,
    #[serde(default)]
    daily_readiness: Vec<DailyReadiness>,
    #[serde(default)]
    daily_spo2: Vec<DailySpo2>,
}

#[derive(Debug, Clone, Deserialize)]
struct SleepSession {
    /// Oura's own (wake-up) day for the session.
    #[serde(default)]
    day: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    bedtime_start: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    total_sleep_duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    deep_sleep_duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    rem_sleep_duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    light_sleep_duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    awake_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    efficiency: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    average_heart_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    lowest_heart_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    average_hrv: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    average_breath: Option<f64>,
}

impl SleepSession {
    fn is_main(&self) -> bool {
        self.kind.as_deref().map_or(true, |k| k == MAIN_SLEEP)
    }

    fn duration(&self) -> f64 {
        self.total_sleep_duration.unwrap_or(0.0)
    }
}

#[derive(Debug, Deserialize)]
struct DailySleep {
    day: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DailyActivity {
    day: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    steps: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    active_calories: Option<f64>,
    /// meters
    #[serde(default, deserialize_with = "lenient_f64")]
    equivalent_walking_distance: Option<f64>,
    /// seconds
    #[serde(default, deserialize_with = "lenient_f64")]
    high_activity_time: Option<f64>,
    /// seconds
    #[serde(default, deserialize_with = "lenient_f64")]
    medium_activity_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DailyReadiness {
    day: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    temperature_deviation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Spo2Percentage {
    #[serde(default, deserialize_with = "lenient_f64")]
    average: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DailySpo2 {
    day: String,
    #[serde(default)]
    spo2_percentage: Option<Spo2Percentage>,
    #[serde(default, deserialize_with = "lenient_f64")]
    breathing_disturbance_index: Option<f64>,
}

fn minutes(seconds: Option<f64>) -> Option<f64> {
    seconds.map(|s| s / 60.0)
}

pub struct OuraNormalizer {
    opts: NormalizeOptions,
}

impl OuraNormalizer {
    pub fn new(opts: NormalizeOptions) -> Self {
        Self { opts }
    }

    /// Longest main-sleep session per night, plus Oura's wake-day → night mapping.
    /// Equal lengths keep the session that started first.
    fn main_sleeps(
        &self,
        sessions: Vec<SleepSession>,
    ) -> Result<(BTreeMap<NaiveDate, SleepSession>, BTreeMap<NaiveDate, NaiveDate>)> {
        let mut kept: BTreeMap<NaiveDate, (DateTime<FixedOffset>, SleepSession)> = BTreeMap::new();
        for s in sessions.into_iter().filter(SleepSession::is_main) {
            let start = DateTime::parse_from_rfc3339(s.bedtime_start.trim()).with_context(|| {
                format!("sleep session has invalid bedtime_start '{}'", s.bedtime_start)
            })?;
            let night = night_of(start.naive_local(), self.opts.sleep_cutoff_hour);
            match kept.get(&night) {
                Some((kept_start, k))
                    if k.duration() > s.duration()
                        || (k.duration() == s.duration() && *kept_start <= start) => {}
                _ => {
                    kept.insert(night, (start, s));
                }
            }
        }
        let nights: BTreeMap<NaiveDate, SleepSession> =
            kept.into_iter().map(|(night, (_, s))| (night, s)).collect();

        let mut wake_days = BTreeMap::new();
        for (night, s) in &nights {
            if let Some(day) = s.day.as_deref() {
                wake_days.insert(parse_day(day)?, *night);
            }
        }
        Ok((nights, wake_days))
    }
}

impl Default for OuraNormalizer {
    fn default() -> Self {
        Self::new(NormalizeOptions::default())
    }
}

impl SourceNormalizer for OuraNormalizer {
    fn source(&self) -> Source {
        Source::Oura
    }

    fn normalize(&self, raw: &str) -> Result<DailyMap> {
        let export: OuraExport = serde_json::from_str(raw).context("parsing oura export json")?;
        let mut acc = DayAccumulator::new();

        let (nights, wake_days) = self.main_sleeps(export.sleep)?;
        for (night, s) in &nights {
            let night = *night;
            acc.set(night, Metric::SleepMinutes, minutes(s.total_sleep_duration));
            acc.set(night, Metric::DeepSleepMinutes, minutes(s.deep_sleep_duration));
            acc.set(night, Metric::RemSleepMinutes, minutes(s.rem_sleep_duration));
            acc.set(night, Metric::LightSleepMinutes, minutes(s.light_sleep_duration));
            acc.set(night, Metric::AwakeMinutes, minutes(s.awake_time));
            acc.set(night, Metric::SleepEfficiency, s.efficiency);
            acc.set(night, Metric::RestingHr, s.lowest_heart_rate);
            acc.set(night, Metric::AvgHr, s.average_heart_rate);
            acc.set(night, Metric::Hrv, s.average_hrv);
            acc.set(night, Metric::RespiratoryRate, s.average_breath);
        }

        for row in export.daily_sleep {
            let day = parse_day(&row.day)?;
            // keyed by wake-up day; without a matching session the night is the day before
            let night = wake_days
                .get(&day)
                .copied()
                .or_else(|| day.pred_opt())
                .unwrap_or(day);
            acc.set(night, Metric::SleepScore, row.score);
        }

        for row in export.daily_activity {
            let day = parse_day(&row.day)?;
            acc.set(day, Metric::Steps, row.steps);
            acc.set(day, Metric::ActiveCalories, row.active_calories);
            acc.set(day, Metric::DistanceKm, row.equivalent_walking_distance.map(|m| m / 1_000.0));
            let exercise = match (row.high_activity_time, row.medium_activity_time) {
                (None, None) => None,
                (high, medium) => Some(high.unwrap_or(0.0) + medium.unwrap_or(0.0)),
            };
            acc.set(day, Metric::ExerciseMinutes, minutes(exercise));
        }

        for row in export.daily_readiness {
            let day = parse_day(&row.day)?;
            acc.set(day, Metric::ReadinessScore, row.score);
            acc.set(day, Metric::TemperatureDeviation, row.temperature_deviation);
        }

        for row in export.daily_spo2 {
            let day = parse_day(&row.day)?;
            acc.set(day, Metric::Spo2, row.spo2_percentage.and_then(|p| p.average));
            acc.set(day, Metric::BreathingDisturbanceIndex, row.breathing_disturbance_index);
        }

        record_dropped(Source::Oura, acc.dropped());

        Ok(acc
            .finish()
            .into_iter()
            .map(|(date, values)| {
                let get = |m: Metric| values.get(&m).copied();
                let day = OuraDay {
                    steps: get(Metric::Steps),
                    active_calories: get(Metric::ActiveCalories),
                    distance_km: get(Metric::DistanceKm),
                    exercise_minutes: get(Metric::ExerciseMinutes),
                    resting_hr: get(Metric::RestingHr),
                    avg_hr: get(Metric::AvgHr),
                    hrv: get(Metric::Hrv),
                    sleep_minutes: get(Metric::SleepMinutes),
                    sleep_score: get(Metric::SleepScore),
                    deep_sleep_minutes: get(Metric::DeepSleepMinutes),
                    rem_sleep_minutes: get(Metric::RemSleepMinutes),
                    light_sleep_minutes: get(Metric::LightSleepMinutes),
                    awake_minutes: get(Metric::AwakeMinutes),
                    sleep_efficiency: get(Metric::SleepEfficiency),
                    respiratory_rate: get(Metric::RespiratoryRate),
                    spo2: get(Metric::Spo2),
                    breathing_disturbance_index: get(Metric::BreathingDisturbanceIndex),
                    readiness_score: get(Metric::ReadinessScore),
                    temperature_deviation: get(Metric::TemperatureDeviation),
                };
                (date, ProviderDay::Oura(day))
            })
            .collect())
    }
}
