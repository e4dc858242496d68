//! Strava activity-list normalizer: one JSON array of activities, folded per local start date.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::ingest::types::{DailyMap, SourceNormalizer};
use crate::ingest::{lenient_f64, record_dropped, DayAccumulator};
use crate::metric::Metric;
use crate::record::{ProviderDay, StravaDay};
use crate::source::Source;

#[derive(Debug, Deserialize)]
struct Activity {
    /// Local wall-clock time, formatted with a (misleading) trailing `Z`.
    start_date_local: String,
    /// meters
    #[serde(default, deserialize_with = "lenient_f64")]
    distance: Option<f64>,
    /// seconds
    #[serde(default, deserialize_with = "lenient_f64")]
    moving_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    calories: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    average_heartrate: Option<f64>,
}

fn parse_local(s: &str) -> Result<NaiveDateTime> {
    let trimmed = s.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S")
        .with_context(|| format!("activity has invalid start_date_local '{s}'"))
}

#[derive(Debug, Default)]
pub struct StravaNormalizer;

impl SourceNormalizer for StravaNormalizer {
    fn source(&self) -> Source {
        Source::Strava
    }

    fn normalize(&self, raw: &str) -> Result<DailyMap> {
        let activities: Vec<Activity> =
            serde_json::from_str(raw).context("parsing strava activities json")?;

        let mut acc = DayAccumulator::new();
        for a in activities {
            let day = parse_local(&a.start_date_local)?.date();
            if let Some(m) = a.distance {
                acc.add(day, Metric::DistanceKm, m / 1_000.0);
            }
            if let Some(s) = a.moving_time {
                acc.add(day, Metric::ExerciseMinutes, s / 60.0);
            }
            if let Some(kcal) = a.calories {
                acc.add(day, Metric::ActiveCalories, kcal);
            }
            if let Some(hr) = a.average_heartrate {
                acc.sample(day, Metric::AvgHr, hr);
            }
        }

        record_dropped(Source::Strava, acc.dropped());

        Ok(acc
            .finish()
            .into_iter()
            .map(|(date, values)| {
                let get = |m: Metric| values.get(&m).copied();
                let day = StravaDay {
                    active_calories: get(Metric::ActiveCalories),
                    distance_km: get(Metric::DistanceKm),
                    exercise_minutes: get(Metric::ExerciseMinutes),
                    avg_hr: get(Metric::AvgHr),
                };
                (date, ProviderDay::Strava(day))
            })
            .collect())
    }
}
