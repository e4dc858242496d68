//! # Unified metrics
//!
//! The fixed set of 21 health metrics carried by every unified daily record,
//! together with their canonical unit, display precision and validity predicate.
//!
//! Validity is explicit per metric instead of relying on "truthiness":
//! - `steps` and `active_calories` treat `0` as the "device not worn" sentinel.
//! - exercise minutes, distance and sleep stage minutes accept a true `0`.
//! - non-finite values are never valid.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    // activity
    Steps,
    ActiveCalories,
    DistanceKm,
    ExerciseMinutes,
    // cardiac
    RestingHr,
    AvgHr,
    Hrv,
    // sleep
    SleepMinutes,
    SleepScore,
    DeepSleepMinutes,
    RemSleepMinutes,
    LightSleepMinutes,
    AwakeMinutes,
    SleepEfficiency,
    // respiratory
    RespiratoryRate,
    Spo2,
    BreathingDisturbanceIndex,
    // recovery
    ReadinessScore,
    TemperatureDeviation,
    // fitness
    Vo2Max,
    // body
    WristTemperature,
}

impl Metric {
    pub const ALL: [Metric; 21] = [
        Metric::Steps,
        Metric::ActiveCalories,
        Metric::DistanceKm,
        Metric::ExerciseMinutes,
        Metric::RestingHr,
        Metric::AvgHr,
        Metric::Hrv,
        Metric::SleepMinutes,
        Metric::SleepScore,
        Metric::DeepSleepMinutes,
        Metric::RemSleepMinutes,
        Metric::LightSleepMinutes,
        Metric::AwakeMinutes,
        Metric::SleepEfficiency,
        Metric::RespiratoryRate,
        Metric::Spo2,
        Metric::BreathingDisturbanceIndex,
        Metric::ReadinessScore,
        Metric::TemperatureDeviation,
        Metric::Vo2Max,
        Metric::WristTemperature,
    ];

    /// Field name in the persisted artifact.
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Steps => "steps",
            Metric::ActiveCalories => "active_calories",
            Metric::DistanceKm => "distance_km",
            Metric::ExerciseMinutes => "exercise_minutes",
            Metric::RestingHr => "resting_hr",
            Metric::AvgHr => "avg_hr",
            Metric::Hrv => "hrv",
            Metric::SleepMinutes => "sleep_minutes",
            Metric::SleepScore => "sleep_score",
            Metric::DeepSleepMinutes => "deep_sleep_minutes",
            Metric::RemSleepMinutes => "rem_sleep_minutes",
            Metric::LightSleepMinutes => "light_sleep_minutes",
            Metric::AwakeMinutes => "awake_minutes",
            Metric::SleepEfficiency => "sleep_efficiency",
            Metric::RespiratoryRate => "respiratory_rate",
            Metric::Spo2 => "spo2",
            Metric::BreathingDisturbanceIndex => "breathing_disturbance_index",
            Metric::ReadinessScore => "readiness_score",
            Metric::TemperatureDeviation => "temperature_deviation",
            Metric::Vo2Max => "vo2_max",
            Metric::WristTemperature => "wrist_temperature",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Steps => "count",
            Metric::ActiveCalories => "kcal",
            Metric::DistanceKm => "km",
            Metric::ExerciseMinutes
            | Metric::SleepMinutes
            | Metric::DeepSleepMinutes
            | Metric::RemSleepMinutes
            | Metric::LightSleepMinutes
            | Metric::AwakeMinutes => "min",
            Metric::RestingHr | Metric::AvgHr => "bpm",
            Metric::Hrv => "ms",
            Metric::SleepScore | Metric::ReadinessScore => "score",
            Metric::SleepEfficiency | Metric::Spo2 => "%",
            Metric::RespiratoryRate => "breaths/min",
            Metric::BreathingDisturbanceIndex => "events/h",
            Metric::TemperatureDeviation | Metric::WristTemperature => "degC",
            Metric::Vo2Max => "ml/kg/min",
        }
    }

    /// Decimal places used when this metric is averaged or emitted by a normalizer.
    pub fn precision(self) -> u32 {
        match self {
            Metric::Steps
            | Metric::ActiveCalories
            | Metric::ExerciseMinutes
            | Metric::SleepMinutes
            | Metric::SleepScore
            | Metric::DeepSleepMinutes
            | Metric::RemSleepMinutes
            | Metric::LightSleepMinutes
            | Metric::AwakeMinutes
            | Metric::ReadinessScore => 0,
            Metric::DistanceKm => 2,
            _ => 1,
        }
    }

    /// Whether a present reading is usable for this metric.
    pub fn accepts(self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            // hard zero means "not worn"
            Metric::Steps | Metric::ActiveCalories => value > 0.0,
            Metric::DistanceKm
            | Metric::ExerciseMinutes
            | Metric::DeepSleepMinutes
            | Metric::RemSleepMinutes
            | Metric::LightSleepMinutes
            | Metric::AwakeMinutes
            | Metric::BreathingDisturbanceIndex => value >= 0.0,
            Metric::SleepMinutes | Metric::Hrv | Metric::Vo2Max => value > 0.0,
            Metric::RestingHr | Metric::AvgHr => (20.0..=250.0).contains(&value),
            Metric::SleepScore | Metric::ReadinessScore => (1.0..=100.0).contains(&value),
            Metric::SleepEfficiency => value > 0.0 && value <= 100.0,
            Metric::RespiratoryRate => value > 0.0 && value < 60.0,
            Metric::Spo2 => (50.0..=100.0).contains(&value),
            Metric::TemperatureDeviation => (-10.0..=10.0).contains(&value),
            Metric::WristTemperature => (20.0..=45.0).contains(&value),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == key)
            .ok_or_else(|| anyhow::anyhow!("unknown metric: {s}"))
    }
}
