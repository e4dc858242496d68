//! # Records
//!
//! Data shapes flowing through the reconciler:
//! - [`Sourced`]: a present, finite reading tagged with the provider that produced it.
//! - per-provider daily records ([`AppleDay`], [`OuraDay`], [`StravaDay`]) wrapped in the
//!   tagged variant [`ProviderDay`], built once by the normalizers and never mutated after.
//! - [`UnifiedDailyRecord`]: one per date, each metric either `null` or `{ value, source }`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::metric::Metric;
use crate::source::Source;

/// A value annotated with the provider that produced it.
///
/// Absence is represented by the absence of the wrapper, so a live `Sourced<f64>`
/// is always finite (see [`Sourced::new`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sourced<T> {
    value: T,
    source: Source,
}

impl Sourced<f64> {
    /// Returns `None` for NaN/infinite readings.
    pub fn new(value: f64, source: Source) -> Option<Self> {
        value.is_finite().then_some(Self { value, source })
    }
}

impl<T: Copy> Sourced<T> {
    pub fn value(&self) -> T {
        self.value
    }

    pub fn source(&self) -> Source {
        self.source
    }
}

/// Daily readings from Apple Health (wrist-worn watch).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppleDay {
    pub steps: Option<f64>,
    pub active_calories: Option<f64>,
    pub distance_km: Option<f64>,
    pub exercise_minutes: Option<f64>,
    pub resting_hr: Option<f64>,
    pub avg_hr: Option<f64>,
    pub hrv: Option<f64>,
    pub sleep_minutes: Option<f64>,
    pub deep_sleep_minutes: Option<f64>,
    pub rem_sleep_minutes: Option<f64>,
    pub light_sleep_minutes: Option<f64>,
    pub awake_minutes: Option<f64>,
    pub sleep_efficiency: Option<f64>,
    pub respiratory_rate: Option<f64>,
    pub spo2: Option<f64>,
    pub vo2_max: Option<f64>,
    pub wrist_temperature: Option<f64>,
}

impl AppleDay {
    pub fn reading(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Steps => self.steps,
            Metric::ActiveCalories => self.active_calories,
            Metric::DistanceKm => self.distance_km,
            Metric::ExerciseMinutes => self.exercise_minutes,
            Metric::RestingHr => self.resting_hr,
            Metric::AvgHr => self.avg_hr,
            Metric::Hrv => self.hrv,
            Metric::SleepMinutes => self.sleep_minutes,
            Metric::DeepSleepMinutes => self.deep_sleep_minutes,
            Metric::RemSleepMinutes => self.rem_sleep_minutes,
            Metric::LightSleepMinutes => self.light_sleep_minutes,
            Metric::AwakeMinutes => self.awake_minutes,
            Metric::SleepEfficiency => self.sleep_efficiency,
            Metric::RespiratoryRate => self.respiratory_rate,
            Metric::Spo2 => self.spo2,
            Metric::Vo2Max => self.vo2_max,
            Metric::WristTemperature => self.wrist_temperature,
            Metric::SleepScore
            | Metric::BreathingDisturbanceIndex
            | Metric::ReadinessScore
            | Metric::TemperatureDeviation => None,
        }
    }
}

/// Daily readings from the Oura ring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OuraDay {
    pub steps: Option<f64>,
    pub active_calories: Option<f64>,
    pub distance_km: Option<f64>,
    pub exercise_minutes: Option<f64>,
    pub resting_hr: Option<f64>,
    pub avg_hr: Option<f64>,
    pub hrv: Option<f64>,
    pub sleep_minutes: Option<f64>,
    pub sleep_score: Option<f64>,
    pub deep_sleep_minutes: Option<f64>,
    pub rem_sleep_minutes: Option<f64>,
    pub light_sleep_minutes: Option<f64>,
    pub awake_minutes: Option<f64>,
    pub sleep_efficiency: Option<f64>,
    pub respiratory_rate: Option<f64>,
    pub spo2: Option<f64>,
    pub breathing_disturbance_index: Option<f64>,
    pub readiness_score: Option<f64>,
    pub temperature_deviation: Option<f64>,
}

impl OuraDay {
    pub fn reading(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Steps => self.steps,
            Metric::ActiveCalories => self.active_calories,
            Metric::DistanceKm => self.distance_km,
            Metric::ExerciseMinutes => self.exercise_minutes,
            Metric::RestingHr => self.resting_hr,
            Metric::AvgHr => self.avg_hr,
            Metric::Hrv => self.hrv,
            Metric::SleepMinutes => self.sleep_minutes,
            Metric::SleepScore => self.sleep_score,
            Metric::DeepSleepMinutes => self.deep_sleep_minutes,
            Metric::RemSleepMinutes => self.rem_sleep_minutes,
            Metric::LightSleepMinutes => self.light_sleep_minutes,
            Metric::AwakeMinutes => self.awake_minutes,
            Metric::SleepEfficiency => self.sleep_efficiency,
            Metric::RespiratoryRate => self.respiratory_rate,
            Metric::Spo2 => self.spo2,
            Metric::BreathingDisturbanceIndex => self.breathing_disturbance_index,
            Metric::ReadinessScore => self.readiness_score,
            Metric::TemperatureDeviation => self.temperature_deviation,
            Metric::Vo2Max | Metric::WristTemperature => None,
        }
    }
}

/// Daily totals from Strava activities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StravaDay {
    pub active_calories: Option<f64>,
    pub distance_km: Option<f64>,
    pub exercise_minutes: Option<f64>,
    pub avg_hr: Option<f64>,
}

impl StravaDay {
    pub fn reading(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::ActiveCalories => self.active_calories,
            Metric::DistanceKm => self.distance_km,
            Metric::ExerciseMinutes => self.exercise_minutes,
            Metric::AvgHr => self.avg_hr,
            _ => None,
        }
    }
}

/// One provider's record for one day.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderDay {
    Apple(AppleDay),
    Oura(OuraDay),
    Strava(StravaDay),
}

impl ProviderDay {
    pub fn source(&self) -> Source {
        match self {
            ProviderDay::Apple(_) => Source::Apple,
            ProviderDay::Oura(_) => Source::Oura,
            ProviderDay::Strava(_) => Source::Strava,
        }
    }

    /// Raw reading for `metric`, `None` if the provider never supplies it or had no data.
    pub fn reading(&self, metric: Metric) -> Option<f64> {
        match self {
            ProviderDay::Apple(d) => d.reading(metric),
            ProviderDay::Oura(d) => d.reading(metric),
            ProviderDay::Strava(d) => d.reading(metric),
        }
    }
}

/// Canonical per-day record. Every metric field is serialized, `null` when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedDailyRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub steps: Option<Sourced<f64>>,
    #[serde(default)]
    pub active_calories: Option<Sourced<f64>>,
    #[serde(default)]
    pub distance_km: Option<Sourced<f64>>,
    #[serde(default)]
    pub exercise_minutes: Option<Sourced<f64>>,
    #[serde(default)]
    pub resting_hr: Option<Sourced<f64>>,
    #[serde(default)]
    pub avg_hr: Option<Sourced<f64>>,
    #[serde(default)]
    pub hrv: Option<Sourced<f64>>,
    #[serde(default)]
    pub sleep_minutes: Option<Sourced<f64>>,
    #[serde(default)]
    pub sleep_score: Option<Sourced<f64>>,
    #[serde(default)]
    pub deep_sleep_minutes: Option<Sourced<f64>>,
    #[serde(default)]
    pub rem_sleep_minutes: Option<Sourced<f64>>,
    #[serde(default)]
    pub light_sleep_minutes: Option<Sourced<f64>>,
    #[serde(default)]
    pub awake_minutes: Option<Sourced<f64>>,
    #[serde(default)]
    pub sleep_efficiency: Option<Sourced<f64>>,
    #[serde(default)]
    pub respiratory_rate: Option<Sourced<f64>>,
    #[serde(default)]
    pub spo2: Option<Sourced<f64>>,
    #[serde(default)]
    pub breathing_disturbance_index: Option<Sourced<f64>>,
    #[serde(default)]
    pub readiness_score: Option<Sourced<f64>>,
    #[serde(default)]
    pub temperature_deviation: Option<Sourced<f64>>,
    #[serde(default)]
    pub vo2_max: Option<Sourced<f64>>,
    #[serde(default)]
    pub wrist_temperature: Option<Sourced<f64>>,
}

impl UnifiedDailyRecord {
    /// Record for `date` with every metric `null`.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            steps: None,
            active_calories: None,
            distance_km: None,
            exercise_minutes: None,
            resting_hr: None,
            avg_hr: None,
            hrv: None,
            sleep_minutes: None,
            sleep_score: None,
            deep_sleep_minutes: None,
            rem_sleep_minutes: None,
            light_sleep_minutes: None,
            awake_minutes: None,
            sleep_efficiency: None,
            respiratory_rate: None,
            spo2: None,
            breathing_disturbance_index: None,
            readiness_score: None,
            temperature_deviation: None,
            vo2_max: None,
            wrist_temperature: None,
        }
    }

    pub fn get(&self, metric: Metric) -> Option<&Sourced<f64>> {
        self.slot(metric).as_ref()
    }

    fn slot(&self, metric: Metric) -> &Option<Sourced<f64>> {
        match metric {
            Metric::Steps => &self.steps,
            Metric::ActiveCalories => &self.active_calories,
            Metric::DistanceKm => &self.distance_km,
            Metric::ExerciseMinutes => &self.exercise_minutes,
            Metric::RestingHr => &self.resting_hr,
            Metric::AvgHr => &self.avg_hr,
            Metric::Hrv => &self.hrv,
            Metric::SleepMinutes => &self.sleep_minutes,
            Metric::SleepScore => &self.sleep_score,
            Metric::DeepSleepMinutes => &self.deep_sleep_minutes,
            Metric::RemSleepMinutes => &self.rem_sleep_minutes,
            Metric::LightSleepMinutes => &self.light_sleep_minutes,
            Metric::AwakeMinutes => &self.awake_minutes,
            Metric::SleepEfficiency => &self.sleep_efficiency,
            Metric::RespiratoryRate => &self.respiratory_rate,
            Metric::Spo2 => &self.spo2,
            Metric::BreathingDisturbanceIndex => &self.breathing_disturbance_index,
            Metric::ReadinessScore => &self.readiness_score,
            Metric::TemperatureDeviation => &self.temperature_deviation,
            Metric::Vo2Max => &self.vo2_max,
            Metric::WristTemperature => &self.wrist_temperature,
        }
    }

    pub fn slot_mut(&mut self, metric: Metric) -> &mut Option<Sourced<f64>> {
        match metric {
            Metric::Steps => &mut self.steps,
            Metric::ActiveCalories => &mut self.active_calories,
            Metric::DistanceKm => &mut self.distance_km,
            Metric::ExerciseMinutes => &mut self.exercise_minutes,
            Metric::RestingHr => &mut self.resting_hr,
            Metric::AvgHr => &mut self.avg_hr,
            Metric::Hrv => &mut self.hrv,
            Metric::SleepMinutes => &mut self.sleep_minutes,
            Metric::SleepScore => &mut self.sleep_score,
            Metric::DeepSleepMinutes => &mut self.deep_sleep_minutes,
            Metric::RemSleepMinutes => &mut self.rem_sleep_minutes,
            Metric::LightSleepMinutes => &mut self.light_sleep_minutes,
            Metric::AwakeMinutes => &mut self.awake_minutes,
            Metric::SleepEfficiency => &mut self.sleep_efficiency,
            Metric::RespiratoryRate => &mut self.respiratory_rate,
            Metric::Spo2 => &mut self.spo2,
            Metric::BreathingDisturbanceIndex => &mut self.breathing_disturbance_index,
            Metric::ReadinessScore => &mut self.readiness_score,
            Metric::TemperatureDeviation => &mut self.temperature_deviation,
            Metric::Vo2Max => &mut self.vo2_max,
            Metric::WristTemperature => &mut self.wrist_temperature,
        }
    }
}
