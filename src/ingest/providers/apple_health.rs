//! Apple Health `export.xml` normalizer.
//!
//! The export is a flat stream of `<Record type=".." unit=".." value=".." startDate=".." endDate=".."/>`
//! elements under `<HealthData>`. It is read with a streaming event reader; unknown record
//! types and other elements (workouts, activity summaries, metadata) are skipped.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;

use crate::ingest::types::{DailyMap, NormalizeOptions, SourceNormalizer};
use crate::ingest::{night_of, record_dropped, resting_hr_from_samples, DayAccumulator};
use crate::aggregate::round_to;
use crate::metric::Metric;
use crate::record::{AppleDay, ProviderDay};
use crate::source::Source;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// How a record type folds into daily values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Total(Metric),
    Sample(Metric),
    HeartRate,
    Sleep,
}

fn classify(record_type: &str) -> Option<Kind> {
    let kind = match record_type {
        "HKQuantityTypeIdentifierStepCount" => Kind::Total(Metric::Steps),
        "HKQuantityTypeIdentifierActiveEnergyBurned" => Kind::Total(Metric::ActiveCalories),
        "HKQuantityTypeIdentifierDistanceWalkingRunning" => Kind::Total(Metric::DistanceKm),
        "HKQuantityTypeIdentifierAppleExerciseTime" => Kind::Total(Metric::ExerciseMinutes),
        "HKQuantityTypeIdentifierRestingHeartRate" => Kind::Sample(Metric::RestingHr),
        "HKQuantityTypeIdentifierHeartRate" => Kind::HeartRate,
        "HKQuantityTypeIdentifierHeartRateVariabilitySDNN" => Kind::Sample(Metric::Hrv),
        "HKQuantityTypeIdentifierOxygenSaturation" => Kind::Sample(Metric::Spo2),
        "HKQuantityTypeIdentifierRespiratoryRate" => Kind::Sample(Metric::RespiratoryRate),
        "HKQuantityTypeIdentifierVO2Max" => Kind::Sample(Metric::Vo2Max),
        "HKQuantityTypeIdentifierAppleSleepingWristTemperature" => {
            Kind::Sample(Metric::WristTemperature)
        }
        "HKCategoryTypeIdentifierSleepAnalysis" => Kind::Sleep,
        _ => return None,
    };
    Some(kind)
}

/// Convert a raw value in `unit` into the metric's canonical unit.
fn to_canonical(metric: Metric, value: f64, unit: Option<&str>) -> Option<f64> {
    let unit = unit.unwrap_or_default();
    let v = match metric {
        Metric::ActiveCalories => match unit {
            "kJ" => value / 4.184,
            "kcal" | "Cal" | "" => value,
            _ => return None,
        },
        Metric::DistanceKm => match unit {
            "km" | "" => value,
            "m" => value / 1_000.0,
            "mi" => value * 1.609_344,
            _ => return None,
        },
        Metric::ExerciseMinutes => match unit {
            "min" | "" => value,
            "s" => value / 60.0,
            "hr" => value * 60.0,
            _ => return None,
        },
        // exported as a 0-1 fraction with unit "%"
        Metric::Spo2 if value <= 1.0 => value * 100.0,
        Metric::WristTemperature if unit == "degF" => (value - 32.0) * 5.0 / 9.0,
        _ => value,
    };
    Some(v)
}

#[derive(Debug, Default, Clone, Copy)]
struct Night {
    deep: f64,
    rem: f64,
    light: f64,
    awake: f64,
    unspecified: f64,
    in_bed: f64,
}

impl Night {
    fn add(&mut self, stage: &str, minutes: f64) {
        match stage {
            "HKCategoryValueSleepAnalysisAsleepDeep" => self.deep += minutes,
            "HKCategoryValueSleepAnalysisAsleepREM" => self.rem += minutes,
            "HKCategoryValueSleepAnalysisAsleepCore" => self.light += minutes,
            "HKCategoryValueSleepAnalysisAwake" => self.awake += minutes,
            "HKCategoryValueSleepAnalysisAsleepUnspecified" | "HKCategoryValueSleepAnalysisAsleep" => {
                self.unspecified += minutes
            }
            "HKCategoryValueSleepAnalysisInBed" => self.in_bed += minutes,
            _ => {}
        }
    }

    fn staged(&self) -> bool {
        self.deep + self.rem + self.light > 0.0
    }

    fn asleep(&self) -> f64 {
        self.deep + self.rem + self.light + self.unspecified
    }
}

#[derive(Debug, Default)]
struct RawRecord {
    kind: String,
    unit: Option<String>,
    value: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

fn read_record(e: &BytesStart<'_>) -> Result<RawRecord> {
    let mut rec = RawRecord::default();
    for attr in e.attributes() {
        let attr = attr.context("malformed <Record> attribute")?;
        let slot = match attr.key.as_ref() {
            b"type" => None,
            b"unit" => Some(&mut rec.unit),
            b"value" => Some(&mut rec.value),
            b"startDate" => Some(&mut rec.start),
            b"endDate" => Some(&mut rec.end),
            _ => continue,
        };
        let value = attr
            .unescape_value()
            .context("unescaping <Record> attribute")?
            .into_owned();
        match slot {
            Some(s) => *s = Some(value),
            None => rec.kind = value,
        }
    }
    Ok(rec)
}

/// Offset is kept so durations stay correct across DST changes; days and nights
/// are attributed on the provider-local wall clock.
fn parse_timestamp(s: Option<&str>, what: &str, kind: &str) -> Result<DateTime<FixedOffset>> {
    let s = s.with_context(|| format!("{kind} record without {what}"))?;
    DateTime::parse_from_str(s.trim(), DATE_FORMAT)
        .with_context(|| format!("{kind} record has unparsable {what} '{s}'"))
}

pub struct AppleHealthNormalizer {
    opts: NormalizeOptions,
}

impl AppleHealthNormalizer {
    pub fn new(opts: NormalizeOptions) -> Self {
        Self { opts }
    }

    fn fold_record(
        &self,
        rec: &RawRecord,
        acc: &mut DayAccumulator,
        hr_samples: &mut BTreeMap<NaiveDate, Vec<f64>>,
        nights: &mut BTreeMap<NaiveDate, Night>,
    ) -> Result<()> {
        let Some(kind) = classify(&rec.kind) else {
            return Ok(());
        };
        let start = parse_timestamp(rec.start.as_deref(), "startDate", &rec.kind)?;

        if kind == Kind::Sleep {
            let end = parse_timestamp(rec.end.as_deref(), "endDate", &rec.kind)?;
            let minutes = (end - start).num_seconds() as f64 / 60.0;
            if minutes > 0.0 {
                let stage = rec.value.as_deref().unwrap_or_default();
                nights
                    .entry(night_of(start.naive_local(), self.opts.sleep_cutoff_hour))
                    .or_default()
                    .add(stage, minutes);
            }
            return Ok(());
        }

        let day = start.naive_local().date();
        let Some(value) = rec.value.as_deref().and_then(|v| v.trim().parse::<f64>().ok()) else {
            acc.reject();
            return Ok(());
        };

        match kind {
            Kind::Total(metric) => match to_canonical(metric, value, rec.unit.as_deref()) {
                Some(v) => acc.add(day, metric, v),
                None => acc.reject(),
            },
            Kind::Sample(metric) => match to_canonical(metric, value, rec.unit.as_deref()) {
                Some(v) => acc.sample(day, metric, v),
                None => acc.reject(),
            },
            Kind::HeartRate => {
                acc.sample(day, Metric::AvgHr, value);
                if Metric::AvgHr.accepts(value) {
                    hr_samples.entry(day).or_default().push(value);
                }
            }
            Kind::Sleep => {}
        }
        Ok(())
    }
}

impl Default for AppleHealthNormalizer {
    fn default() -> Self {
        Self::new(NormalizeOptions::default())
    }
}

impl SourceNormalizer for AppleHealthNormalizer {
    fn source(&self) -> Source {
        Source::Apple
    }

    fn normalize(&self, raw: &str) -> Result<DailyMap> {
        let mut reader = Reader::from_str(raw);
        reader.config_mut().trim_text(true);

        let mut acc = DayAccumulator::new();
        let mut hr_samples: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        let mut nights: BTreeMap<NaiveDate, Night> = BTreeMap::new();
        let mut saw_root = false;

        loop {
            let event = reader
                .read_event()
                .with_context(|| format!("parsing xml at byte {}", reader.buffer_position()))?;
            match event {
                Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                    b"HealthData" => saw_root = true,
                    b"Record" => {
                        let rec = read_record(&e)?;
                        self.fold_record(&rec, &mut acc, &mut hr_samples, &mut nights)?;
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_root {
            bail!("not an Apple Health export: missing <HealthData> root element");
        }

        // estimate resting HR where the watch did not report one
        for (day, samples) in &hr_samples {
            if acc.has(*day, Metric::RestingHr) {
                continue;
            }
            if let Some(rhr) = resting_hr_from_samples(samples, self.opts.resting_hr_min_samples) {
                acc.sample(*day, Metric::RestingHr, rhr);
            }
        }

        for (night, n) in &nights {
            let asleep = n.asleep();
            if asleep > 0.0 {
                acc.set(*night, Metric::SleepMinutes, Some(asleep));
            }
            if n.staged() {
                acc.set(*night, Metric::DeepSleepMinutes, Some(n.deep));
                acc.set(*night, Metric::RemSleepMinutes, Some(n.rem));
                acc.set(*night, Metric::LightSleepMinutes, Some(n.light));
                acc.set(*night, Metric::AwakeMinutes, Some(n.awake));
            }
            if n.in_bed > 0.0 && asleep > 0.0 {
                acc.set(
                    *night,
                    Metric::SleepEfficiency,
                    Some(round_to(asleep / n.in_bed * 100.0, 1)),
                );
            }
        }

        record_dropped(Source::Apple, acc.dropped());

        Ok(acc
            .finish()
            .into_iter()
            .map(|(date, values)| {
                let get = |m: Metric| values.get(&m).copied();
                let day = AppleDay {
                    steps: get(Metric::Steps),
                    active_calories: get(Metric::ActiveCalories),
                    distance_km: get(Metric::DistanceKm),
                    exercise_minutes: get(Metric::ExerciseMinutes),
                    resting_hr: get(Metric::RestingHr),
                    avg_hr: get(Metric::AvgHr),
                    hrv: get(Metric::Hrv),
                    sleep_minutes: get(Metric::SleepMinutes),
                    deep_sleep_minutes: get(Metric::DeepSleepMinutes),
                    rem_sleep_minutes: get(Metric::RemSleepMinutes),
                    light_sleep_minutes: get(Metric::LightSleepMinutes),
                    awake_minutes: get(Metric::AwakeMinutes),
                    sleep_efficiency: get(Metric::SleepEfficiency),
                    respiratory_rate: get(Metric::RespiratoryRate),
                    spo2: get(Metric::Spo2),
                    vo2_max: get(Metric::Vo2Max),
                    wrist_temperature: get(Metric::WristTemperature),
                };
                (date, ProviderDay::Apple(day))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_conversion_to_canonical() {
        assert_eq!(to_canonical(Metric::DistanceKm, 1500.0, Some("m")), Some(1.5));
        assert_eq!(to_canonical(Metric::Spo2, 0.97, Some("%")), Some(97.0));
        assert_eq!(to_canonical(Metric::Spo2, 96.0, Some("%")), Some(96.0));
        assert_eq!(to_canonical(Metric::ExerciseMinutes, 120.0, Some("s")), Some(2.0));
        assert_eq!(to_canonical(Metric::DistanceKm, 3.0, Some("furlong")), None);
    }

    #[test]
    fn classify_ignores_unknown_types() {
        assert_eq!(classify("HKQuantityTypeIdentifierBodyMass"), None);
        assert_eq!(
            classify("HKQuantityTypeIdentifierStepCount"),
            Some(Kind::Total(Metric::Steps))
        );
    }

    #[test]
    fn sleep_stages_fold_into_one_night() {
        let mut n = Night::default();
        n.add("HKCategoryValueSleepAnalysisAsleepDeep", 60.0);
        n.add("HKCategoryValueSleepAnalysisAsleepCore", 200.0);
        n.add("HKCategoryValueSleepAnalysisAwake", 15.0);
        n.add("HKCategoryValueSleepAnalysisInBed", 300.0);
        assert!(n.staged());
        assert_eq!(n.asleep(), 260.0);
    }
}
