// src/ingest/mod.rs
//! Source normalizers and the shared helpers they use: per-day accumulation,
//! night attribution, resting-HR estimation and lenient numeric parsing.

pub mod providers;
pub mod types;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::Path;

use crate::aggregate::round_to;
use crate::config::ReconcileConfig;
use crate::engine::SourceMaps;
use crate::ingest::providers::{AppleHealthNormalizer, OuraNormalizer, StravaNormalizer};
use crate::ingest::types::{DailyMap, SourceNormalizer};
use crate::metric::Metric;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_days_total", "Days produced per source normalizer.");
        describe_counter!(
            "ingest_missing_sources_total",
            "Sources skipped because their export file is absent."
        );
        describe_counter!(
            "ingest_dropped_readings_total",
            "Readings dropped as unparsable, sentinel or out of domain."
        );
        describe_histogram!("ingest_parse_ms", "Normalizer parse time in milliseconds.");
    });
}

/// Calendar date of the night a sleep interval starting at `start` belongs to.
///
/// Starts before `cutoff_hour` (provider-local) count as part of the previous night.
pub fn night_of(start: NaiveDateTime, cutoff_hour: u32) -> NaiveDate {
    let date = start.date();
    if start.hour() < cutoff_hour {
        date.pred_opt().unwrap_or(date)
    } else {
        date
    }
}

/// Mean of the lowest 10% of the day's HR samples, once there are at least `min_samples`.
pub fn resting_hr_from_samples(samples: &[f64], min_samples: usize) -> Option<f64> {
    if samples.is_empty() || samples.len() < min_samples {
        return None;
    }
    let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    let take = (sorted.len() / 10).max(1);
    let lowest = &sorted[..take.min(sorted.len())];
    if lowest.is_empty() {
        return None;
    }
    Some(round_to(lowest.iter().sum::<f64>() / lowest.len() as f64, 1))
}

#[derive(Debug, Clone, Copy)]
enum Agg {
    Sum(f64),
    Mean { sum: f64, n: usize },
}

/// Per-day, per-metric accumulator: additive metrics are summed, point samples averaged.
#[derive(Debug, Default)]
pub struct DayAccumulator {
    days: BTreeMap<NaiveDate, BTreeMap<Metric, Agg>>,
    dropped: u64,
}

impl DayAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to a daily total (steps, calories, distance, minutes).
    pub fn add(&mut self, date: NaiveDate, metric: Metric, value: f64) {
        if !value.is_finite() || value < 0.0 {
            self.dropped += 1;
            return;
        }
        let slot = self.days.entry(date).or_default();
        match slot.entry(metric).or_insert(Agg::Sum(0.0)) {
            Agg::Sum(total) => *total += value,
            Agg::Mean { .. } => self.dropped += 1,
        }
    }

    /// Record a point sample (heart rate, HRV, SpO2, ...), averaged per day.
    pub fn sample(&mut self, date: NaiveDate, metric: Metric, value: f64) {
        if !metric.accepts(value) {
            self.dropped += 1;
            return;
        }
        let slot = self.days.entry(date).or_default();
        match slot.entry(metric).or_insert(Agg::Mean { sum: 0.0, n: 0 }) {
            Agg::Mean { sum, n } => {
                *sum += value;
                *n += 1;
            }
            Agg::Sum(_) => self.dropped += 1,
        }
    }

    /// Set a value that is already a daily figure (provider day-lists).
    pub fn set(&mut self, date: NaiveDate, metric: Metric, value: Option<f64>) {
        match value {
            Some(v) if metric.accepts(v) => {
                self.days.entry(date).or_default().insert(metric, Agg::Sum(v));
            }
            Some(_) => self.dropped += 1,
            None => {}
        }
    }

    /// Count a reading that could not be used at all (unparsable, unknown unit).
    pub fn reject(&mut self) {
        self.dropped += 1;
    }

    pub fn has(&self, date: NaiveDate, metric: Metric) -> bool {
        self.days.get(&date).is_some_and(|m| m.contains_key(&metric))
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Final per-day values, rounded to each metric's precision.
    pub fn finish(self) -> BTreeMap<NaiveDate, BTreeMap<Metric, f64>> {
        self.days
            .into_iter()
            .map(|(date, metrics)| {
                let values = metrics
                    .into_iter()
                    .filter_map(|(metric, agg)| {
                        let v = match agg {
                            Agg::Sum(total) => total,
                            Agg::Mean { sum, n } if n > 0 => sum / n as f64,
                            Agg::Mean { .. } => return None,
                        };
                        Some((metric, round_to(v, metric.precision())))
                    })
                    .collect();
                (date, values)
            })
            .collect()
    }
}

/// Accepts numbers, numeric strings and null; anything else (e.g. `"missing"`) becomes `None`.
pub(crate) fn lenient_f64<'de, D>(d: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match v {
        Some(serde_json::Value::Number(n)) => n.as_f64().filter(|x| x.is_finite()),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
        _ => None,
    })
}

pub(crate) fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

/// Load one provider's export.
///
/// - no path configured, or file absent → the source contributes zero days;
/// - unreadable or malformed file → error (the whole run must stop).
pub fn load_source(normalizer: &dyn SourceNormalizer, path: Option<&Path>) -> Result<DailyMap> {
    ensure_metrics_described();
    let source = normalizer.source();

    let Some(path) = path.filter(|p| p.exists()) else {
        tracing::warn!(
            target: "ingest",
            source = %source,
            path = ?path,
            "export not found, source contributes no days"
        );
        counter!("ingest_missing_sources_total", "source" => source.as_str()).increment(1);
        return Ok(DailyMap::new());
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {source} export {}", path.display()))?;

    let t0 = std::time::Instant::now();
    let days = normalizer
        .normalize(&raw)
        .with_context(|| format!("malformed {source} export {}", path.display()))?;
    histogram!("ingest_parse_ms", "source" => source.as_str())
        .record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!("ingest_days_total", "source" => source.as_str()).increment(days.len() as u64);

    tracing::info!(
        target: "ingest",
        source = %source,
        days = days.len(),
        path = %path.display(),
        "source loaded"
    );
    Ok(days)
}

/// Load every configured provider. The first malformed export aborts the whole load.
pub fn load_all(cfg: &ReconcileConfig) -> Result<SourceMaps> {
    let normalizers: Vec<Box<dyn SourceNormalizer>> = vec![
        Box::new(AppleHealthNormalizer::new(cfg.normalize)),
        Box::new(OuraNormalizer::new(cfg.normalize)),
        Box::new(StravaNormalizer),
    ];

    let mut maps = SourceMaps::new();
    for n in &normalizers {
        let days = load_source(n.as_ref(), cfg.sources.get(n.source()))?;
        if !days.is_empty() {
            maps.insert(n.source(), days);
        }
    }
    Ok(maps)
}

pub(crate) fn record_dropped(source: crate::source::Source, dropped: u64) {
    if dropped > 0 {
        tracing::debug!(target: "ingest", source = %source, dropped, "readings dropped");
        counter!("ingest_dropped_readings_total", "source" => source.as_str()).increment(dropped);
    }
}
