//! # Aggregation helpers
//! Null-safe rounding, averaging and provenance lookups over unified records.
//! Every helper tolerates empty or fully-null input and returns `None` instead of NaN.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::metric::Metric;
use crate::record::{Sourced, UnifiedDailyRecord};
use crate::source::Source;

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Mean of the present, finite values rounded to `decimals`; `None` if nothing is present.
pub fn average<I>(values: I, decimals: u32) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values.into_iter().flatten() {
        if v.is_finite() {
            sum += v;
            n += 1;
        }
    }
    (n > 0).then(|| round_to(sum / n as f64, decimals))
}

/// [`average`] over sourced values, dropping nulls.
pub fn average_sourced<'a, I>(values: I, decimals: u32) -> Option<f64>
where
    I: IntoIterator<Item = Option<&'a Sourced<f64>>>,
{
    average(values.into_iter().map(|v| v.map(|s| s.value())), decimals)
}

/// Source tag of the most recent record that has a value for `metric`.
/// Display-only; the merge never looks at this.
pub fn dominant_source(records: &[UnifiedDailyRecord], metric: Metric) -> Option<Source> {
    latest(records, metric).map(|(_, s)| s.source())
}

/// Most recent `(date, value)` for `metric`, regardless of input order.
pub fn latest(records: &[UnifiedDailyRecord], metric: Metric) -> Option<(NaiveDate, Sourced<f64>)> {
    records
        .iter()
        .filter_map(|r| r.get(metric).map(|s| (r.date, *s)))
        .max_by_key(|(date, _)| *date)
}

/// Average of one metric over a calendar period, tagged with its dominant source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub metric: Metric,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub average: Option<f64>,
    pub source: Option<Source>,
    pub days_with_data: usize,
}

/// Summary over the `days` calendar days ending at `end` (inclusive), e.g. a 90-day average.
pub fn period_summary(
    records: &[UnifiedDailyRecord],
    metric: Metric,
    end: NaiveDate,
    days: u32,
) -> PeriodSummary {
    // windows reaching past the calendar's start are clamped to it
    let span = u64::from(days.max(1)) - 1;
    let start = end.checked_sub_days(Days::new(span)).unwrap_or(NaiveDate::MIN);

    let in_range: Vec<UnifiedDailyRecord> = records
        .iter()
        .filter(|r| r.date >= start && r.date <= end)
        .cloned()
        .collect();

    let days_with_data = in_range.iter().filter(|r| r.get(metric).is_some()).count();

    PeriodSummary {
        metric,
        start,
        end,
        average: average_sourced(in_range.iter().map(|r| r.get(metric)), metric.precision()),
        source: dominant_source(&in_range, metric),
        days_with_data,
    }
}
