//! # Rolling Window
//! Trailing moving average over a sparse, date-ordered point series.
//!
//! The window is measured in calendar days, not in points, because the
//! series may have gaps. For each point the scan walks backwards (same day
//! included) and stops at the first point that falls outside the window.

use chrono::NaiveDate;
use serde::Serialize;

use crate::metric::Metric;
use crate::record::UnifiedDailyRecord;

/// One `(date, value)` sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub date: NaiveDate,
    pub value: f64,
}

impl Point {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Whole days from `earlier` to `later` (negative if `later` is before `earlier`).
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}

/// Trailing moving average with a `window_days` calendar window.
///
/// `points` must be ascending by date. A point at distance `d` days behind the
/// current one is inside the window when `d < window_days`. Output has one point
/// per input point; values are not rounded.
pub fn moving_average(points: &[Point], window_days: u32) -> Vec<Point> {
    let window = i64::from(window_days.max(1));
    let mut out = Vec::with_capacity(points.len());

    for (i, current) in points.iter().enumerate() {
        let mut sum = 0.0;
        let mut n = 0usize;
        for prev in points[..=i].iter().rev() {
            if days_between(prev.date, current.date) >= window {
                break; // older values are at the front; can stop early
            }
            sum += prev.value;
            n += 1;
        }
        // n >= 1: the current point is always inside its own window
        out.push(Point::new(current.date, sum / n as f64));
    }

    out
}

/// Present values of `metric` as an ascending point series.
pub fn series(records: &[UnifiedDailyRecord], metric: Metric) -> Vec<Point> {
    let mut points: Vec<Point> = records
        .iter()
        .filter_map(|r| r.get(metric).map(|s| Point::new(r.date, s.value())))
        .collect();
    points.sort_by_key(|p| p.date);
    points
}
