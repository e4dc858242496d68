//! # Reconciliation Engine
//! Pure, testable logic that maps per-source daily maps → unified daily records.
//! No I/O; the caller loads inputs before and persists outputs after.
//!
//! Policy: for every date in the union of all sources and every metric, walk the
//! metric's priority order and take the first source that has a present, valid
//! reading for that date. Nothing else (recency, magnitude) breaks ties.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::metric::Metric;
use crate::priority::{PriorityEntry, PriorityTable};
use crate::record::{ProviderDay, Sourced, UnifiedDailyRecord};
use crate::source::Source;

/// Per-source date-keyed inputs. A source with no file simply has no key (or an empty map).
pub type SourceMaps = BTreeMap<Source, BTreeMap<NaiveDate, ProviderDay>>;

/// How many days each source won, per metric. Diagnostic only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceUsageReport {
    pub days: usize,
    pub resolved: BTreeMap<Metric, BTreeMap<Source, usize>>,
    pub unresolved: BTreeMap<Metric, usize>,
}

impl SourceUsageReport {
    fn tally(&mut self, record: &UnifiedDailyRecord) {
        self.days += 1;
        for metric in Metric::ALL {
            match record.get(metric) {
                Some(s) => {
                    *self
                        .resolved
                        .entry(metric)
                        .or_default()
                        .entry(s.source())
                        .or_default() += 1
                }
                None => *self.unresolved.entry(metric).or_default() += 1,
            }
        }
    }

    /// Days `metric` was resolved by `source`.
    pub fn count(&self, metric: Metric, source: Source) -> usize {
        self.resolved
            .get(&metric)
            .and_then(|m| m.get(&source))
            .copied()
            .unwrap_or(0)
    }
}

/// Output of one full reconciliation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Strictly ascending by date, no duplicates.
    pub records: Vec<UnifiedDailyRecord>,
    pub usage: SourceUsageReport,
}

/// Merge all per-source maps into one unified sequence.
///
/// Fails only when the priority table is structurally incomplete.
pub fn reconcile(inputs: &SourceMaps, table: &PriorityTable) -> Result<Reconciliation> {
    table.validate().context("priority table rejected before merge")?;

    let dates: BTreeSet<NaiveDate> = inputs
        .values()
        .flat_map(|days| days.keys().copied())
        .collect();

    let mut usage = SourceUsageReport::default();
    let mut records = Vec::with_capacity(dates.len());
    for date in dates {
        let record = resolve_day(inputs, table, date);
        usage.tally(&record);
        records.push(record);
    }

    tracing::debug!(
        target: "engine",
        days = records.len(),
        sources = inputs.len(),
        "reconciliation complete"
    );

    Ok(Reconciliation { records, usage })
}

/// Resolve every metric for one date.
pub fn resolve_day(inputs: &SourceMaps, table: &PriorityTable, date: NaiveDate) -> UnifiedDailyRecord {
    let mut record = UnifiedDailyRecord::empty(date);
    for metric in Metric::ALL {
        if let Some(entry) = table.entry(metric) {
            *record.slot_mut(metric) = pick(inputs, entry, date);
        }
    }
    record
}

/// First source in `[primary, ...fallbacks]` with a present, valid reading.
fn pick(inputs: &SourceMaps, entry: &PriorityEntry, date: NaiveDate) -> Option<Sourced<f64>> {
    entry.order().find_map(|source| {
        let day = inputs.get(&source)?.get(&date)?;
        let value = day.reading(entry.metric)?;
        if !entry.metric.accepts(value) {
            return None;
        }
        Sourced::new(value, source)
    })
}
