//! # Source Priority Table
//!
//! Static per-metric ranking of which provider's reading wins.
//!
//! - One entry per unified metric: `primary` source, ordered `fallbacks`, `rationale`.
//! - The walk order for a metric is `[primary, ...fallbacks]`; unlisted sources are never consulted.
//! - Built-in `default_seed()` encodes the measurement-fidelity ranking (ring for sleep and
//!   overnight physiology, watch for daytime activity).
//! - Optional TOML overrides replace seed entries metric by metric.
//! - `validate()` rejects gaps and duplicates; it runs at load time and before every merge.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fs, path::Path};

use crate::metric::Metric;
use crate::source::Source;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityEntry {
    pub metric: Metric,
    pub primary: Source,
    #[serde(default)]
    pub fallbacks: Vec<Source>,
    #[serde(default)]
    pub rationale: String,
}

impl PriorityEntry {
    pub fn new(metric: Metric, primary: Source, fallbacks: &[Source], rationale: &str) -> Self {
        Self {
            metric,
            primary,
            fallbacks: fallbacks.to_vec(),
            rationale: rationale.to_string(),
        }
    }

    /// `[primary, ...fallbacks]`.
    pub fn order(&self) -> impl Iterator<Item = Source> + '_ {
        std::iter::once(self.primary).chain(self.fallbacks.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityTable {
    #[serde(rename = "priority")]
    entries: Vec<PriorityEntry>,
}

/// TOML override file shape: `[[priority]]` tables.
#[derive(Debug, Deserialize)]
struct PriorityFile {
    #[serde(default)]
    priority: Vec<PriorityEntry>,
}

impl PriorityTable {
    /// Build a table and check that it is complete.
    pub fn new(entries: Vec<PriorityEntry>) -> Result<Self> {
        let table = Self { entries };
        table.validate()?;
        Ok(table)
    }

    pub fn entries(&self) -> &[PriorityEntry] {
        &self.entries
    }

    pub fn entry(&self, metric: Metric) -> Option<&PriorityEntry> {
        self.entries.iter().find(|e| e.metric == metric)
    }

    /// Every unified metric must have exactly one entry, and no entry may list a source twice.
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for e in &self.entries {
            if !seen.insert(e.metric) {
                bail!("duplicate priority entry for metric {}", e.metric);
            }
            let mut sources = BTreeSet::new();
            for s in e.order() {
                if !sources.insert(s) {
                    bail!("priority entry for {} lists source {} twice", e.metric, s);
                }
            }
        }
        let missing: Vec<&str> = Metric::ALL
            .iter()
            .filter(|m| !seen.contains(*m))
            .map(|m| m.as_str())
            .collect();
        if !missing.is_empty() {
            bail!("priority table has no entry for: {}", missing.join(", "));
        }
        Ok(())
    }

    /// Load overrides from a TOML file and apply them on top of the seed.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading priority table from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing priority table {}", path.display()))
    }

    /// Load from `path` if it exists, otherwise use the built-in seed.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "no priority overrides, using built-in table");
            Ok(Self::default_seed())
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: PriorityFile = toml::from_str(s)?;
        let mut table = Self::default_seed();
        let mut overridden = BTreeSet::new();
        for entry in file.priority {
            if !overridden.insert(entry.metric) {
                bail!("metric {} overridden twice", entry.metric);
            }
            table.entries.retain(|e| e.metric != entry.metric);
            table.entries.push(entry);
        }
        table.entries.sort_by_key(|e| e.metric);
        table.validate()?;
        Ok(table)
    }

    /// Built-in ranking based on how each provider measures.
    pub fn default_seed() -> Self {
        use Metric::*;
        use Source::*;

        const WATCH_DAYTIME: &str =
            "wrist device is worn all day and has GPS for daytime activity counts";
        const RING_NIGHT: &str =
            "ring measures continuously overnight with a stable sensor position";
        const RING_ONLY: &str = "only the ring reports this metric";
        const WATCH_ONLY: &str = "only the watch reports this metric";

        let entries = vec![
            PriorityEntry::new(Steps, Apple, &[Oura], WATCH_DAYTIME),
            PriorityEntry::new(ActiveCalories, Apple, &[Oura, Strava], WATCH_DAYTIME),
            PriorityEntry::new(DistanceKm, Apple, &[Strava, Oura], WATCH_DAYTIME),
            PriorityEntry::new(ExerciseMinutes, Apple, &[Strava, Oura], WATCH_DAYTIME),
            PriorityEntry::new(RestingHr, Oura, &[Apple], RING_NIGHT),
            PriorityEntry::new(
                AvgHr,
                Apple,
                &[Oura, Strava],
                "continuous daytime wear gives the most representative daily mean",
            ),
            PriorityEntry::new(Hrv, Oura, &[Apple], RING_NIGHT),
            PriorityEntry::new(SleepMinutes, Oura, &[Apple], RING_NIGHT),
            PriorityEntry::new(SleepScore, Oura, &[], RING_ONLY),
            PriorityEntry::new(DeepSleepMinutes, Oura, &[Apple], RING_NIGHT),
            PriorityEntry::new(RemSleepMinutes, Oura, &[Apple], RING_NIGHT),
            PriorityEntry::new(LightSleepMinutes, Oura, &[Apple], RING_NIGHT),
            PriorityEntry::new(AwakeMinutes, Oura, &[Apple], RING_NIGHT),
            PriorityEntry::new(SleepEfficiency, Oura, &[Apple], RING_NIGHT),
            PriorityEntry::new(RespiratoryRate, Oura, &[Apple], RING_NIGHT),
            PriorityEntry::new(Spo2, Oura, &[Apple], RING_NIGHT),
            PriorityEntry::new(BreathingDisturbanceIndex, Oura, &[], RING_ONLY),
            PriorityEntry::new(ReadinessScore, Oura, &[], RING_ONLY),
            PriorityEntry::new(TemperatureDeviation, Oura, &[], RING_ONLY),
            PriorityEntry::new(Vo2Max, Apple, &[], WATCH_ONLY),
            PriorityEntry::new(WristTemperature, Apple, &[], WATCH_ONLY),
        ];

        Self { entries }
    }
}
