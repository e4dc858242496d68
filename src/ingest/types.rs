// src/ingest/types.rs
use anyhow::Result;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::record::ProviderDay;
use crate::source::Source;

/// One provider's normalized output, keyed by provider-local calendar date.
pub type DailyMap = BTreeMap<NaiveDate, ProviderDay>;

/// Knobs shared by the normalizers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NormalizeOptions {
    /// Sleep that starts before this local hour belongs to the previous night.
    #[serde(default = "default_sleep_cutoff_hour")]
    pub sleep_cutoff_hour: u32,
    /// Minimum heart-rate samples before resting HR is estimated from them.
    #[serde(default = "default_resting_hr_min_samples")]
    pub resting_hr_min_samples: usize,
}

fn default_sleep_cutoff_hour() -> u32 {
    6
}

fn default_resting_hr_min_samples() -> usize {
    10
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            sleep_cutoff_hour: default_sleep_cutoff_hour(),
            resting_hr_min_samples: default_resting_hr_min_samples(),
        }
    }
}

/// Turns one provider's raw export into a [`DailyMap`].
///
/// Malformed structure is an error; individual unusable readings are dropped.
pub trait SourceNormalizer {
    fn normalize(&self, raw: &str) -> Result<DailyMap>;
    fn source(&self) -> Source;
}
