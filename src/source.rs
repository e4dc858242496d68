//! # Sources
//!
//! Identifiers for the providers that feed the reconciler.
//! The string form (`apple`, `oura`, `strava`) is what lands in the persisted
//! artifact as the `source` tag of every value, so it must stay stable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A data provider. Ordering is only used for deterministic map iteration,
/// never for merge precedence (that lives in the priority table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Wrist-worn watch, Apple Health `export.xml`.
    Apple,
    /// Ring tracker, Oura JSON export.
    Oura,
    /// Fitness-tracking service, Strava activity list.
    Strava,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Apple, Source::Oura, Source::Strava];

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Apple => "apple",
            Source::Oura => "oura",
            Source::Strava => "strava",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "apple" | "apple_health" => Ok(Source::Apple),
            "oura" => Ok(Source::Oura),
            "strava" => Ok(Source::Strava),
            other => anyhow::bail!("unknown source: {other}"),
        }
    }
}
