// src/config/reconcile.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::ingest::types::NormalizeOptions;
use crate::source::Source;

pub const DEFAULT_CONFIG_PATH: &str = "config/reconcile.toml";
pub const ENV_CONFIG_PATH: &str = "RECONCILE_CONFIG_PATH";

const ENV_APPLE: &str = "APPLE_EXPORT_PATH";
const ENV_OURA: &str = "OURA_EXPORT_PATH";
const ENV_STRAVA: &str = "STRAVA_EXPORT_PATH";
const ENV_OUTPUT: &str = "UNIFIED_OUTPUT_PATH";
const ENV_PRIORITY: &str = "PRIORITY_TABLE_PATH";
const ENV_CUTOFF: &str = "SLEEP_CUTOFF_HOUR";

fn default_apple() -> Option<PathBuf> {
    Some(PathBuf::from("data/apple_health/export.xml"))
}
fn default_oura() -> Option<PathBuf> {
    Some(PathBuf::from("data/oura/export.json"))
}
fn default_strava() -> Option<PathBuf> {
    Some(PathBuf::from("data/strava/activities.json"))
}
fn default_output_path() -> PathBuf {
    PathBuf::from("data/unified.json")
}
fn default_priority_table_path() -> PathBuf {
    PathBuf::from("config/source_priority.toml")
}

/// Where each provider's export lives. A missing file means "no days from that source".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourcePaths {
    #[serde(default = "default_apple")]
    pub apple: Option<PathBuf>,
    #[serde(default = "default_oura")]
    pub oura: Option<PathBuf>,
    #[serde(default = "default_strava")]
    pub strava: Option<PathBuf>,
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self {
            apple: default_apple(),
            oura: default_oura(),
            strava: default_strava(),
        }
    }
}

impl SourcePaths {
    pub fn get(&self, source: Source) -> Option<&Path> {
        match source {
            Source::Apple => self.apple.as_deref(),
            Source::Oura => self.oura.as_deref(),
            Source::Strava => self.strava.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default)]
    pub sources: SourcePaths,
    /// Unified artifact, fully replaced on every run.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// Optional TOML overrides for the built-in priority table.
    #[serde(default = "default_priority_table_path")]
    pub priority_table_path: PathBuf,
    #[serde(default)]
    pub normalize: NormalizeOptions,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            sources: SourcePaths::default(),
            output_path: default_output_path(),
            priority_table_path: default_priority_table_path(),
            normalize: NormalizeOptions::default(),
        }
    }
}

impl ReconcileConfig {
    /// Load from an explicit TOML file, then apply env overrides.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: ReconcileConfig =
            toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
        cfg.with_env_overrides()
    }

    /// Load using env var + fallbacks:
    /// 1) $RECONCILE_CONFIG_PATH
    /// 2) config/reconcile.toml
    /// 3) built-in defaults
    ///
    /// Individual env vars override whatever the file said.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from_file(&fallback);
        }
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(p) = env_path(ENV_APPLE) {
            self.sources.apple = Some(p);
        }
        if let Some(p) = env_path(ENV_OURA) {
            self.sources.oura = Some(p);
        }
        if let Some(p) = env_path(ENV_STRAVA) {
            self.sources.strava = Some(p);
        }
        if let Some(p) = env_path(ENV_OUTPUT) {
            self.output_path = p;
        }
        if let Some(p) = env_path(ENV_PRIORITY) {
            self.priority_table_path = p;
        }
        if let Ok(raw) = env::var(ENV_CUTOFF) {
            self.normalize.sleep_cutoff_hour = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_CUTOFF} must be an hour, got '{raw}'"))?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.normalize.sleep_cutoff_hour > 23 {
            bail!(
                "sleep_cutoff_hour must be within 0..=23, got {}",
                self.normalize.sleep_cutoff_hour
            );
        }
        if self.normalize.resting_hr_min_samples == 0 {
            bail!("resting_hr_min_samples must be at least 1");
        }
        Ok(())
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_fields_default_individually() {
        let cfg: ReconcileConfig = toml::from_str(
            r#"
output_path = "out/unified.json"

[sources]
oura = "exports/oura.json"

[normalize]
sleep_cutoff_hour = 5
"#,
        )
        .unwrap();
        assert_eq!(cfg.output_path, PathBuf::from("out/unified.json"));
        assert_eq!(cfg.sources.oura, Some(PathBuf::from("exports/oura.json")));
        assert_eq!(cfg.sources.apple, default_apple());
        assert_eq!(cfg.normalize.sleep_cutoff_hour, 5);
        assert_eq!(cfg.normalize.resting_hr_min_samples, 10);
    }

    #[test]
    fn cutoff_hour_out_of_range_is_rejected() {
        let mut cfg = ReconcileConfig::default();
        cfg.normalize.sleep_cutoff_hour = 24;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn source_paths_lookup() {
        let p = SourcePaths {
            apple: None,
            ..Default::default()
        };
        assert!(p.get(Source::Apple).is_none());
        assert!(p.get(Source::Oura).is_some());
    }
}
