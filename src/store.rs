//! # Unified store
//! Persists the reconciled sequence as `{ "data": [ ...records ] }`.
//!
//! Every run fully replaces the previous artifact (write to a temp file, then rename);
//! nothing is merged into what was on disk. The envelope is the contract consumed by
//! dashboards and reports, so changes to it must stay additive.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::record::UnifiedDailyRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedEnvelope {
    pub data: Vec<UnifiedDailyRecord>,
}

/// Serialize records to the artifact's JSON text.
pub fn to_json(records: &[UnifiedDailyRecord]) -> Result<String> {
    #[derive(Serialize)]
    struct Borrowed<'a> {
        data: &'a [UnifiedDailyRecord],
    }
    serde_json::to_string_pretty(&Borrowed { data: records }).context("serializing unified records")
}

/// Parse artifact JSON and check the ordering invariant.
pub fn from_json(s: &str) -> Result<Vec<UnifiedDailyRecord>> {
    let env: UnifiedEnvelope = serde_json::from_str(s).context("parsing unified artifact")?;
    ensure_sorted(&env.data)?;
    Ok(env.data)
}

/// Records must be strictly ascending by date.
pub fn ensure_sorted(records: &[UnifiedDailyRecord]) -> Result<()> {
    for pair in records.windows(2) {
        if pair[0].date >= pair[1].date {
            bail!(
                "unified records out of order or duplicated: {} then {}",
                pair[0].date,
                pair[1].date
            );
        }
    }
    Ok(())
}

/// Replace the artifact at `path` with `records`.
pub fn write_unified(path: &Path, records: &[UnifiedDailyRecord]) -> Result<()> {
    ensure_sorted(records)?;
    let json = to_json(records)?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    let replaced = fs::write(&tmp, json.as_bytes())
        .with_context(|| format!("writing {}", tmp.display()))
        .and_then(|()| {
            fs::rename(&tmp, path)
                .with_context(|| format!("replacing {} with {}", path.display(), tmp.display()))
        });
    if let Err(e) = replaced {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    tracing::info!(target: "store", path = %path.display(), days = records.len(), "unified artifact written");
    Ok(())
}

pub fn read_unified(path: &Path) -> Result<Vec<UnifiedDailyRecord>> {
    let s = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    from_json(&s).with_context(|| format!("in {}", path.display()))
}
