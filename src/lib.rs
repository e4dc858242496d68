// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod engine;
pub mod ingest;
pub mod metric;
pub mod metrics;
pub mod pipeline;
pub mod priority;
pub mod record;
pub mod rolling;
pub mod source;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState, Snapshot};
pub use crate::config::ReconcileConfig;
pub use crate::engine::{reconcile, Reconciliation, SourceMaps, SourceUsageReport};
pub use crate::metric::Metric;
pub use crate::pipeline::{run_once, RunOutput};
pub use crate::priority::{PriorityEntry, PriorityTable};
pub use crate::record::{Sourced, UnifiedDailyRecord};
pub use crate::source::Source;

use tracing::warn;

/// Initial state for the service: a fresh run when the sources load, otherwise the last
/// artifact on disk, otherwise nothing. Never fails; the reason is logged.
pub fn bootstrap_snapshot(cfg: &ReconcileConfig) -> Snapshot {
    match pipeline::run_once(cfg) {
        Ok(run) => Snapshot::from(run),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "initial reconciliation failed, trying previous artifact");
            match store::read_unified(&cfg.output_path) {
                Ok(records) => Snapshot {
                    records,
                    table: active_table(cfg),
                    ..Snapshot::empty()
                },
                Err(e) => {
                    warn!(error = %format!("{e:#}"), "no previous artifact, serving empty data");
                    Snapshot::empty()
                }
            }
        }
    }
}

/// The table a run with `cfg` would use; the built-in seed if the overrides are unreadable.
fn active_table(cfg: &ReconcileConfig) -> PriorityTable {
    PriorityTable::load_or_default(&cfg.priority_table_path).unwrap_or_else(|e| {
        warn!(error = %format!("{e:#}"), "priority overrides unreadable, reporting built-in table");
        PriorityTable::default_seed()
    })
}
