//! # Pipeline
//! Boundary orchestration for one full run: load the priority table, load every
//! source (fail fast on malformed input), reconcile, replace the persisted artifact.
//! All I/O happens here, before and after the pure engine call.

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;

use crate::config::ReconcileConfig;
use crate::engine::{self, Reconciliation};
use crate::ingest;
use crate::priority::PriorityTable;
use crate::store;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("reconcile_runs_total", "Completed reconciliation runs.");
        describe_counter!("reconcile_failures_total", "Reconciliation runs that aborted.");
        describe_counter!("reconcile_days_total", "Unified days produced across runs.");
        describe_counter!(
            "reconcile_metric_source_total",
            "Days on which a source supplied a metric's value."
        );
        describe_gauge!(
            "reconcile_last_run_ts",
            "Unix ts when reconciliation last completed."
        );
    });
}

/// Everything one run produced, including the table it ranked with.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub table: PriorityTable,
    pub reconciliation: Reconciliation,
}

/// Load, merge and persist. Returns the merged result for callers that also serve it.
pub fn run_once(cfg: &ReconcileConfig) -> Result<RunOutput> {
    ensure_metrics_described();
    match run_inner(cfg) {
        Ok(out) => {
            counter!("reconcile_runs_total").increment(1);
            Ok(out)
        }
        Err(e) => {
            counter!("reconcile_failures_total").increment(1);
            tracing::error!(target: "pipeline", error = %format!("{e:#}"), "reconciliation aborted");
            Err(e)
        }
    }
}

fn run_inner(cfg: &ReconcileConfig) -> Result<RunOutput> {
    let table = PriorityTable::load_or_default(&cfg.priority_table_path)
        .context("loading source priority table")?;
    let inputs = ingest::load_all(cfg).context("loading source exports")?;
    let out = engine::reconcile(&inputs, &table)?;
    store::write_unified(&cfg.output_path, &out.records)?;

    counter!("reconcile_days_total").increment(out.records.len() as u64);
    for (metric, by_source) in &out.usage.resolved {
        for (source, days) in by_source {
            counter!(
                "reconcile_metric_source_total",
                "metric" => metric.as_str(),
                "source" => source.as_str()
            )
            .increment(*days as u64);
        }
    }
    gauge!("reconcile_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

    tracing::info!(
        target: "pipeline",
        days = out.records.len(),
        first = ?out.records.first().map(|r| r.date),
        last = ?out.records.last().map(|r| r.date),
        output = %cfg.output_path.display(),
        "reconciliation finished"
    );
    Ok(RunOutput {
        table,
        reconciliation: out,
    })
}
