//! Health Reconciler Service: binary entrypoint
//! Runs one reconciliation at boot, then serves the unified record over Axum.
//!
//! See `README.md` for the data layout and `DESIGN.md` for module notes.

use health_reconciler::metrics::Metrics;
use health_reconciler::{bootstrap_snapshot, router, AppState, ReconcileConfig};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs, filtered by `RUST_LOG` (default `info`).
/// `RECONCILE_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("RECONCILE_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    // Shuttle may already have installed a subscriber; keep theirs if so.
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = ReconcileConfig::load_default().map_err(shuttle_runtime::Error::Custom)?;
    let metrics = Metrics::init().map_err(shuttle_runtime::Error::Custom)?;

    let boot_cfg = cfg.clone();
    let snapshot = tokio::task::spawn_blocking(move || bootstrap_snapshot(&boot_cfg))
        .await
        .map_err(|e| shuttle_runtime::Error::Custom(e.into()))?;
    tracing::info!(days = snapshot.records.len(), "serving unified records");

    let state = AppState::new(cfg, snapshot);
    let app = router(state).merge(metrics.router());

    Ok(app.into())
}
