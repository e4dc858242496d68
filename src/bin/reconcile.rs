//! One-shot reconciliation: load the exports, merge, write the unified artifact, exit.
//!
//! Usage: `reconcile [CONFIG_PATH]`. Without an argument the usual lookup applies
//! (`RECONCILE_CONFIG_PATH`, then `config/reconcile.toml`, then defaults).

use std::process::ExitCode;

use health_reconciler::{run_once, ReconcileConfig, Source};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .compact()
        .init();

    let cfg = match std::env::args().nth(1) {
        Some(path) => ReconcileConfig::load_from_file(path),
        None => ReconcileConfig::load_default(),
    };
    let cfg = match cfg {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config error: {e:#}");
            return ExitCode::from(2);
        }
    };

    match run_once(&cfg) {
        Ok(run) => {
            let usage = &run.reconciliation.usage;
            println!(
                "wrote {} days to {}",
                run.reconciliation.records.len(),
                cfg.output_path.display()
            );
            for (metric, by_source) in &usage.resolved {
                let parts: Vec<String> = Source::ALL
                    .iter()
                    .filter_map(|s| by_source.get(s).map(|n| format!("{s}={n}")))
                    .collect();
                println!("  {:<28} {}", metric.as_str(), parts.join(" "));
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("reconciliation failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
