// src/config/mod.rs
pub mod reconcile;

pub use reconcile::{ReconcileConfig, SourcePaths};
