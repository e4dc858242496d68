use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use serde::Serialize;
use shuttle_axum::axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::aggregate::{self, PeriodSummary};
use crate::config::ReconcileConfig;
use crate::engine::SourceUsageReport;
use crate::metric::Metric;
use crate::pipeline::{self, RunOutput};
use crate::priority::PriorityTable;
use crate::record::UnifiedDailyRecord;
use crate::rolling::{self, Point};

const DEFAULT_SUMMARY_DAYS: u32 = 90;
const DEFAULT_WINDOW_DAYS: u32 = 7;

/// What the service currently serves. Replaced wholesale after each run.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub records: Vec<UnifiedDailyRecord>,
    /// `None` when the records were read back from a previous artifact.
    pub usage: Option<SourceUsageReport>,
    pub table: PriorityTable,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            usage: None,
            table: PriorityTable::default_seed(),
        }
    }
}

impl From<RunOutput> for Snapshot {
    fn from(run: RunOutput) -> Self {
        Self {
            records: run.reconciliation.records,
            usage: Some(run.reconciliation.usage),
            table: run.table,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    config: Arc<ReconcileConfig>,
    snapshot: Arc<RwLock<Snapshot>>,
    /// Held for a whole rerun; runs share the artifact's temp file.
    rerun: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(config: ReconcileConfig, snapshot: Snapshot) -> Self {
        Self {
            config: Arc::new(config),
            snapshot: Arc::new(RwLock::new(snapshot)),
            rerun: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn replace(&self, snapshot: Snapshot) {
        match self.snapshot.write() {
            Ok(mut g) => *g = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> T {
        match self.snapshot.read() {
            Ok(g) => f(&*g),
            Err(poisoned) => f(&*poisoned.into_inner()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/unified", get(unified_all))
        .route("/api/unified/{date}", get(unified_day))
        .route("/api/summary", get(summary))
        .route("/api/moving-average", get(moving_average))
        .route("/debug/source-usage", get(debug_source_usage))
        .route("/debug/priority", get(debug_priority))
        .route("/admin/reconcile", post(admin_reconcile))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

struct ApiError(StatusCode, String);

impl ApiError {
    fn bad_request(msg: impl Into<String>) -> Self {
        Self(StatusCode::BAD_REQUEST, msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

fn parse_metric(q: &HashMap<String, String>) -> Result<Metric, ApiError> {
    let raw = q
        .get("metric")
        .ok_or_else(|| ApiError::bad_request("missing 'metric'"))?;
    raw.parse::<Metric>()
        .map_err(|e| ApiError::bad_request(e.to_string()))
}

fn parse_u32(q: &HashMap<String, String>, key: &str, default: u32) -> Result<u32, ApiError> {
    match q.get(key) {
        None => Ok(default),
        Some(v) => v
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ApiError::bad_request(format!("'{key}' must be a positive integer"))),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request(format!("invalid date '{raw}', expected YYYY-MM-DD")))
}

#[derive(Serialize)]
struct UnifiedOut {
    data: Vec<UnifiedDailyRecord>,
}

async fn unified_all(State(state): State<AppState>) -> Json<UnifiedOut> {
    let data = state.read(|s| s.records.clone());
    Json(UnifiedOut { data })
}

async fn unified_day(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<UnifiedDailyRecord>, ApiError> {
    let date = parse_date(&raw)?;
    state
        .read(|s| {
            s.records
                .binary_search_by_key(&date, |r| r.date)
                .ok()
                .map(|i| s.records[i].clone())
        })
        .map(Json)
        .ok_or_else(|| ApiError(StatusCode::NOT_FOUND, format!("no record for {date}")))
}

async fn summary(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<PeriodSummary>, ApiError> {
    let metric = parse_metric(&q)?;
    let days = parse_u32(&q, "days", DEFAULT_SUMMARY_DAYS)?;
    let end = q.get("end").map(|s| parse_date(s)).transpose()?;

    state
        .read(|s| {
            let end = end.or_else(|| s.records.last().map(|r| r.date))?;
            Some(aggregate::period_summary(&s.records, metric, end, days))
        })
        .map(Json)
        .ok_or_else(|| ApiError(StatusCode::NOT_FOUND, "no unified records loaded".into()))
}

#[derive(Serialize)]
struct MovingAverageOut {
    metric: Metric,
    window_days: u32,
    points: Vec<Point>,
}

async fn moving_average(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<MovingAverageOut>, ApiError> {
    let metric = parse_metric(&q)?;
    let window_days = parse_u32(&q, "window", DEFAULT_WINDOW_DAYS)?;
    let points = state.read(|s| rolling::moving_average(&rolling::series(&s.records, metric), window_days));
    Ok(Json(MovingAverageOut {
        metric,
        window_days,
        points,
    }))
}

async fn debug_source_usage(State(state): State<AppState>) -> Json<Option<SourceUsageReport>> {
    Json(state.read(|s| s.usage.clone()))
}

async fn debug_priority(State(state): State<AppState>) -> Json<PriorityTable> {
    Json(state.read(|s| s.table.clone()))
}

#[derive(Serialize)]
struct ReconcileOut {
    days: usize,
    first: Option<NaiveDate>,
    last: Option<NaiveDate>,
}

async fn admin_reconcile(State(state): State<AppState>) -> Result<Json<ReconcileOut>, ApiError> {
    let _running = state.rerun.lock().await;
    let cfg = state.config.clone();
    let run = tokio::task::spawn_blocking(move || pipeline::run_once(&cfg))
        .await
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?;

    let records = &run.reconciliation.records;
    let out = ReconcileOut {
        days: records.len(),
        first: records.first().map(|r| r.date),
        last: records.last().map(|r| r.date),
    };
    state.replace(Snapshot::from(run));
    Ok(Json(out))
}
