use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::health::HealthState;
use crate::api::latency::{LatencyStats, LatencySummary};
use crate::error::AppError;
use crate::ingest::keyword_from_file_name;
use crate::partition::SelectionStats;
use crate::report::{self, Insights, ListSelector};
use crate::state::{AnalysisResult, AnalysisSession, FileSummary, Settings, SettingsUpdate};
use crate::types::{RawRow, ScoredListing};

#[derive(Clone)]
pub struct ApiState {
    pub session: Arc<AnalysisSession>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

impl ApiState {
    pub fn new(session: Arc<AnalysisSession>) -> Self {
        Self {
            session,
            health: Arc::new(HealthState::new()),
            latency: Arc::new(LatencyStats::new()),
        }
    }

    /// Run one analysis pass and record its timing.
    fn analyze(&self) -> AnalysisResult {
        let start = Instant::now();
        let result = self.session.analyze();
        self.latency.record(start.elapsed());
        self.health.record_analysis(now_ms(), result.all_scored.len());
        result
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/files", get(get_files).post(add_file).delete(clear_files))
        .route("/files/:file_name", delete(remove_file))
        .route("/settings", get(get_settings).patch(update_settings))
        .route("/analysis", get(get_analysis))
        .route("/lists", get(get_lists))
        .route("/insights", get(get_insights))
        .route("/export/:list", get(export_list))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request structs
// ---------------------------------------------------------------------------

/// Upload one export, either as raw CSV text or as already-parsed rows.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFileRequest {
    pub file_name: String,
    pub keyword: Option<String>,
    pub csv: Option<String>,
    pub rows: Option<Vec<RawRow>>,
}

#[derive(Deserialize)]
pub struct RemoveFileQuery {
    pub keyword: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub files: usize,
    pub listings: usize,
    pub analyses: u64,
    pub last_analysis_at_ms: Option<u64>,
    pub last_analysis_listings: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearResponse {
    pub removed: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListsResponse {
    pub a_list: Vec<ScoredListing>,
    pub b_list: Vec<ScoredListing>,
    pub c_list: Vec<ScoredListing>,
    pub selection_stats: SelectionStats,
    pub settings: Settings,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let last = state.health.last_analysis_at_ms();
    Json(HealthResponse {
        status: "ok",
        files: state.session.file_count(),
        listings: state.session.listing_count(),
        analyses: state.health.analyses(),
        last_analysis_at_ms: (last > 0).then_some(last),
        last_analysis_listings: state.health.last_analysis_listings(),
    })
}

async fn get_files(State(state): State<ApiState>) -> Json<Vec<FileSummary>> {
    Json(state.session.files())
}

async fn add_file(
    State(state): State<ApiState>,
    Json(req): Json<AddFileRequest>,
) -> Result<(StatusCode, Json<FileSummary>), AppError> {
    let keyword = req.keyword.as_deref();
    let summary = match (req.csv, req.rows) {
        (Some(text), None) => state.session.add_csv_text(&req.file_name, keyword, &text)?,
        (None, Some(rows)) => state.session.add_rows(&req.file_name, keyword, &rows)?,
        _ => {
            return Err(AppError::InvalidUpload(
                "exactly one of `csv` or `rows` is required".to_string(),
            ))
        }
    };
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn clear_files(State(state): State<ApiState>) -> Json<ClearResponse> {
    Json(ClearResponse {
        removed: state.session.clear_all(),
    })
}

async fn remove_file(
    State(state): State<ApiState>,
    Path(file_name): Path<String>,
    Query(params): Query<RemoveFileQuery>,
) -> Result<Json<FileSummary>, AppError> {
    let keyword = params
        .keyword
        .filter(|k| !k.trim().is_empty())
        .unwrap_or_else(|| keyword_from_file_name(&file_name));
    Ok(Json(state.session.remove_file(&file_name, keyword.trim())?))
}

async fn get_settings(State(state): State<ApiState>) -> Json<Settings> {
    Json(state.session.settings())
}

async fn update_settings(
    State(state): State<ApiState>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<Settings>, AppError> {
    Ok(Json(state.session.update_settings(update)?))
}

async fn get_analysis(State(state): State<ApiState>) -> Json<AnalysisResult> {
    Json(state.analyze())
}

async fn get_lists(State(state): State<ApiState>) -> Json<ListsResponse> {
    let result = state.analyze();
    Json(ListsResponse {
        a_list: result.a_list,
        b_list: result.b_list,
        c_list: result.c_list,
        selection_stats: result.selection_stats,
        settings: result.settings,
    })
}

async fn get_insights(State(state): State<ApiState>) -> Json<Insights> {
    Json(report::insights(&state.analyze()))
}

async fn export_list(
    State(state): State<ApiState>,
    Path(list): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let selector: ListSelector = list.parse()?;
    let body = report::export_csv(&state.analyze(), selector)?;
    let disposition = format!("attachment; filename=\"{}\"", selector.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySummary> {
    Json(state.latency.summary())
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
