//! REST API handlers
//!
//! Every analysis route accepts a JSON body and answers with an
//! [`ApiResponse`] envelope. Blank keywords are rejected with 400; day and
//! month parameters are clamped rather than rejected.

use std::time::Instant;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::AppState;
use crate::error::{Error, RadarErrorTrait};
use crate::metrics;
use crate::models::{MultiPortalResult, RecommendationCandidate};
use crate::utils::normalize_keyword;
use crate::storage::Exporter;

// ============================================================================
// API Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub notion_connected: bool,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub keyword: String,
    pub filename: String,
    pub message: String,
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct KeywordRequest {
    pub keyword: String,
}

#[derive(Debug, Deserialize)]
pub struct KeywordsRequest {
    pub keywords: Vec<String>,
    #[serde(default)]
    pub channel_topic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompetitorRequest {
    pub competitor_keywords: Vec<String>,
    pub your_keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrendRequest {
    pub keyword: String,
    #[serde(default)]
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PredictionRequest {
    pub keyword: String,
    #[serde(default)]
    pub months: Option<u32>,
}

// ============================================================================
// API Routes
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/metrics", get(prometheus_metrics))
        // Keyword analysis
        .route("/api/analyze", post(analyze))
        .route("/api/compare", post(compare))
        .route("/api/short-long-analysis", post(short_long))
        .route("/api/recommendations", post(recommendations))
        .route("/api/competitor-analysis", post(competitor_analysis))
        .route("/api/search-intent", post(search_intent))
        // Performance and trends
        .route("/api/trend-analysis", post(trend_analysis))
        .route("/api/seasonality", post(seasonality))
        .route("/api/prediction", post(prediction))
        .route("/api/export", post(export))
        .with_state(state)
}

/// Wrap an operation result and record the request
fn respond<T: Serialize>(
    endpoint: &str,
    started: Instant,
    result: Result<T, Error>,
) -> Response {
    let (status, response) = match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::success(data)).into_response()),
        Err(e) => {
            let status = match &e {
                Error::Validation(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            if status.is_server_error() {
                warn!(endpoint, kind = e.kind(), error = %e, "Request failed");
            }
            (status, Json(ApiResponse::error(e.to_string())).into_response())
        }
    };

    metrics::record_api_request(endpoint, status.as_u16(), started.elapsed().as_secs_f64());
    (status, response).into_response()
}

// ============================================================================
// Service Handlers
// ============================================================================

async fn root(State(state): State<AppState>) -> impl IntoResponse {
    #[derive(Serialize)]
    struct RootResponse {
        name: &'static str,
        version: &'static str,
        notion_integration: &'static str,
    }

    Json(ApiResponse::success(RootResponse {
        name: "keyword-radar API",
        version: env!("CARGO_PKG_VERSION"),
        notion_integration: if state.store_connected() {
            "enabled"
        } else {
            "disabled"
        },
    }))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        notion_connected: state.store_connected(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    }))
}

async fn prometheus_metrics() -> Response {
    match metrics::encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(e.to_string())),
        )
            .into_response(),
    }
}

// ============================================================================
// Background Sync
// ============================================================================

fn spawn_keyword_sync(state: &AppState, result: &MultiPortalResult) {
    let Some(sync) = state.sync.clone() else {
        return;
    };
    let result = result.clone();

    tokio::spawn(async move {
        match sync.sync_keyword_analysis(&result).await {
            Ok(outcome) => info!(
                keyword = %result.keyword,
                page_id = %outcome.page_id,
                created = outcome.created,
                "Synced keyword analysis"
            ),
            Err(e) => warn!(keyword = %result.keyword, error = %e, "Keyword sync failed"),
        }
    });
}

/// Attach recommendations to the base keyword's page
///
/// An existing page is reused as is. Otherwise the base keyword is estimated
/// again without a history record and upserted first.
fn spawn_recommendation_sync(
    state: &AppState,
    base_keyword: String,
    candidates: Vec<RecommendationCandidate>,
) {
    let Some(sync) = state.sync.clone() else {
        return;
    };
    let analyzer = state.analyzer.clone();

    tokio::spawn(async move {
        let report = match sync.get_keyword_analysis(&base_keyword).await {
            Ok(Some(page)) => Ok(sync
                .batch_add_recommendations(&page.id, &candidates, None)
                .await),
            Ok(None) => match analyzer.estimate_multi_portal(&base_keyword).await {
                Ok(base) => sync.sync_recommendations(&base, &candidates, None).await,
                Err(e) => {
                    warn!(keyword = %base_keyword, error = %e, "Recommendation sync skipped");
                    return;
                }
            },
            Err(e) => Err(e),
        };

        match report {
            Ok(report) => info!(
                keyword = %base_keyword,
                succeeded = report.succeeded,
                failed = report.failed.len(),
                "Synced recommendations"
            ),
            Err(e) => warn!(keyword = %base_keyword, error = %e, "Recommendation sync failed"),
        }
    });
}

// ============================================================================
// Analysis Handlers
// ============================================================================

async fn analyze(State(state): State<AppState>, Json(request): Json<KeywordRequest>) -> Response {
    let started = Instant::now();
    let result = state.analyzer.analyze_multi_portal(&request.keyword).await;
    if let Ok(analysis) = &result {
        spawn_keyword_sync(&state, analysis);
    }
    respond("/api/analyze", started, result)
}

async fn compare(State(state): State<AppState>, Json(request): Json<KeywordsRequest>) -> Response {
    let started = Instant::now();
    respond(
        "/api/compare",
        started,
        state.analyzer.compare_keywords(&request.keywords),
    )
}

async fn short_long(
    State(state): State<AppState>,
    Json(request): Json<KeywordRequest>,
) -> Response {
    let started = Instant::now();
    respond(
        "/api/short-long-analysis",
        started,
        state.analyzer.analyze_short_long(&request.keyword),
    )
}

async fn recommendations(
    State(state): State<AppState>,
    Json(request): Json<KeywordsRequest>,
) -> Response {
    let started = Instant::now();
    let result = state
        .analyzer
        .recommendations(&request.keywords, request.channel_topic.as_deref());

    if let Ok(candidates) = &result {
        if let Some(base) = request
            .keywords
            .iter()
            .find_map(|k| normalize_keyword(k).ok())
        {
            spawn_recommendation_sync(&state, base, candidates.clone());
        }
    }
    respond("/api/recommendations", started, result)
}

async fn competitor_analysis(
    State(state): State<AppState>,
    Json(request): Json<CompetitorRequest>,
) -> Response {
    let started = Instant::now();
    let result = state
        .analyzer
        .competitor_gap(&request.competitor_keywords, &request.your_keywords);
    respond("/api/competitor-analysis", started, Ok(result))
}

async fn search_intent(
    State(state): State<AppState>,
    Json(request): Json<KeywordRequest>,
) -> Response {
    let started = Instant::now();
    respond(
        "/api/search-intent",
        started,
        state.analyzer.search_intent(&request.keyword),
    )
}

async fn trend_analysis(
    State(state): State<AppState>,
    Json(request): Json<TrendRequest>,
) -> Response {
    let started = Instant::now();
    respond(
        "/api/trend-analysis",
        started,
        state.analyzer.trend_analysis(&request.keyword, request.days),
    )
}

async fn seasonality(
    State(state): State<AppState>,
    Json(request): Json<KeywordRequest>,
) -> Response {
    let started = Instant::now();
    respond(
        "/api/seasonality",
        started,
        state.analyzer.seasonality(&request.keyword),
    )
}

async fn prediction(
    State(state): State<AppState>,
    Json(request): Json<PredictionRequest>,
) -> Response {
    let started = Instant::now();
    respond(
        "/api/prediction",
        started,
        state.analyzer.predict(&request.keyword, request.months),
    )
}

async fn export(State(state): State<AppState>, Json(request): Json<KeywordRequest>) -> Response {
    let started = Instant::now();

    let result = async {
        let analysis = state.analyzer.analyze_multi_portal(&request.keyword).await?;
        let filename = Exporter::default_file_name(&analysis.keyword, Utc::now());
        let path = state.exporter.export_json(&analysis, &filename)?;
        Ok::<_, Error>(ExportResponse {
            message: format!("Analysis exported to {}", path.display()),
            keyword: analysis.keyword,
            filename,
        })
    }
    .await;

    respond("/api/export", started, result)
}
