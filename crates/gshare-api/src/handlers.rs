//! REST API handlers.
//!
//! Each handler reads from the shared `ShareEngine` and returns JSON
//! responses.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::debug;

use gshare_core::{TaskDescriptor, UNDEFINED_SHARE};
use gshare_engine::EngineError;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

// ── Tree ───────────────────────────────────────────────────────

/// GET /api/v1/shares
pub async fn get_tree(State(state): State<ApiState>) -> impl IntoResponse {
    let root = state.engine.tree().root();
    ApiResponse::ok(root).into_response()
}

/// GET /api/v1/leaves
pub async fn list_leaves(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.engine.leaf_names()).into_response()
}

/// Query string for the sorted leaves endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct SortedQuery {
    #[serde(default = "default_refresh")]
    pub refresh: bool,
}

fn default_refresh() -> bool {
    true
}

/// GET /api/v1/leaves/sorted
pub async fn sorted_leaves(
    State(state): State<ApiState>,
    Query(query): Query<SortedQuery>,
) -> impl IntoResponse {
    let leaves = state.engine.sorted_leaves(query.refresh).await;
    ApiResponse::ok(leaves).into_response()
}

/// GET /api/v1/leaves/:name/valid
pub async fn validate_leaf(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let valid = state.engine.is_valid_leaf(&name);
    ApiResponse::ok(serde_json::json!({
        "share": name,
        "valid": valid,
    }))
    .into_response()
}

// ── Classification ─────────────────────────────────────────────

/// POST /api/v1/classify
pub async fn classify_task(
    State(state): State<ApiState>,
    Json(task): Json<TaskDescriptor>,
) -> impl IntoResponse {
    let share = state.engine.classify(&task);
    debug!(%share, source_label = %task.source_label, "task classified");
    ApiResponse::ok(serde_json::json!({
        "share": share,
        "classified": share != UNDEFINED_SHARE,
    }))
    .into_response()
}

// ── Distribution ───────────────────────────────────────────────

/// GET /api/v1/distribution
pub async fn get_distribution(State(state): State<ApiState>) -> impl IntoResponse {
    let distribution = state.engine.distribution().await;
    ApiResponse::ok(&*distribution).into_response()
}

/// POST /api/v1/refresh
pub async fn refresh_distribution(State(state): State<ApiState>) -> impl IntoResponse {
    match state.engine.refresh().await {
        Ok(distribution) => ApiResponse::ok(*distribution.totals()).into_response(),
        Err(e @ EngineError::DataUnavailable(_)) => {
            error_response(&e.to_string(), StatusCode::SERVICE_UNAVAILABLE).into_response()
        }
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

// ── Prometheus ─────────────────────────────────────────────────

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let distribution = state.engine.distribution().await;
    let body = gshare_metrics::render_prometheus(
        state.engine.tree(),
        &distribution,
        &state.engine.stats(),
    );
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
