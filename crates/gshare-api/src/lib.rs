//! gshare-api — REST API for the share engine.
//!
//! Exposes the scheduler-facing operations over HTTP: task classification,
//! leaf validation, and leaf ordering by under-pledge, plus read access to
//! the tree and the current distribution.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/shares` | Normalized share tree |
//! | GET | `/api/v1/leaves` | Leaf shares in tree order |
//! | GET | `/api/v1/leaves/sorted` | Leaf shares by under-pledge (`?refresh=false` to skip the refresh) |
//! | GET | `/api/v1/leaves/{name}/valid` | Whether `name` is a leaf share |
//! | POST | `/api/v1/classify` | Share for a task descriptor |
//! | GET | `/api/v1/distribution` | Current usage distribution |
//! | POST | `/api/v1/refresh` | Refresh the usage distribution |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use gshare_engine::ShareEngine;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<ShareEngine>,
}

/// Build the complete API router (REST + metrics).
pub fn build_router(engine: Arc<ShareEngine>) -> Router {
    let api_state = ApiState { engine };

    let api_routes = Router::new()
        .route("/shares", get(handlers::get_tree))
        .route("/leaves", get(handlers::list_leaves))
        .route("/leaves/sorted", get(handlers::sorted_leaves))
        .route("/leaves/{name}/valid", get(handlers::validate_leaf))
        .route("/classify", post(handlers::classify_task))
        .route("/distribution", get(handlers::get_distribution))
        .route("/refresh", post(handlers::refresh_distribution))
        .with_state(api_state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::prometheus_metrics).with_state(api_state))
}
