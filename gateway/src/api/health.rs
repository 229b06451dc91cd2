//! Welcome and health check endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health))
}

/// GET / - Welcome message.
async fn welcome() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Clinical Test Prediction API" }))
}

/// GET /health - Liveness plus the adapter slots this instance can route to.
///
/// Backends are not probed; an unreachable model shows up as
/// `model_unavailable` on the request that needs it.
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "adapters": state.gateway.adapters().configured(),
    }))
}
