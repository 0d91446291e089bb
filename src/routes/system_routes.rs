use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde_json::json;

use crate::services::gateway::GatewayStats;
use crate::state::app::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/alive", get(is_alive))
        .route("/version", get(version))
        .route("/stats", get(stats))
        .with_state(state)
}

/// GET /system/alive
async fn is_alive() -> &'static str {
    "OK"
}

/// GET /system/version
async fn version(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "version": state.config.server_version
    }))
}

/// GET /system/stats
async fn stats(State(state): State<AppState>) -> Json<GatewayStats> {
    Json(state.gateway.stats())
}
