use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crate::errors::{NotifyError, Result};
use crate::routes::subscription_routes;
use crate::state::app::AppState;
use crate::state::notifications::Notification;

/// Build all notification routes under /notifications
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_notifications).post(push_notification))
        .route("/subscribe", get(subscription_routes::new_notification))
        .with_state(state)
}

//
// ─────────────────────────────────────────────────────────────
// GET /notifications
// Full history, oldest first
// ─────────────────────────────────────────────────────────────
//
async fn list_notifications(State(state): State<AppState>) -> Json<Vec<Arc<Notification>>> {
    Json(state.gateway.notifications())
}

//
// ─────────────────────────────────────────────────────────────
// POST /notifications
// Body: { "label": "..." }; returns the stored notification
// Malformed bodies get the same 400 {"error": ...} as a bad label
// ─────────────────────────────────────────────────────────────
//
async fn push_notification(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Arc<Notification>>> {
    let Json(payload) =
        payload.map_err(|rejection| NotifyError::validation(rejection.body_text()))?;
    let label = extract_label(&payload)?;
    let notification = state.gateway.push_notification(label)?;
    Ok(Json(notification))
}

fn extract_label(payload: &Value) -> Result<&str> {
    match payload.get("label") {
        Some(Value::String(label)) => Ok(label.as_str()),
        Some(_) => Err(NotifyError::validation("label must be a string")),
        None => Err(NotifyError::validation("label is required")),
    }
}
