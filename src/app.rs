use axum::Router;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::routes::{notification_routes, system_routes};
use crate::state::app::AppState;

/// Build the complete Axum application:
/// - /notifications            (query + mutation)
/// - /notifications/subscribe  (live WebSocket feed)
/// - /system                   (alive + version + stats)
pub fn build_app(state: AppState) -> Router {
    Router::new()
        // /notifications/*
        .nest("/notifications", notification_routes::routes(state.clone()))

        // /system/*
        .nest("/system", system_routes::routes(state))

        // Logging middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
