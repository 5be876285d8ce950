/// Application routes configuration
use crate::errors::ErrorResponse;
use crate::handlers::{
    ask_universe, get_celestial_snapshot, get_weekly_summary, health, post_celestial_snapshot,
    run_daily_update, trigger_daily_update, AppState,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::any::Any;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::error;

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Celestial snapshot
        .route(
            "/celestial-snapshot",
            get(get_celestial_snapshot).post(post_celestial_snapshot),
        )
        // Scheduled update trigger
        .route(
            "/cron/daily-update",
            get(run_daily_update).post(trigger_daily_update),
        )
        // Assistant
        .route("/ask-universe", post(ask_universe))
        .route("/weekly-summary", get(get_weekly_summary))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Panics become the generic 500 envelope; the payload only reaches the log
fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("Request could not be completed")),
    )
        .into_response()
}
