//! Axum router configuration.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::server::handlers::{consume_note, create_note, live, preview_note, status};
use crate::state::AppState;

/// Slack on top of the configured payload limits for JSON framing,
/// field names, and policy fields in the request body.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Build the complete Axum router.
///
/// Routes:
/// - `POST   /api/notes` - Create a note
/// - `GET    /api/notes/{id}` - Preview note metadata without consuming
/// - `DELETE /api/notes/{id}` - Consume one view and fetch the contents
/// - `GET    /api/status` - Service limits and branding
/// - `GET    /api/live` - Store liveness probe
pub fn build_router(state: AppState) -> Router {
    // The axum default body cap is far below the configured note size
    // limit, so raise it; oversized notes are still rejected with a 413
    // by the size validation.
    let body_limit =
        state.config().size_limit_bytes + state.config().meta_limit_bytes + BODY_LIMIT_SLACK;

    Router::new()
        .nest("/api", api_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/live", get(live))
        .route("/notes", post(create_note))
        .route("/notes/{id}", get(preview_note).delete(consume_note))
}
