//! HTTP API handlers.
//!
//! Handlers stay thin: resolve the caller's identity, spend a rate-limit
//! slot, and delegate to the note store. Every store call goes through a
//! boundary timeout so a stalled store surfaces as 503 instead of a
//! hanging request.

use std::future::Future;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::NoteError;
use crate::notes::{CreateNoteRequest, NoteContents, NotePreview};
use crate::rate_limit::RateLimitAction;
use crate::server::client_ip::ClientIp;
use crate::state::AppState;

/// Response for `POST /api/notes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteResult {
    /// Identifier under which the note can be retrieved.
    pub id: String,
}

/// Response for `GET /api/status`: limits and branding a client needs
/// before talking to the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResult {
    /// Service version.
    pub version: String,
    /// Maximum note contents size in bytes.
    pub max_size: usize,
    /// Largest accepted view count.
    pub max_views: u32,
    /// Longest accepted expiration in minutes.
    pub max_expiration: u32,
    /// Whether creators may pick view counts and expirations.
    pub allow_advanced: bool,
    /// Whether clients may attach file payloads.
    pub allow_files: bool,
    /// Link to a legal-notice page.
    pub imprint_url: String,
    /// Inline legal-notice HTML.
    pub imprint_html: String,
    /// Logo image URL.
    pub theme_image: String,
    /// Tagline shown under the logo.
    pub theme_text: String,
    /// Browser page title.
    pub theme_page_title: String,
    /// Favicon URL.
    pub theme_favicon: String,
}

/// Response for `GET /api/live`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveResult {
    /// True when the store answered the probe.
    pub ok: bool,
}

/// `POST /api/notes`: validate and persist a new note.
pub async fn create_note(
    State(state): State<AppState>,
    client: ClientIp,
    Json(request): Json<CreateNoteRequest>,
) -> Result<Json<CreateNoteResult>, (StatusCode, String)> {
    create_note_inner(&state, client, request)
        .await
        .map(Json)
        .map_err(|err| (map_note_status(&err), err.to_string()))
}

async fn create_note_inner(
    state: &AppState,
    ClientIp(client): ClientIp,
    request: CreateNoteRequest,
) -> Result<CreateNoteResult, NoteError> {
    enforce_limit(
        state,
        &client,
        RateLimitAction::Create,
        state.config().rate_limit_create_per_minute,
    )
    .await?;

    let views = request.views;
    let expiration = request.expiration;
    let id = with_store_timeout(state, state.notes().create(request)).await?;
    info!(
        note_id = %id,
        client = %client,
        views = ?views,
        expiration = ?expiration,
        "note created"
    );
    Ok(CreateNoteResult { id })
}

/// `GET /api/notes/{id}`: metadata preview without spending a view.
pub async fn preview_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    client: ClientIp,
) -> Result<Json<NotePreview>, (StatusCode, String)> {
    preview_note_inner(&state, client, &id)
        .await
        .map(Json)
        .map_err(|err| (map_note_status(&err), err.to_string()))
}

async fn preview_note_inner(
    state: &AppState,
    ClientIp(client): ClientIp,
    id: &str,
) -> Result<NotePreview, NoteError> {
    enforce_limit(
        state,
        &client,
        RateLimitAction::Read,
        state.config().rate_limit_read_per_minute,
    )
    .await?;

    let preview = with_store_timeout(state, state.notes().preview(id)).await?;
    info!(note_id = %id, client = %client, "note previewed");
    Ok(preview)
}

/// `DELETE /api/notes/{id}`: consume one view and return the contents.
pub async fn consume_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    client: ClientIp,
) -> Result<Json<NoteContents>, (StatusCode, String)> {
    consume_note_inner(&state, client, &id)
        .await
        .map(Json)
        .map_err(|err| (map_note_status(&err), err.to_string()))
}

async fn consume_note_inner(
    state: &AppState,
    ClientIp(client): ClientIp,
    id: &str,
) -> Result<NoteContents, NoteError> {
    enforce_limit(
        state,
        &client,
        RateLimitAction::Read,
        state.config().rate_limit_read_per_minute,
    )
    .await?;

    let note = with_store_timeout(state, state.notes().consume(id)).await?;
    info!(note_id = %id, client = %client, "note consumed");
    Ok(note)
}

/// `GET /api/status`: advertise limits and branding. Served from
/// configuration alone, no store round trip.
pub async fn status(State(state): State<AppState>) -> Json<StatusResult> {
    let config = state.config();
    Json(StatusResult {
        version: env!("CARGO_PKG_VERSION").to_string(),
        max_size: config.size_limit_bytes,
        max_views: config.max_views,
        max_expiration: config.max_expiration_minutes,
        allow_advanced: config.allow_advanced,
        allow_files: config.allow_files,
        imprint_url: config.theme.imprint_url.clone(),
        imprint_html: config.theme.imprint_html.clone(),
        theme_image: config.theme.image.clone(),
        theme_text: config.theme.text.clone(),
        theme_page_title: config.theme.page_title.clone(),
        theme_favicon: config.theme.favicon.clone(),
    })
}

/// `GET /api/live`: round-trip liveness probe against the store.
pub async fn live(
    State(state): State<AppState>,
) -> Result<Json<LiveResult>, (StatusCode, String)> {
    live_inner(&state)
        .await
        .map(Json)
        .map_err(|err| (map_note_status(&err), err.to_string()))
}

async fn live_inner(state: &AppState) -> Result<LiveResult, NoteError> {
    with_store_timeout(state, state.backend().probe()).await?;
    Ok(LiveResult { ok: true })
}

/// Spend one rate-limit slot for `identity`, failing the request when
/// the window is full.
async fn enforce_limit(
    state: &AppState,
    identity: &str,
    action: RateLimitAction,
    limit_per_minute: u32,
) -> Result<(), NoteError> {
    let admitted = with_store_timeout(
        state,
        state.limiter().allow(identity, action, limit_per_minute),
    )
    .await?;
    if !admitted {
        warn!(client = %identity, action = %action, "rate limit exceeded");
        return Err(NoteError::RateLimited {
            action: action.to_string(),
        });
    }
    Ok(())
}

/// Bound a store call by the configured timeout. No retries here; a
/// caller that wants the operation again issues a new request.
async fn with_store_timeout<T>(
    state: &AppState,
    operation: impl Future<Output = Result<T, NoteError>>,
) -> Result<T, NoteError> {
    let timeout = state.config().store_timeout();
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(NoteError::StoreUnavailable {
            reason: format!("store call exceeded {}ms", timeout.as_millis()),
        }),
    }
}

fn map_note_status(err: &NoteError) -> StatusCode {
    match err {
        NoteError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        NoteError::InvalidMeta { .. } | NoteError::InvalidPolicy { .. } => StatusCode::BAD_REQUEST,
        NoteError::NotFound => StatusCode::NOT_FOUND,
        NoteError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        NoteError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}
