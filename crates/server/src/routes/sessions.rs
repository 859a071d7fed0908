use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use utoipa::ToSchema;

use orchestrator::{SessionConfig, ToolbeltSession};
use toolbelt_core::SessionRequest;

use crate::error::AppError;
use crate::routes::sse::SSE_KEEP_ALIVE_INTERVAL;
use crate::state::AppState;

/// Stored state of a past session run.
#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub id: String,
    pub user_id: String,
    pub current_query: Option<String>,
    pub log: Vec<String>,
}

#[utoipa::path(
    post,
    path = "/start-session",
    request_body = SessionRequest,
    responses(
        (status = 200, description = "SSE stream of progress events ending with the final answer")
    ),
    tag = "sessions"
)]
pub async fn start_session(
    State(state): State<AppState>,
    Json(request): Json<SessionRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!(
        session_id = %request.session_id,
        user_id = %request.user_id,
        "Starting toolbelt session"
    );

    let config = SessionConfig {
        session_id: request.session_id,
        user_id: request.user_id,
        models: state.config.models.clone(),
    };
    let session = ToolbeltSession::new(config, state.session_deps());

    let stream = session
        .run(request.user_query)
        .map(|event| Ok(Event::default().data(event.to_string())));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(SSE_KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    params(
        ("id" = String, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Session found", body = SessionResponse),
        (status = 404, description = "Session not found"),
        (status = 503, description = "Session store not configured")
    ),
    tag = "sessions"
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let Some(repo) = &state.sessions else {
        return Err(AppError::ServiceUnavailable(
            "Session store is not configured".to_string(),
        ));
    };

    let row = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {}", id)))?;

    let log = row.events();
    Ok(Json(SessionResponse {
        id: row.id,
        user_id: row.user_id,
        current_query: row.current_query,
        log,
    }))
}
