//! Session life cycle and chat history endpoints

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::server::state::AppState;
use crate::session::StudySession;
use crate::types::query::{ApiKeyRequest, CreateSessionRequest};
use crate::types::response::SessionInfo;
use crate::types::ChatEntry;

/// POST /api/sessions - Create a session
///
/// Without an `api_key` in the body the server's `GOOGLE_API_KEY` is used when
/// one is configured.
pub async fn create_session(
    State(state): State<AppState>,
    request: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<SessionInfo>)> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let llm = &state.config().llm;
    let mut session = StudySession::new();

    match request.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => session.initialize(key, llm)?,
        None if llm.has_api_key() => {
            if let Err(e) = session.initialize(&llm.api_key, llm) {
                tracing::warn!("Configured GOOGLE_API_KEY not usable: {}", e);
            }
        }
        None => {}
    }

    let info = session.info();
    state.add_session(session);
    Ok((StatusCode::CREATED, Json(info)))
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionInfo>> {
    let session = state.session(&id)?;
    let info = session.lock().await.info();
    Ok(Json(info))
}

/// DELETE /api/sessions/:id
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.remove_session(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/:id/key - Initialize with an API key
pub async fn set_api_key(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ApiKeyRequest>,
) -> Result<Json<SessionInfo>> {
    let session = state.session(&id)?;
    let mut session = session.lock().await;
    session.initialize(&request.api_key, &state.config().llm)?;
    Ok(Json(session.info()))
}

/// GET /api/sessions/:id/history
pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChatEntry>>> {
    let session = state.session(&id)?;
    let history = session.lock().await.history().to_vec();
    Ok(Json(history))
}

/// DELETE /api/sessions/:id/history
pub async fn clear_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let session = state.session(&id)?;
    session.lock().await.clear_history();
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/sessions/:id/history/export - Plain text transcript
pub async fn export_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let session = state.session(&id)?;
    let text = session.lock().await.export_history();
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        text,
    ))
}
