//! Question answering and study-aid endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::query::{ExplainRequest, QuizRequest};
use crate::types::response::{ExplainResponse, QuizResponse, SearchResponse, SummaryResponse};
use crate::types::{AnswerResponse, AskRequest, SearchRequest, SummaryRequest};

/// POST /api/sessions/:id/ask - Answer a question with citations
pub async fn ask(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AnswerResponse>> {
    tracing::info!("Question (session {}): \"{}\"", id, request.question);

    let session = state.session(&id)?;
    let mut session = session.lock().await;
    let response = session
        .ask(state.assistant(), &request.question, request.k, request.followups)
        .await?;

    tracing::info!(
        "Answered in {}ms ({} chunks, cached: {})",
        response.processing_time_ms,
        response.chunks_retrieved,
        response.cached
    );
    Ok(Json(response))
}

/// POST /api/sessions/:id/summary
pub async fn summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<SummaryRequest>>,
) -> Result<Json<SummaryResponse>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let session = state.session(&id)?;
    let mut session = session.lock().await;
    let response = session.summarize(state.assistant(), request.topic()).await?;
    Ok(Json(response))
}

/// POST /api/sessions/:id/explain
pub async fn explain(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ExplainRequest>,
) -> Result<Json<ExplainResponse>> {
    let session = state.session(&id)?;
    let session = session.lock().await;
    let response = session.explain(state.assistant(), &request.concept).await?;
    Ok(Json(response))
}

/// POST /api/sessions/:id/quiz
pub async fn quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<QuizRequest>>,
) -> Result<Json<QuizResponse>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let session = state.session(&id)?;
    let session = session.lock().await;
    let response = session.quiz(state.assistant(), request.count()).await?;
    Ok(Json(response))
}

/// POST /api/search - Semantic search, no API key needed
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    tracing::info!("Search: \"{}\"", request.query);
    let response = state
        .assistant()
        .search(&request.query, request.k, request.filter.as_ref())
        .await?;
    Ok(Json(response))
}
