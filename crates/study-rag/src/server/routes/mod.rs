//! API routes for the study server

pub mod documents;
pub mod ingest;
pub mod query;
pub mod sessions;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};

use crate::server::state::AppState;
use crate::utils::load_sample_questions;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Sessions
        .route("/sessions", post(sessions::create_session))
        .route(
            "/sessions/:id",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/sessions/:id/key", post(sessions::set_api_key))
        .route(
            "/sessions/:id/history",
            get(sessions::get_history).delete(sessions::clear_history),
        )
        .route("/sessions/:id/history/export", get(sessions::export_history))
        // Study actions
        .route("/sessions/:id/ask", post(query::ask))
        .route("/sessions/:id/summary", post(query::summary))
        .route("/sessions/:id/explain", post(query::explain))
        .route("/sessions/:id/quiz", post(query::quiz))
        // Ingestion - with larger body limit for file uploads
        .route(
            "/ingest",
            post(ingest::ingest_files).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Retrieval without generation
        .route("/search", post(query::search))
        // Document management
        .route("/documents", get(documents::list_documents))
        .route(
            "/documents/:id",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route(
            "/collection",
            get(documents::collection_info).delete(documents::clear_collection),
        )
        // Info
        .route("/sample-questions", get(sample_questions))
        .route("/info", get(info))
}

/// GET /api/sample-questions
async fn sample_questions() -> Json<Vec<String>> {
    Json(load_sample_questions())
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let assistant = state.assistant();
    Json(serde_json::json!({
        "name": "study-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Study assistant: ask questions about your course materials",
        "model": state.config().llm.model,
        "collection": assistant.collection_info(),
        "documents": assistant.documents().len(),
        "sessions": state.session_count(),
        "cache": assistant.cache_stats(),
        "endpoints": {
            "POST /api/sessions": "Create a study session",
            "GET /api/sessions/:id": "Session status",
            "DELETE /api/sessions/:id": "End a session",
            "POST /api/sessions/:id/key": "Initialize a session with an API key",
            "GET /api/sessions/:id/history": "Chat history",
            "DELETE /api/sessions/:id/history": "Clear chat history",
            "GET /api/sessions/:id/history/export": "Chat history as text",
            "POST /api/sessions/:id/ask": "Ask a question",
            "POST /api/sessions/:id/summary": "Summarize the materials",
            "POST /api/sessions/:id/explain": "Explain a concept",
            "POST /api/sessions/:id/quiz": "Generate quiz questions",
            "POST /api/ingest": "Upload and process documents",
            "POST /api/search": "Semantic search",
            "GET /api/documents": "List documents",
            "GET /api/documents/:id": "Get document details",
            "DELETE /api/documents/:id": "Delete a document",
            "GET /api/collection": "Collection statistics",
            "DELETE /api/collection": "Delete all documents",
            "GET /api/sample-questions": "Suggested study questions"
        }
    }))
}
