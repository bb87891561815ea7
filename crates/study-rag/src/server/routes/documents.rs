//! Document and collection management endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::response::DocumentSummary;
use crate::types::{CollectionInfo, Document};

/// Response for the document list
#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentSummary>,
    pub total: usize,
}

/// Result of a delete
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub chunks_deleted: usize,
}

/// GET /api/documents
pub async fn list_documents(State(state): State<AppState>) -> Json<DocumentListResponse> {
    let documents: Vec<DocumentSummary> = state
        .assistant()
        .documents()
        .iter()
        .map(DocumentSummary::from)
        .collect();
    let total = documents.len();
    Json(DocumentListResponse { documents, total })
}

/// GET /api/documents/:id
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>> {
    state
        .assistant()
        .document(&id)
        .map(Json)
        .ok_or_else(|| Error::DocumentNotFound(id.to_string()))
}

/// DELETE /api/documents/:id
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>> {
    let chunks_deleted = state.assistant().delete_document(&id).await?;
    Ok(Json(DeleteResponse {
        deleted: true,
        chunks_deleted,
    }))
}

/// GET /api/collection
pub async fn collection_info(State(state): State<AppState>) -> Json<CollectionInfo> {
    Json(state.assistant().collection_info())
}

/// DELETE /api/collection - Remove every chunk and document
pub async fn clear_collection(State(state): State<AppState>) -> Result<Json<DeleteResponse>> {
    let chunks_deleted = state.assistant().clear_collection().await?;
    tracing::info!("Collection cleared ({} chunks)", chunks_deleted);
    Ok(Json(DeleteResponse {
        deleted: true,
        chunks_deleted,
    }))
}
