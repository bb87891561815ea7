//! Document ingestion endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::response::{FileIngestStatus, IngestError};
use crate::types::IngestResponse;

/// POST /api/ingest - Upload and process files
///
/// Every multipart field with a file name is treated as an upload. Fields
/// that cannot be read are reported alongside the processed files.
pub async fn ingest_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>> {
    let mut files = Vec::new();
    let mut read_errors = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::validation(format!("Failed to read multipart field: {}", e)))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            tracing::debug!("Ignoring non-file field {:?}", field.name());
            continue;
        };
        let filename = if filename.trim().is_empty() {
            format!("upload_{}.bin", Uuid::new_v4())
        } else {
            filename
        };

        match field.bytes().await {
            Ok(data) => {
                tracing::info!("Received file: {} ({} bytes)", filename, data.len());
                files.push((filename, data.to_vec()));
            }
            Err(e) => read_errors.push(IngestError {
                filename,
                error: format!("Failed to read file: {}", e),
            }),
        }
    }

    if files.is_empty() && read_errors.is_empty() {
        return Err(Error::validation("No files uploaded"));
    }

    let mut response = if files.is_empty() {
        IngestResponse {
            success: false,
            files: Vec::new(),
            total_chunks_created: 0,
            processing_time_ms: 0,
            errors: Vec::new(),
        }
    } else {
        state.assistant().process_uploads(files).await?
    };

    for error in read_errors {
        response.files.push(FileIngestStatus::Failed {
            filename: error.filename.clone(),
            error: error.error.clone(),
        });
        response.errors.push(error);
    }

    tracing::info!(
        "Ingest finished: {} files, {} chunks, {} errors in {}ms",
        response.files.len(),
        response.total_chunks_created,
        response.errors.len(),
        response.processing_time_ms
    );
    Ok(Json(response))
}
