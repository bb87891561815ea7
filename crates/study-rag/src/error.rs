//! Error types for the study assistant

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for study assistant operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message shown to users when the hosted model call fails
pub const AI_FAILURE_MESSAGE: &str =
    "The AI service could not process this request. Please try again in a moment.";

/// Message returned when a session has no usable API key yet
pub const SESSION_NOT_INITIALIZED_MESSAGE: &str =
    "Please initialize the session with a valid API key first.";

/// Study assistant errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input
    #[error("Validation error: {0}")]
    Validation(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Upload exceeds the configured size limit
    #[error("File '{filename}' is {size_mb:.1}MB, limit is {limit_mb}MB")]
    FileTooLarge {
        filename: String,
        size_mb: f64,
        limit_mb: u64,
    },

    /// No text could be extracted
    #[error("No text extracted from '{0}'")]
    EmptyDocument(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector store error
    #[error("Vector store error: {0}")]
    VectorDb(String),

    /// Gemini/LLM error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Session has no AI assistant
    #[error("{}", SESSION_NOT_INITIALIZED_MESSAGE)]
    SessionNotInitialized,

    /// Session not found
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Operation exceeded its time budget
    #[error("Timed out: {0}")]
    Timeout(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector store error
    pub fn vector_db(message: impl Into<String>) -> Self {
        Self::VectorDb(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the error came from a model call or its transport
    ///
    /// Embedding failures count: with the Gemini backend they carry the raw
    /// API response body.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Error::Llm(_) | Error::Embedding(_) | Error::Http(_))
    }

    /// Text safe to show an end user
    ///
    /// Upstream failures are collapsed into a generic message; the detail
    /// only goes to the log.
    pub fn user_message(&self) -> String {
        if self.is_upstream() {
            AI_FAILURE_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg.clone()),
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            Error::FileParse { filename, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "parse_error",
                format!("Failed to parse '{}': {}", filename, message),
            ),
            Error::UnsupportedFileType(ext) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_type",
                format!("Unsupported file type: {}", ext),
            ),
            Error::FileTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "file_too_large", self.to_string())
            }
            Error::EmptyDocument(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "empty_document", self.to_string())
            }
            Error::Embedding(msg) => {
                tracing::error!("Embedding call failed: {}", msg);
                (StatusCode::BAD_GATEWAY, "embedding_error", AI_FAILURE_MESSAGE.to_string())
            }
            Error::VectorDb(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "vector_store_error", msg.clone())
            }
            Error::Llm(msg) => {
                tracing::error!("LLM call failed: {}", msg);
                (StatusCode::BAD_GATEWAY, "ai_error", AI_FAILURE_MESSAGE.to_string())
            }
            Error::SessionNotInitialized => (
                StatusCode::CONFLICT,
                "session_not_initialized",
                SESSION_NOT_INITIALIZED_MESSAGE.to_string(),
            ),
            Error::SessionNotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Session not found: {}", id),
            ),
            Error::DocumentNotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Document not found: {}", id),
            ),
            Error::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, "timeout", msg.clone()),
            Error::Io(err) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error", err.to_string()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Http(err) => {
                tracing::error!("Upstream HTTP request failed: {}", err);
                (StatusCode::BAD_GATEWAY, "ai_error", AI_FAILURE_MESSAGE.to_string())
            }
            Error::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
