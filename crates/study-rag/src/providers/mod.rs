//! Provider abstractions for embeddings, generation and upload storage
//!
//! Backends are chosen from configuration so the rest of the crate only sees
//! trait objects.

pub mod embedding;
pub mod llm;
pub mod document_store;
pub mod gemini;
pub mod hashing;
pub mod local;

pub use embedding::EmbeddingProvider;
pub use llm::{GenerationOptions, LlmProvider};
pub use document_store::{DocumentStoreProvider, StoredDocumentInfo};
pub use gemini::{GeminiClient, GeminiEmbedder};
pub use hashing::HashEmbedder;
pub use local::LocalDocumentStore;

use std::sync::Arc;

use crate::config::{EmbeddingBackend, RagConfig};
use crate::error::Result;

/// Build the embedder selected by `EMBEDDING_PROVIDER`
pub async fn build_embedder(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings.provider {
        EmbeddingBackend::Hashing => {
            Arc::new(HashEmbedder::new(config.embeddings.hashing_dimensions)?)
        }
        EmbeddingBackend::Gemini => {
            Arc::new(GeminiEmbedder::new(&config.llm, &config.embeddings)?)
        }
        #[cfg(feature = "onnx")]
        EmbeddingBackend::Onnx => {
            Arc::new(crate::embeddings::OnnxEmbedder::new(&config.embeddings).await?)
        }
        #[cfg(not(feature = "onnx"))]
        EmbeddingBackend::Onnx => {
            return Err(crate::error::Error::Config(
                "EMBEDDING_PROVIDER=onnx requires building with the `onnx` feature".to_string(),
            ))
        }
    };

    tracing::info!(
        "Embedding provider: {} ({}, {} dims)",
        embedder.name(),
        embedder.model(),
        embedder.dimensions()
    );
    Ok(embedder)
}

/// Build the upload store when `KEEP_UPLOADS` is on
pub fn build_document_store(config: &RagConfig) -> Result<Option<Arc<dyn DocumentStoreProvider>>> {
    if !config.files.keep_uploads {
        return Ok(None);
    }
    let store = LocalDocumentStore::new(config.files.upload_dir.clone())?;
    Ok(Some(Arc::new(store)))
}
