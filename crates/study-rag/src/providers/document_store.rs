//! Document store provider trait for keeping raw uploads

use async_trait::async_trait;
use uuid::Uuid;
use crate::error::Result;

/// Metadata about a stored upload
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocumentInfo {
    /// Document ID
    pub id: Uuid,
    /// Original filename
    pub filename: String,
    /// Storage URI (file path)
    pub uri: String,
    /// Size in bytes
    pub size: u64,
}

/// Trait for raw upload storage
///
/// Only used when `KEEP_UPLOADS` is on; otherwise uploads are dropped once
/// their text has been extracted.
#[async_trait]
pub trait DocumentStoreProvider: Send + Sync {
    /// Store an upload and return its URI
    async fn store_document(&self, doc_id: &Uuid, filename: &str, data: &[u8]) -> Result<String>;

    /// Retrieve upload bytes
    async fn get_document(&self, doc_id: &Uuid) -> Result<Vec<u8>>;

    /// Check if an upload exists
    async fn exists(&self, doc_id: &Uuid) -> Result<bool>;

    /// Delete an upload; missing uploads are not an error
    async fn delete_document(&self, doc_id: &Uuid) -> Result<()>;

    /// List stored uploads
    async fn list_documents(&self) -> Result<Vec<StoredDocumentInfo>>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
