//! Filesystem upload store

use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::document_store::{DocumentStoreProvider, StoredDocumentInfo};

/// Keeps uploads as `{id}.bin` with a `{id}.meta.json` sidecar
pub struct LocalDocumentStore {
    storage_dir: PathBuf,
}

impl LocalDocumentStore {
    /// Create the store, creating `storage_dir` if needed
    pub fn new(storage_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&storage_dir)?;
        Ok(Self { storage_dir })
    }

    fn doc_path(&self, doc_id: &Uuid) -> PathBuf {
        self.storage_dir.join(format!("{}.bin", doc_id))
    }

    fn meta_path(&self, doc_id: &Uuid) -> PathBuf {
        self.storage_dir.join(format!("{}.meta.json", doc_id))
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct UploadMeta {
    id: Uuid,
    filename: String,
    size: u64,
    stored_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
impl DocumentStoreProvider for LocalDocumentStore {
    async fn store_document(&self, doc_id: &Uuid, filename: &str, data: &[u8]) -> Result<String> {
        let doc_path = self.doc_path(doc_id);

        tokio::fs::write(&doc_path, data).await?;

        let meta = UploadMeta {
            id: *doc_id,
            filename: filename.to_string(),
            size: data.len() as u64,
            stored_at: chrono::Utc::now(),
        };
        tokio::fs::write(self.meta_path(doc_id), serde_json::to_string_pretty(&meta)?).await?;

        tracing::debug!("Stored upload {} as {}", filename, doc_path.display());
        Ok(doc_path.to_string_lossy().to_string())
    }

    async fn get_document(&self, doc_id: &Uuid) -> Result<Vec<u8>> {
        tokio::fs::read(self.doc_path(doc_id))
            .await
            .map_err(|e| Error::Internal(format!("Failed to read upload {}: {}", doc_id, e)))
    }

    async fn exists(&self, doc_id: &Uuid) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.doc_path(doc_id)).await?)
    }

    async fn delete_document(&self, doc_id: &Uuid) -> Result<()> {
        for path in [self.doc_path(doc_id), self.meta_path(doc_id)] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn list_documents(&self) -> Result<Vec<StoredDocumentInfo>> {
        let mut docs = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.storage_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.to_string_lossy().ends_with(".meta.json") {
                continue;
            }
            let Ok(content) = tokio::fs::read_to_string(&path).await else {
                continue;
            };
            match serde_json::from_str::<UploadMeta>(&content) {
                Ok(meta) => docs.push(StoredDocumentInfo {
                    id: meta.id,
                    uri: self.doc_path(&meta.id).to_string_lossy().to_string(),
                    filename: meta.filename,
                    size: meta.size,
                }),
                Err(e) => tracing::warn!("Skipping unreadable {}: {}", path.display(), e),
            }
        }

        docs.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(docs)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.storage_dir.exists())
    }

    fn name(&self) -> &str {
        "local-filesystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_list_delete() {
        let dir = TempDir::new().unwrap();
        let store = LocalDocumentStore::new(dir.path().join("uploads")).unwrap();
        let id = Uuid::new_v4();

        let uri = store.store_document(&id, "notes.txt", b"hello").await.unwrap();
        assert!(uri.ends_with(".bin"));
        assert!(store.exists(&id).await.unwrap());
        assert_eq!(store.get_document(&id).await.unwrap(), b"hello");

        let listed = store.list_documents().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].filename, "notes.txt");
        assert_eq!(listed[0].size, 5);

        store.delete_document(&id).await.unwrap();
        assert!(!store.exists(&id).await.unwrap());
        store.delete_document(&id).await.unwrap();
        assert!(store.list_documents().await.unwrap().is_empty());
    }
}
