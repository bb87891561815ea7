//! Persistent in-process vector store
//!
//! Chunks and their embeddings live in memory behind a read/write lock. After
//! every mutation the whole collection is rewritten as JSON, together with the
//! model name and dimensionality that produced the vectors.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::Chunk;

/// Chunk with its cosine similarity to a query
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Cosine similarity (-1.0 to 1.0, higher is better)
    pub similarity: f32,
}

#[derive(Serialize)]
struct CollectionFileRef<'a> {
    model: &'a str,
    dimensions: usize,
    chunks: &'a [Chunk],
}

#[derive(Deserialize)]
struct CollectionFile {
    model: String,
    dimensions: usize,
    #[serde(default)]
    chunks: Vec<Chunk>,
}

/// Vector store backed by a single JSON collection file
#[derive(Debug)]
pub struct VectorStore {
    /// Collection file; `None` keeps everything in memory
    path: Option<PathBuf>,
    /// Embedding model that produced the vectors
    model: String,
    /// Embedding dimensions
    dimensions: usize,
    /// Chunks in insertion order
    chunks: RwLock<Vec<Chunk>>,
}

impl VectorStore {
    /// Open (or create) the collection at `path`
    ///
    /// A non-empty collection written by a different model or dimensionality
    /// is rejected rather than mixed with new vectors.
    pub fn open(path: impl Into<PathBuf>, model: &str, dimensions: usize) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let chunks = if path.exists() {
            let file: CollectionFile = serde_json::from_slice(&std::fs::read(&path)?)
                .map_err(|e| {
                    Error::VectorDb(format!("Corrupt collection file {}: {}", path.display(), e))
                })?;

            if !file.chunks.is_empty() && (file.model != model || file.dimensions != dimensions) {
                return Err(Error::Config(format!(
                    "Collection {} was embedded with {} ({} dims) but the configured embedder is {} ({} dims); clear the collection or switch EMBEDDING_PROVIDER back",
                    path.display(),
                    file.model,
                    file.dimensions,
                    model,
                    dimensions
                )));
            }
            file.chunks
        } else {
            Vec::new()
        };

        tracing::info!(
            "Opened vector store {} with {} chunks",
            path.display(),
            chunks.len()
        );

        Ok(Self {
            path: Some(path),
            model: model.to_string(),
            dimensions,
            chunks: RwLock::new(chunks),
        })
    }

    /// Create a store that is never written to disk
    pub fn in_memory(model: &str, dimensions: usize) -> Self {
        Self {
            path: None,
            model: model.to_string(),
            dimensions,
            chunks: RwLock::new(Vec::new()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert embedded chunks; chunks already stored (same id) are skipped
    ///
    /// Returns the number of chunks added.
    pub fn insert(&self, new_chunks: Vec<Chunk>) -> Result<usize> {
        self.check_embeddings(&new_chunks)?;

        let mut chunks = self.chunks.write();
        let added = push_unique(&mut chunks, new_chunks);

        if added > 0 {
            self.persist(&chunks)?;
        }
        Ok(added)
    }

    /// Swap a document's chunks for `new_chunks` under one write lock
    ///
    /// Readers see either the old chunks or the new ones, never neither.
    /// Returns `(deleted, added)`.
    pub fn replace_document(
        &self,
        document_id: &Uuid,
        new_chunks: Vec<Chunk>,
    ) -> Result<(usize, usize)> {
        self.check_embeddings(&new_chunks)?;

        let mut chunks = self.chunks.write();
        let before = chunks.len();
        chunks.retain(|c| c.document_id != *document_id);
        let deleted = before - chunks.len();
        let added = push_unique(&mut chunks, new_chunks);

        if deleted > 0 || added > 0 {
            self.persist(&chunks)?;
        }
        Ok((deleted, added))
    }

    fn check_embeddings(&self, chunks: &[Chunk]) -> Result<()> {
        for chunk in chunks {
            if chunk.embedding.is_empty() {
                return Err(Error::VectorDb(format!("Chunk {} has no embedding", chunk.id)));
            }
            if chunk.embedding.len() != self.dimensions {
                return Err(Error::VectorDb(format!(
                    "Chunk {} has {} dims, store expects {}",
                    chunk.id,
                    chunk.embedding.len(),
                    self.dimensions
                )));
            }
        }
        Ok(())
    }

    /// Top-k chunks by cosine similarity, highest first
    pub fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        filter: Option<&HashMap<String, serde_json::Value>>,
    ) -> Result<Vec<ScoredChunk>> {
        if query_embedding.len() != self.dimensions {
            return Err(Error::VectorDb(format!(
                "Query has {} dims, store expects {}",
                query_embedding.len(),
                self.dimensions
            )));
        }

        let chunks = self.chunks.read();
        let mut results: Vec<ScoredChunk> = chunks
            .iter()
            .filter(|c| filter.map_or(true, |f| c.matches_filter(f)))
            .map(|c| ScoredChunk {
                similarity: cosine_similarity(query_embedding, &c.embedding),
                chunk: c.clone(),
            })
            .collect();

        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(k);
        Ok(results)
    }

    /// Stored chunks in insertion order
    pub fn all_chunks(&self, limit: Option<usize>) -> Vec<Chunk> {
        let chunks = self.chunks.read();
        chunks
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Chunks whose metadata matches every filter entry exactly
    pub fn find_by_metadata(
        &self,
        filter: &HashMap<String, serde_json::Value>,
        limit: usize,
    ) -> Vec<Chunk> {
        let chunks = self.chunks.read();
        chunks
            .iter()
            .filter(|c| c.matches_filter(filter))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Delete all chunks of a document
    pub fn delete_by_document(&self, document_id: &Uuid) -> Result<usize> {
        let mut chunks = self.chunks.write();
        let before = chunks.len();
        chunks.retain(|c| c.document_id != *document_id);
        let deleted = before - chunks.len();

        if deleted > 0 {
            self.persist(&chunks)?;
        }
        Ok(deleted)
    }

    /// Remove every chunk
    pub fn clear(&self) -> Result<usize> {
        let mut chunks = self.chunks.write();
        let deleted = chunks.len();
        chunks.clear();
        self.persist(&chunks)?;
        Ok(deleted)
    }

    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.read().is_empty()
    }

    /// Whether a chunk id is stored
    pub fn contains(&self, chunk_id: &Uuid) -> bool {
        self.chunks.read().iter().any(|c| c.id == *chunk_id)
    }

    /// Write the collection; called with the write lock held
    fn persist(&self, chunks: &[Chunk]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let file = CollectionFileRef {
            model: &self.model,
            dimensions: self.dimensions,
            chunks,
        };
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(&file)?)?;
        std::fs::rename(&tmp, path)?;

        tracing::debug!("Persisted {} chunks to {}", chunks.len(), path.display());
        Ok(())
    }
}

/// Cosine similarity; zero when either vector has no magnitude
/// Append chunks whose ids are not stored yet; returns how many were added
fn push_unique(chunks: &mut Vec<Chunk>, new_chunks: Vec<Chunk>) -> usize {
    let mut known: HashSet<Uuid> = chunks.iter().map(|c| c.id).collect();
    let before = chunks.len();
    for chunk in new_chunks {
        if known.insert(chunk.id) {
            chunks.push(chunk);
        }
    }
    chunks.len() - before
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
