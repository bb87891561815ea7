//! Knowledge base: an embedder coupled with the vector store

use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::{Chunk, CollectionInfo};

use super::store::{ScoredChunk, VectorStore};

/// Minimum similarity for a hit to count as relevant
pub const RELEVANCE_THRESHOLD: f32 = 0.05;

/// Result of a thresholded similarity search
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    /// Hits, highest similarity first
    pub results: Vec<ScoredChunk>,
    /// Nothing cleared the threshold; `results` are the best matches anyway
    pub low_confidence: bool,
}

impl SearchOutcome {
    pub fn chunks(&self) -> Vec<Chunk> {
        self.results.iter().map(|r| r.chunk.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Embeds chunks once and answers similarity queries
pub struct KnowledgeBase {
    embedder: Arc<dyn EmbeddingProvider>,
    store: VectorStore,
    collection_name: String,
    batch_size: usize,
    max_results: usize,
}

impl KnowledgeBase {
    /// Open the configured collection with `embedder`
    pub fn new(config: &RagConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let store = VectorStore::open(
            config.vector_store.collection_path(),
            embedder.model(),
            embedder.dimensions(),
        )?;
        Ok(Self::with_store(config, embedder, store))
    }

    /// Use an already opened store
    pub fn with_store(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: VectorStore,
    ) -> Self {
        Self {
            embedder,
            store,
            collection_name: config.vector_store.collection_name.clone(),
            batch_size: config.performance.batch_size.max(1),
            max_results: config.search.max_results.max(1),
        }
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Embed the chunks that still need it and store everything
    ///
    /// Chunks that already carry an embedding are never sent to the embedder.
    /// Returns the number of chunks added to the store.
    pub async fn add_chunks(&self, chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() {
            tracing::warn!("No chunks provided to add");
            return Ok(0);
        }

        let chunks = self.embed_chunks(chunks).await?;
        let added = self.store.insert(chunks)?;
        tracing::info!(
            "Added {} chunks to {}. Total: {}",
            added,
            self.collection_name,
            self.store.len()
        );
        Ok(added)
    }

    /// Fill in missing embeddings without touching the store
    pub async fn embed_chunks(&self, mut chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
        let pending: Vec<usize> = chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| c.needs_embedding())
            .map(|(i, _)| i)
            .collect();

        for batch in pending.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|&i| chunks[i].content.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "{} returned {} embeddings for {} texts",
                    self.embedder.name(),
                    embeddings.len(),
                    batch.len()
                )));
            }
            for (&i, embedding) in batch.iter().zip(embeddings) {
                chunks[i].embedding = embedding;
            }
        }

        tracing::debug!("Embedded {} of {} chunks", pending.len(), chunks.len());
        Ok(chunks)
    }

    /// Store already embedded chunks, replacing `replaces` in the same step
    ///
    /// Returns `(deleted, added)`.
    pub fn commit_chunks(
        &self,
        replaces: Option<&Uuid>,
        chunks: Vec<Chunk>,
    ) -> Result<(usize, usize)> {
        let counts = match replaces {
            Some(old) => self.store.replace_document(old, chunks)?,
            None => (0, self.store.insert(chunks)?),
        };
        tracing::info!(
            "Committed {} chunks to {} ({} replaced). Total: {}",
            counts.1,
            self.collection_name,
            counts.0,
            self.store.len()
        );
        Ok(counts)
    }

    /// Similarity search with the relevance threshold
    ///
    /// Hits at or below [`RELEVANCE_THRESHOLD`] are dropped. If none remain,
    /// the top-k are returned anyway with `low_confidence` set.
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&HashMap<String, serde_json::Value>>,
    ) -> Result<SearchOutcome> {
        let results = self.similarity_search_with_score(query, k, filter).await?;
        if results.is_empty() {
            return Ok(SearchOutcome::default());
        }

        let relevant: Vec<ScoredChunk> = results
            .iter()
            .filter(|r| r.similarity > RELEVANCE_THRESHOLD)
            .cloned()
            .collect();

        let outcome = if relevant.is_empty() {
            tracing::info!("No results above threshold for '{}', returning top matches", query);
            SearchOutcome {
                results,
                low_confidence: true,
            }
        } else {
            SearchOutcome {
                results: relevant,
                low_confidence: false,
            }
        };

        tracing::info!(
            "Similarity search for '{}' returned {} results",
            query,
            outcome.results.len()
        );
        Ok(outcome)
    }

    /// Raw top-k hits with scores, no threshold
    pub async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
        filter: Option<&HashMap<String, serde_json::Value>>,
    ) -> Result<Vec<ScoredChunk>> {
        if self.store.is_empty() {
            tracing::warn!("Vector store is empty. No documents added yet.");
            return Ok(Vec::new());
        }

        let k = k.clamp(1, self.max_results);
        let query_embedding = self.embedder.embed_query(query).await?;
        self.store.search(&query_embedding, k, filter)
    }

    /// Stored chunks in insertion order
    pub fn get_all_chunks(&self, limit: Option<usize>) -> Vec<Chunk> {
        self.store.all_chunks(limit)
    }

    /// Exact-match metadata lookup
    pub fn search_by_metadata(
        &self,
        filter: &HashMap<String, serde_json::Value>,
        limit: usize,
    ) -> Vec<Chunk> {
        let chunks = self.store.find_by_metadata(filter, limit);
        tracing::info!("Metadata search returned {} chunks", chunks.len());
        chunks
    }

    /// Remove one document's chunks
    pub fn delete_document(&self, document_id: &Uuid) -> Result<usize> {
        self.store.delete_by_document(document_id)
    }

    /// Remove every chunk in the collection
    pub fn delete_collection(&self) -> Result<usize> {
        let deleted = self.store.clear()?;
        tracing::info!("Deleted collection {} ({} chunks)", self.collection_name, deleted);
        Ok(deleted)
    }

    pub fn collection_info(&self) -> CollectionInfo {
        let count = self.store.len();
        CollectionInfo {
            name: self.collection_name.clone(),
            count,
            embedding_model: self.store.model().to_string(),
            dimensions: self.store.dimensions(),
            persist_path: self
                .store
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(memory)".to_string()),
            status: if count > 0 { "initialized" } else { "empty" }.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HashEmbedder;
    use crate::types::{ChunkSource, FileType};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hash embedder that counts the texts it is asked to embed
    struct CountingEmbedder {
        inner: HashEmbedder,
        calls: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                inner: HashEmbedder::default(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(text).await
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(texts.len(), Ordering::SeqCst);
            self.inner.embed_batch(texts).await
        }

        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "counting"
        }

        fn model(&self) -> &str {
            self.inner.model()
        }
    }

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        let doc = Uuid::new_v4();
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| {
                Chunk::new(
                    doc,
                    t.to_string(),
                    ChunkSource::new("ml.txt".into(), FileType::Txt, None),
                    0,
                    t.len(),
                    i as u32,
                )
            })
            .collect()
    }

    fn knowledge_base(embedder: Arc<dyn EmbeddingProvider>) -> KnowledgeBase {
        let store = VectorStore::in_memory(embedder.model(), embedder.dimensions());
        KnowledgeBase::with_store(&RagConfig::default(), embedder, store)
    }

    #[tokio::test]
    async fn test_chunks_embedded_once() {
        let embedder = Arc::new(CountingEmbedder::new());
        let kb = knowledge_base(embedder.clone());

        let input = chunks(&["supervised learning uses labels", "clustering groups data"]);
        assert_eq!(kb.add_chunks(input).await.unwrap(), 2);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);

        let stored = kb.get_all_chunks(None);
        assert_eq!(kb.add_chunks(stored).await.unwrap(), 0);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
        assert_eq!(kb.store().len(), 2);
    }

    #[tokio::test]
    async fn test_batches_respect_batch_size() {
        let embedder = Arc::new(CountingEmbedder::new());
        let texts: Vec<String> = (0..25).map(|i| format!("chunk number {}", i)).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let kb = knowledge_base(embedder.clone());
        assert_eq!(kb.add_chunks(chunks(&refs)).await.unwrap(), 25);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 25);
    }

    /// Two-dimensional embedder driven by a keyword
    struct AxisEmbedder;

    #[async_trait]
    impl EmbeddingProvider for AxisEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(if text.contains("biology") {
                vec![1.0, 0.0]
            } else if text.contains("history") {
                vec![0.0, 1.0]
            } else {
                vec![0.03, 1.0]
            })
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "axis"
        }

        fn model(&self) -> &str {
            "axis"
        }
    }

    #[tokio::test]
    async fn test_relevant_hits_pass_threshold() {
        let kb = knowledge_base(Arc::new(AxisEmbedder));
        kb.add_chunks(chunks(&["cell biology", "roman history"]))
            .await
            .unwrap();

        let outcome = kb.similarity_search("biology question", 5, None).await.unwrap();
        assert!(!outcome.low_confidence);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].chunk.content, "cell biology");
    }

    #[tokio::test]
    async fn test_low_confidence_fallback() {
        let kb = knowledge_base(Arc::new(AxisEmbedder));
        kb.add_chunks(chunks(&["cell biology", "more biology"]))
            .await
            .unwrap();

        // similarity is 0.03 for both chunks
        let outcome = kb.similarity_search("unrelated", 2, None).await.unwrap();
        assert!(outcome.low_confidence);
        assert_eq!(outcome.results.len(), 2);
    }

    #[tokio::test]
    async fn test_hash_embedder_ranks_related_text_first() {
        let kb = knowledge_base(Arc::new(HashEmbedder::default()));
        kb.add_chunks(chunks(&[
            "The Treaty of Westphalia was signed in 1648.",
            "Supervised learning trains models on labeled data.",
        ]))
        .await
        .unwrap();

        let outcome = kb.similarity_search("supervised learning", 5, None).await.unwrap();
        assert!(!outcome.low_confidence);
        assert!(outcome.results[0].chunk.content.starts_with("Supervised"));
    }

    #[tokio::test]
    async fn test_empty_store_returns_nothing() {
        let kb = knowledge_base(Arc::new(HashEmbedder::default()));
        let outcome = kb.similarity_search("anything", 5, None).await.unwrap();
        assert!(outcome.is_empty());
        assert!(!outcome.low_confidence);
        assert_eq!(kb.collection_info().status, "empty");
    }

    #[tokio::test]
    async fn test_delete_collection() {
        let kb = knowledge_base(Arc::new(HashEmbedder::default()));
        kb.add_chunks(chunks(&["one", "two", "three"])).await.unwrap();

        let info = kb.collection_info();
        assert_eq!(info.count, 3);
        assert_eq!(info.status, "initialized");
        assert_eq!(info.dimensions, 384);

        let mut filter = HashMap::new();
        filter.insert("chunk_id".to_string(), serde_json::json!(1));
        assert_eq!(kb.search_by_metadata(&filter, 10)[0].content, "two");

        assert_eq!(kb.delete_collection().unwrap(), 3);
        assert_eq!(kb.collection_info().count, 0);
    }
}
