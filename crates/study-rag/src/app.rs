//! Study assistant application core
//!
//! Owns everything that outlives a single session: the ingestion pipeline,
//! the knowledge base, the persisted document registry and the answer cache.
//! Sessions borrow it to answer questions with their own API key.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use uuid::Uuid;

use crate::cache::{AnswerCache, CacheStats};
use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::{build_citations, AiAssistant};
use crate::ingestion::{ExtractedFile, IngestPipeline};
use crate::providers::{build_document_store, build_embedder, DocumentStoreProvider, EmbeddingProvider};
use crate::retrieval::KnowledgeBase;
use crate::types::response::{
    DocumentSummary, ExplainResponse, FileIngestStatus, IngestError, QuizResponse, SearchHit,
    SearchResponse, SummaryResponse,
};
use crate::types::{AnswerResponse, ChatEntry, CollectionInfo, Document, IngestResponse};
use crate::utils::format_citations;

/// Returned when a question arrives before anything was uploaded
pub const NO_DOCUMENTS_MESSAGE: &str = "Please upload and process documents first!";

/// Chunks used for a summary or quiz
const OVERVIEW_CHUNKS: usize = 10;

/// How an upload relates to what is already registered
#[derive(Debug, Clone)]
enum FileStatus {
    New,
    /// Same name and content
    Unchanged(Document),
    /// Same content under another name
    Duplicate(Document),
    /// Same name, new content
    Modified(Document),
}

/// Shared application core
pub struct StudyAssistant {
    config: RagConfig,
    pipeline: Arc<IngestPipeline>,
    knowledge: KnowledgeBase,
    uploads: Option<Arc<dyn DocumentStoreProvider>>,
    /// Document registry (persisted to disk)
    documents: DashMap<Uuid, Document>,
    documents_path: PathBuf,
    cache: AnswerCache,
    /// Serializes dedup checks and registry updates across uploads
    ingest_lock: tokio::sync::Mutex<()>,
}

impl StudyAssistant {
    /// Build the configured embedder and open the collection
    pub async fn new(config: RagConfig) -> Result<Self> {
        let embedder = build_embedder(&config).await?;
        Self::with_embedder(config, embedder)
    }

    /// Open the collection with a ready embedder
    pub fn with_embedder(config: RagConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        tracing::info!(
            "Initializing study assistant (collection: {})",
            config.vector_store.collection_name
        );

        let pipeline = Arc::new(IngestPipeline::new(&config.chunking, &config.files));
        let knowledge = KnowledgeBase::new(&config, embedder)?;
        let uploads = build_document_store(&config)?;

        let documents_path = config.vector_store.documents_path();
        let documents = load_documents(&documents_path);
        tracing::info!("Loaded {} documents from registry", documents.len());

        let cache = AnswerCache::from_config(&config.performance);

        Ok(Self {
            config,
            pipeline,
            knowledge,
            uploads,
            documents,
            documents_path,
            cache,
            ingest_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Ingest several uploads, recording per-file outcomes
    pub async fn process_uploads(&self, files: Vec<(String, Vec<u8>)>) -> Result<IngestResponse> {
        let max_files = self.config.files.max_files_per_upload;
        if files.is_empty() {
            return Err(Error::validation("No files uploaded"));
        }
        if files.len() > max_files {
            return Err(Error::validation(format!(
                "Too many files: {} uploaded, at most {} allowed per upload",
                files.len(),
                max_files
            )));
        }

        let start = Instant::now();
        let file_timeout = Duration::from_secs(self.config.performance.timeout_secs);
        let mut statuses = Vec::with_capacity(files.len());
        let mut errors = Vec::new();
        let mut total_chunks = 0u32;

        for (filename, data) in files {
            let file_size = data.len();
            let file_start = Instant::now();

            let status = match timeout(file_timeout, self.process_upload(&filename, data)).await {
                Ok(Ok(status)) => status,
                Ok(Err(e)) => {
                    tracing::error!("Failed to process {}: {}", filename, e);
                    FileIngestStatus::Failed {
                        filename: filename.clone(),
                        error: e.user_message(),
                    }
                }
                Err(_) => {
                    tracing::error!(
                        "TIMEOUT processing '{}' after {:.1}s (limit: {}s, size: {} bytes)",
                        filename,
                        file_start.elapsed().as_secs_f64(),
                        file_timeout.as_secs(),
                        file_size
                    );
                    FileIngestStatus::Failed {
                        filename: filename.clone(),
                        error: Error::Timeout(format!(
                            "Processing took longer than {}s (size: {} bytes)",
                            file_timeout.as_secs(),
                            file_size
                        ))
                        .to_string(),
                    }
                }
            };

            if let FileIngestStatus::Failed { filename, error } = &status {
                errors.push(IngestError {
                    filename: filename.clone(),
                    error: error.clone(),
                });
            }
            total_chunks += status.chunks_created();
            statuses.push(status);
        }

        Ok(IngestResponse {
            success: total_chunks > 0,
            files: statuses,
            total_chunks_created: total_chunks,
            processing_time_ms: start.elapsed().as_millis() as u64,
            errors,
        })
    }

    /// Ingest one upload with content-hash deduplication
    pub async fn process_upload(&self, filename: &str, data: Vec<u8>) -> Result<FileIngestStatus> {
        self.pipeline.validate(filename, data.len() as u64)?;
        tracing::info!("Processing file: {} ({} bytes)", filename, data.len());

        let pipeline = Arc::clone(&self.pipeline);
        let name = filename.to_string();
        let (extracted, data) = tokio::task::spawn_blocking(move || {
            let extracted = pipeline.extract(&name, &data);
            (extracted, data)
        })
        .await
        .map_err(|e| Error::internal(format!("Task join error: {}", e)))?;
        let extracted = extracted?;

        let _guard = self.ingest_lock.lock().await;

        let replaces = match self.check_file_status(filename, extracted.content_hash()) {
            FileStatus::Unchanged(existing) => {
                tracing::info!("Skipping unchanged file: {}", filename);
                return Ok(FileIngestStatus::Unchanged {
                    existing_document_id: existing.id,
                    filename: filename.to_string(),
                });
            }
            FileStatus::Duplicate(existing) => {
                tracing::info!(
                    "Skipping {}: same content as {}",
                    filename,
                    existing.filename
                );
                return Ok(FileIngestStatus::Duplicate {
                    existing_document_id: existing.id,
                    existing_filename: existing.filename,
                    filename: filename.to_string(),
                });
            }
            FileStatus::Modified(existing) => {
                tracing::info!("File modified, replacing: {}", filename);
                Some(existing)
            }
            FileStatus::New => None,
        };

        let (doc, chunk_count, old_chunks_deleted) =
            self.ingest_extracted(&extracted, &data, replaces.as_ref()).await?;
        let document = DocumentSummary::from(&doc);

        match replaces {
            Some(_) => {
                tracing::info!(
                    "Updated {}: deleted {} old chunks, created {} new",
                    filename,
                    old_chunks_deleted,
                    chunk_count
                );
                Ok(FileIngestStatus::Updated {
                    document,
                    chunks_created: chunk_count,
                    old_chunks_deleted,
                })
            }
            None => {
                // a new document can change the answer to any cached question
                self.cache.clear();
                Ok(FileIngestStatus::New {
                    document,
                    chunks_created: chunk_count,
                })
            }
        }
    }

    /// Chunk, embed, store and register an extracted file
    ///
    /// Embedding happens before anything is changed, so a failed or
    /// cancelled update leaves `replaces` fully in place. The chunk swap and
    /// registry update then run without an await in between.
    async fn ingest_extracted(
        &self,
        extracted: &ExtractedFile,
        data: &[u8],
        replaces: Option<&Document>,
    ) -> Result<(Document, u32, usize)> {
        let (mut doc, chunks) = self.pipeline.build(extracted)?;
        let chunks = self.knowledge.embed_chunks(chunks).await?;

        let (deleted, added) = self
            .knowledge
            .commit_chunks(replaces.map(|old| &old.id), chunks)?;
        if let Some(old) = replaces {
            self.cache.invalidate_by_document(&old.id);
            self.documents.remove(&old.id);
        }
        self.add_document(doc.clone());
        tracing::info!("Added {} chunks for {}", added, doc.filename);

        if let Some(uploads) = &self.uploads {
            if let Some(old) = replaces {
                if let Err(e) = uploads.delete_document(&old.id).await {
                    tracing::warn!("Failed to delete kept upload for {}: {}", old.filename, e);
                }
            }
            match uploads.store_document(&doc.id, &doc.filename, data).await {
                Ok(uri) => {
                    doc.stored_uri = Some(uri);
                    self.add_document(doc.clone());
                }
                Err(e) => tracing::warn!("Failed to keep upload {}: {}", doc.filename, e),
            }
        }

        let chunk_count = doc.total_chunks;
        Ok((doc, chunk_count, deleted))
    }

    fn check_file_status(&self, filename: &str, content_hash: &str) -> FileStatus {
        if let Some(existing) = self.find_by_hash(content_hash) {
            return if existing.filename == filename {
                FileStatus::Unchanged(existing)
            } else {
                FileStatus::Duplicate(existing)
            };
        }

        match self.find_by_filename(filename) {
            Some(existing) => FileStatus::Modified(existing),
            None => FileStatus::New,
        }
    }

    fn find_by_hash(&self, content_hash: &str) -> Option<Document> {
        self.documents
            .iter()
            .find(|entry| entry.value().content_hash == content_hash)
            .map(|entry| entry.value().clone())
    }

    fn find_by_filename(&self, filename: &str) -> Option<Document> {
        self.documents
            .iter()
            .find(|entry| entry.value().filename == filename)
            .map(|entry| entry.value().clone())
    }

    /// Semantic search without generation
    pub async fn search(
        &self,
        query: &str,
        k: Option<usize>,
        filter: Option<&HashMap<String, serde_json::Value>>,
    ) -> Result<SearchResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::validation("Query must not be empty"));
        }

        let start = Instant::now();
        let k = self.config.search.clamp_k(k);
        let outcome = self.knowledge.similarity_search(query, k, filter).await?;

        Ok(SearchResponse {
            query: query.to_string(),
            hits: outcome
                .results
                .iter()
                .map(|r| SearchHit::from_chunk(&r.chunk, r.similarity))
                .collect(),
            low_confidence: outcome.low_confidence,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Retrieve context and answer a question
    ///
    /// Only questions asked without chat history are cached, since history
    /// changes the prompt.
    pub async fn answer_question(
        &self,
        ai: &AiAssistant,
        question: &str,
        history: &[ChatEntry],
        k: Option<usize>,
        followups: bool,
    ) -> Result<AnswerResponse> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::validation("Question must not be empty"));
        }
        self.ensure_documents()?;

        let start = Instant::now();
        let cacheable = self.config.performance.enable_caching && history.is_empty();

        if cacheable {
            if let Some(mut cached) = self.cache.get(question, &self.document_timestamps()) {
                tracing::info!("Answer cache hit for: {}", question);
                cached.processing_time_ms = start.elapsed().as_millis() as u64;
                return Ok(cached);
            }
        }

        let k = self.config.search.clamp_k(k);
        let outcome = self.knowledge.similarity_search(question, k, None).await?;
        let chunks = outcome.chunks();

        let answer = ai.generate_answer(question, &chunks, history).await?;
        let followups = if followups {
            ai.suggest_followup_questions(question, &answer, &chunks).await
        } else {
            Vec::new()
        };

        let response = AnswerResponse {
            citations: build_citations(&outcome.results, question),
            sources: format_citations(&chunks),
            low_confidence: outcome.low_confidence,
            cached: false,
            followups,
            chunks_retrieved: chunks.len(),
            processing_time_ms: start.elapsed().as_millis() as u64,
            answer,
        };

        if cacheable && !chunks.is_empty() {
            let timestamps = self.document_timestamps();
            let cited: HashMap<Uuid, DateTime<Utc>> = chunks
                .iter()
                .filter_map(|c| timestamps.get(&c.document_id).map(|t| (c.document_id, *t)))
                .collect();
            self.cache.put(question, &response, cited);
        }

        Ok(response)
    }

    /// Summarize around a topic, or the first stored chunks without one
    pub async fn summarize(&self, ai: &AiAssistant, topic: Option<&str>) -> Result<SummaryResponse> {
        self.ensure_documents()?;
        let start = Instant::now();
        let topic = topic.map(str::trim).filter(|t| !t.is_empty());

        let chunks = match topic {
            Some(topic) => self
                .knowledge
                .similarity_search(topic, OVERVIEW_CHUNKS, None)
                .await?
                .chunks(),
            None => self.knowledge.get_all_chunks(Some(OVERVIEW_CHUNKS)),
        };

        let summary = ai.generate_summary(&chunks, topic).await?;

        Ok(SummaryResponse {
            summary,
            topic: topic.map(str::to_string),
            sources: format_citations(&chunks),
            chunks_used: chunks.len(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Explain a concept from the most similar chunks
    pub async fn explain_concept(&self, ai: &AiAssistant, concept: &str) -> Result<ExplainResponse> {
        let concept = concept.trim();
        if concept.is_empty() {
            return Err(Error::validation("Concept must not be empty"));
        }
        self.ensure_documents()?;

        let start = Instant::now();
        let k = self.config.search.default_k;
        let chunks = self.knowledge.similarity_search(concept, k, None).await?.chunks();
        let explanation = ai.explain_concept(concept, &chunks).await?;

        Ok(ExplainResponse {
            concept: concept.to_string(),
            explanation,
            sources: format_citations(&chunks),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Multiple-choice quiz over the first stored chunks
    pub async fn create_quiz(&self, ai: &AiAssistant, num_questions: usize) -> Result<QuizResponse> {
        self.ensure_documents()?;
        let start = Instant::now();

        let chunks = self.knowledge.get_all_chunks(Some(OVERVIEW_CHUNKS));
        let questions = ai.create_quiz_questions(&chunks, num_questions).await?;

        Ok(QuizResponse {
            questions,
            sources: format_citations(&chunks),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn ensure_documents(&self) -> Result<()> {
        if self.knowledge.store().is_empty() {
            return Err(Error::validation(NO_DOCUMENTS_MESSAGE));
        }
        Ok(())
    }

    /// Registered documents, most recent first
    pub fn documents(&self) -> Vec<Document> {
        let mut docs: Vec<Document> = self
            .documents
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        docs.sort_by(|a, b| b.ingested_at.cmp(&a.ingested_at));
        docs
    }

    pub fn document(&self, id: &Uuid) -> Option<Document> {
        self.documents.get(id).map(|d| d.clone())
    }

    /// Delete a document, its chunks and its kept upload
    pub async fn delete_document(&self, id: &Uuid) -> Result<usize> {
        let _guard = self.ingest_lock.lock().await;
        let doc = self
            .document(id)
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;
        self.remove_document(&doc).await
    }

    async fn remove_document(&self, doc: &Document) -> Result<usize> {
        self.cache.invalidate_by_document(&doc.id);
        let deleted = self.knowledge.delete_document(&doc.id)?;

        if let Some(uploads) = &self.uploads {
            if let Err(e) = uploads.delete_document(&doc.id).await {
                tracing::warn!("Failed to delete kept upload for {}: {}", doc.filename, e);
            }
        }

        if self.documents.remove(&doc.id).is_some() {
            self.save_documents();
        }
        tracing::info!("Deleted document {} ({} chunks)", doc.filename, deleted);
        Ok(deleted)
    }

    /// Drop every chunk, document and cached answer
    pub async fn clear_collection(&self) -> Result<usize> {
        let _guard = self.ingest_lock.lock().await;
        let deleted = self.knowledge.delete_collection()?;

        if let Some(uploads) = &self.uploads {
            let ids: Vec<Uuid> = self.documents.iter().map(|entry| *entry.key()).collect();
            for id in ids {
                if let Err(e) = uploads.delete_document(&id).await {
                    tracing::warn!("Failed to delete kept upload {}: {}", id, e);
                }
            }
        }

        self.documents.clear();
        self.save_documents();
        self.cache.clear();
        Ok(deleted)
    }

    pub fn collection_info(&self) -> CollectionInfo {
        self.knowledge.collection_info()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Current `ingested_at` of every registered document
    pub fn document_timestamps(&self) -> HashMap<Uuid, DateTime<Utc>> {
        self.documents
            .iter()
            .map(|entry| (*entry.key(), entry.value().ingested_at))
            .collect()
    }

    fn add_document(&self, doc: Document) {
        self.documents.insert(doc.id, doc);
        self.save_documents();
    }

    fn save_documents(&self) {
        let docs: Vec<Document> = self
            .documents
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        match serde_json::to_string_pretty(&docs) {
            Ok(content) => {
                if let Err(e) = fs::write(&self.documents_path, content) {
                    tracing::error!("Failed to save {}: {}", self.documents_path.display(), e);
                }
            }
            Err(e) => tracing::error!("Failed to serialize documents: {}", e),
        }
    }
}

fn load_documents(path: &Path) -> DashMap<Uuid, Document> {
    let documents = DashMap::new();
    if !path.exists() {
        return documents;
    }

    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<Vec<Document>>(&content) {
            Ok(docs) => {
                for doc in docs {
                    documents.insert(doc.id, doc);
                }
            }
            Err(e) => tracing::warn!("Failed to parse {}: {}", path.display(), e),
        },
        Err(e) => tracing::warn!("Failed to read {}: {}", path.display(), e),
    }
    documents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AI_FAILURE_MESSAGE;
    use crate::testing::{study_assistant, test_config, FlakyEmbedder, MockLlm};
    use crate::providers::HashEmbedder;
    use tempfile::TempDir;

    const NOTES: &str = "Photosynthesis converts light energy into chemical energy.\n\n\
        Chlorophyll absorbs mostly blue and red light.\n\n\
        The Calvin cycle fixes carbon dioxide into sugars.";

    fn mock_ai(reply: &str) -> (Arc<MockLlm>, AiAssistant) {
        let llm = Arc::new(MockLlm::replying(reply));
        let ai = AiAssistant::new(llm.clone(), 0.1, 1024);
        (llm, ai)
    }

    #[tokio::test]
    async fn test_upload_dedup_outcomes() {
        let dir = TempDir::new().unwrap();
        let app = study_assistant(&dir);

        let first = app.process_upload("bio.txt", NOTES.as_bytes().to_vec()).await.unwrap();
        let FileIngestStatus::New { document, chunks_created } = first else {
            panic!("expected new, got {:?}", first);
        };
        assert!(chunks_created > 0);

        let again = app.process_upload("bio.txt", NOTES.as_bytes().to_vec()).await.unwrap();
        assert!(matches!(again, FileIngestStatus::Unchanged { existing_document_id, .. } if existing_document_id == document.id));

        let copy = app.process_upload("copy.txt", NOTES.as_bytes().to_vec()).await.unwrap();
        assert!(matches!(copy, FileIngestStatus::Duplicate { ref existing_filename, .. } if existing_filename == "bio.txt"));

        let edited = app
            .process_upload("bio.txt", b"Mitochondria produce ATP for the cell.".to_vec())
            .await
            .unwrap();
        let FileIngestStatus::Updated { old_chunks_deleted, .. } = edited else {
            panic!("expected updated, got {:?}", edited);
        };
        assert_eq!(old_chunks_deleted, chunks_created as usize);
        assert_eq!(app.documents().len(), 1);
        assert_eq!(app.collection_info().count, 1);
    }

    #[tokio::test]
    async fn test_failed_update_keeps_previous_version() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.performance.timeout_secs = 1;
        config.files.keep_uploads = true;
        let embedder = Arc::new(FlakyEmbedder::default());
        let app = StudyAssistant::with_embedder(config, embedder.clone()).unwrap();

        let first = app.process_upload("bio.txt", NOTES.as_bytes().to_vec()).await.unwrap();
        let FileIngestStatus::New { document, chunks_created } = first else {
            panic!("expected new, got {:?}", first);
        };
        let stored = app.document(&document.id).unwrap().stored_uri.unwrap();
        let edited = b"Mitochondria produce ATP for the cell.".to_vec();

        embedder.failing(true);
        let err = app.process_upload("bio.txt", edited.clone()).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));

        let response = app
            .process_uploads(vec![("bio.txt".to_string(), edited.clone())])
            .await
            .unwrap();
        assert!(!response.success);
        assert_eq!(response.errors[0].error, AI_FAILURE_MESSAGE);

        embedder.failing(false);
        embedder.stalling(Duration::from_secs(3));
        let response = app
            .process_uploads(vec![("bio.txt".to_string(), edited)])
            .await
            .unwrap();
        assert!(response.errors[0].error.starts_with("Timed out"));

        // the first version is still fully there
        assert_eq!(app.documents().len(), 1);
        assert_eq!(app.document(&document.id).unwrap().filename, "bio.txt");
        assert_eq!(app.collection_info().count, chunks_created as usize);
        assert!(Path::new(&stored).exists());

        embedder.stalling(Duration::ZERO);
        let hits = app.search("chlorophyll light", Some(1), None).await.unwrap();
        assert_eq!(hits.hits.len(), 1);
    }

    #[tokio::test]
    async fn test_registry_survives_restart() {
        let dir = TempDir::new().unwrap();
        let id = {
            let app = study_assistant(&dir);
            let status = app.process_upload("bio.txt", NOTES.as_bytes().to_vec()).await.unwrap();
            let FileIngestStatus::New { document, .. } = status else {
                panic!("expected new");
            };
            document.id
        };

        let reopened = study_assistant(&dir);
        assert_eq!(reopened.document(&id).unwrap().filename, "bio.txt");
        assert!(reopened.collection_info().count > 0);
        let again = reopened.process_upload("bio.txt", NOTES.as_bytes().to_vec()).await.unwrap();
        assert!(again.is_skipped());
    }

    #[tokio::test]
    async fn test_process_uploads_reports_failures() {
        let dir = TempDir::new().unwrap();
        let app = study_assistant(&dir);

        let response = app
            .process_uploads(vec![
                ("bio.txt".to_string(), NOTES.as_bytes().to_vec()),
                ("notes.xlsx".to_string(), b"nope".to_vec()),
                ("blank.txt".to_string(), b"   ".to_vec()),
            ])
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.files.len(), 3);
        assert_eq!(response.errors.len(), 2);
        assert_eq!(response.errors[0].filename, "notes.xlsx");
        assert!(response.total_chunks_created > 0);
    }

    #[tokio::test]
    async fn test_too_many_files_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.files.max_files_per_upload = 1;
        let app = StudyAssistant::with_embedder(config, Arc::new(HashEmbedder::default())).unwrap();

        let files = vec![
            ("a.txt".to_string(), b"alpha".to_vec()),
            ("b.txt".to_string(), b"beta".to_vec()),
        ];
        assert!(matches!(app.process_uploads(files).await, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_answer_is_cached_and_invalidated() {
        let dir = TempDir::new().unwrap();
        let app = study_assistant(&dir);
        let (llm, ai) = mock_ai("Light becomes chemical energy.");
        app.process_upload("bio.txt", NOTES.as_bytes().to_vec()).await.unwrap();

        let first = app
            .answer_question(&ai, "What does photosynthesis convert?", &[], None, false)
            .await
            .unwrap();
        assert!(!first.cached);
        assert!(first.chunks_retrieved > 0);
        assert!(first.sources.contains("bio.txt"));
        assert!(!first.citations.is_empty());

        let second = app
            .answer_question(&ai, "what does photosynthesis convert?  ", &[], None, false)
            .await
            .unwrap();
        assert!(second.cached);
        assert_eq!(llm.calls(), 1);

        app.process_upload("bio.txt", b"Replaced notes about photosynthesis.".to_vec())
            .await
            .unwrap();
        let third = app
            .answer_question(&ai, "What does photosynthesis convert?", &[], None, false)
            .await
            .unwrap();
        assert!(!third.cached);
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_history_bypasses_cache() {
        let dir = TempDir::new().unwrap();
        let app = study_assistant(&dir);
        let (llm, ai) = mock_ai("Answer.");
        app.process_upload("bio.txt", NOTES.as_bytes().to_vec()).await.unwrap();

        let history = vec![ChatEntry::new(crate::types::ChatEntryKind::Question, "Earlier?")];
        app.answer_question(&ai, "What is chlorophyll?", &history, None, false)
            .await
            .unwrap();
        app.answer_question(&ai, "What is chlorophyll?", &history, None, false)
            .await
            .unwrap();
        assert_eq!(llm.calls(), 2);
        assert_eq!(app.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_questions_need_documents() {
        let dir = TempDir::new().unwrap();
        let app = study_assistant(&dir);
        let (llm, ai) = mock_ai("unused");

        let err = app.answer_question(&ai, "Anything?", &[], None, false).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m == NO_DOCUMENTS_MESSAGE));
        assert!(app.summarize(&ai, None).await.is_err());
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_summary_explain_and_quiz() {
        let dir = TempDir::new().unwrap();
        let app = study_assistant(&dir);
        app.process_upload("bio.txt", NOTES.as_bytes().to_vec()).await.unwrap();

        let (llm, ai) = mock_ai("Plants make sugar.");
        let summary = app.summarize(&ai, Some("  chlorophyll ")).await.unwrap();
        assert_eq!(summary.topic.as_deref(), Some("chlorophyll"));
        assert!(summary.chunks_used > 0);
        assert!(llm.prompts.lock()[0].0.contains("Focus your summary on the topic: 'chlorophyll'"));

        let explained = app.explain_concept(&ai, "Calvin cycle").await.unwrap();
        assert_eq!(explained.explanation, "Plants make sugar.");

        let (_, quiz_ai) = mock_ai(
            "Question: What absorbs light?\nA) Chlorophyll\nB) Water\nC) Oxygen\nD) Salt\n\
             Correct Answer: A\nExplanation: Chlorophyll is the pigment.",
        );
        let quiz = app.create_quiz(&quiz_ai, 1).await.unwrap();
        assert_eq!(quiz.questions.len(), 1);
        assert_eq!(quiz.questions[0].answer, "A");
    }

    #[tokio::test]
    async fn test_search_and_delete() {
        let dir = TempDir::new().unwrap();
        let app = study_assistant(&dir);
        let status = app.process_upload("bio.txt", NOTES.as_bytes().to_vec()).await.unwrap();
        let FileIngestStatus::New { document, .. } = status else {
            panic!("expected new");
        };

        let results = app.search("chlorophyll light", Some(2), None).await.unwrap();
        assert!(!results.hits.is_empty());
        assert!(results.hits.len() <= 2);
        assert!(app.search("  ", None, None).await.is_err());

        assert!(app.delete_document(&document.id).await.unwrap() > 0);
        assert!(app.documents().is_empty());
        assert!(matches!(
            app.delete_document(&document.id).await,
            Err(Error::DocumentNotFound(_))
        ));
        assert!(app.search("chlorophyll", None, None).await.unwrap().hits.is_empty());
    }

    #[tokio::test]
    async fn test_clear_collection() {
        let dir = TempDir::new().unwrap();
        let app = study_assistant(&dir);
        app.process_upload("bio.txt", NOTES.as_bytes().to_vec()).await.unwrap();

        assert!(app.clear_collection().await.unwrap() > 0);
        assert!(app.documents().is_empty());
        assert_eq!(app.collection_info().status, "empty");
    }

    #[tokio::test]
    async fn test_kept_uploads_follow_documents() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.files.keep_uploads = true;
        let app = StudyAssistant::with_embedder(config, Arc::new(HashEmbedder::default())).unwrap();

        let status = app.process_upload("bio.txt", NOTES.as_bytes().to_vec()).await.unwrap();
        let FileIngestStatus::New { document, .. } = status else {
            panic!("expected new");
        };
        let stored = app.document(&document.id).unwrap().stored_uri.unwrap();
        assert!(Path::new(&stored).exists());

        app.delete_document(&document.id).await.unwrap();
        assert!(!Path::new(&stored).exists());
    }
}
