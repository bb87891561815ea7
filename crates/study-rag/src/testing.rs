//! Test doubles shared across module tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::app::StudyAssistant;
use crate::config::{EmbeddingBackend, RagConfig};
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, GenerationOptions, HashEmbedder, LlmProvider};

/// LLM stub that records prompts and replays canned replies
pub(crate) struct MockLlm {
    replies: Mutex<Vec<Result<String>>>,
    pub prompts: Mutex<Vec<(String, GenerationOptions)>>,
}

impl MockLlm {
    pub fn new(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        self.prompts.lock().push((prompt.to_string(), *options));
        let mut replies = self.replies.lock();
        if replies.is_empty() {
            return Ok("Mock reply".to_string());
        }
        // the last reply repeats
        if replies.len() == 1 {
            return match &replies[0] {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(Error::Llm(e.to_string())),
            };
        }
        replies.remove(0)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

/// Hashing embedder that can be switched to fail or stall
#[derive(Default)]
pub(crate) struct FlakyEmbedder {
    inner: HashEmbedder,
    pub fail: AtomicBool,
    pub delay_ms: AtomicU64,
}

impl FlakyEmbedder {
    pub fn failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn stalling(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Embedding("HTTP 429 - quota exceeded for AIzaTestKey".to_string()));
        }
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "flaky"
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}

/// Config rooted in a temp dir with the offline embedder
pub(crate) fn test_config(dir: &TempDir) -> RagConfig {
    let mut config = RagConfig::default();
    config.vector_store.persist_dir = dir.path().join("vector_store");
    config.vector_store.collection_name = "test_materials".to_string();
    config.files.upload_dir = dir.path().join("uploads");
    config.logging.file = None;
    config.embeddings.provider = EmbeddingBackend::Hashing;
    config
}

/// Assistant over a fresh temp directory
pub(crate) fn study_assistant(dir: &TempDir) -> StudyAssistant {
    StudyAssistant::with_embedder(test_config(dir), Arc::new(HashEmbedder::default()))
        .expect("assistant")
}
