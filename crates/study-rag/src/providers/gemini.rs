//! Gemini API client for generation and embeddings
//!
//! Talks to the public Generative Language API with an API key
//! (`x-goog-api-key`). Requests are retried with exponential backoff on
//! transport errors, 429 and 5xx responses.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::{GenerationOptions, LlmProvider};

/// Maximum texts per `batchEmbedContents` call
const MAX_EMBED_BATCH: usize = 100;

/// Dimensions of `text-embedding-004`
const GEMINI_EMBEDDING_DIMENSIONS: usize = 768;

/// Outcome of a single attempt
enum Attempt {
    Retry(Error),
    Fail(Error),
}

/// Shared HTTP plumbing
#[derive(Clone)]
struct GeminiHttp {
    client: Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
}

impl GeminiHttp {
    fn new(config: &LlmConfig, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            max_retries: config.max_retries,
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, Attempt>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(Attempt::Fail(e)) => return Err(e),
                Err(Attempt::Retry(e)) => {
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        let delay = Duration::from_secs(2u64.pow(attempt));
                        tracing::warn!(
                            "Gemini request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            self.max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Llm("Unknown error".to_string())))
    }

    /// POST a JSON body and decode the JSON reply
    async fn post_json<B, R>(&self, url: &str, body: &B, wrap: fn(String) -> Error) -> Result<R>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        self.retry_request(|| async move {
            let response = self
                .client
                .post(url)
                .header("x-goog-api-key", &self.api_key)
                .json(body)
                .send()
                .await
                .map_err(|e| Attempt::Retry(wrap(format!("Request failed: {}", e))))?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                let err = wrap(format!("HTTP {} - {}", status, text));
                return Err(if is_retryable(status) {
                    Attempt::Retry(err)
                } else {
                    Attempt::Fail(err)
                });
            }

            response
                .json::<R>()
                .await
                .map_err(|e| Attempt::Fail(wrap(format!("Failed to parse response: {}", e))))
        })
        .await
    }

    async fn model_available(&self, model: &str) -> bool {
        let url = format!("{}/v1beta/models/{}", self.base_url, model);
        match self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback", default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(rename = "finishReason", default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason", default)]
    block_reason: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, all parts joined
    fn into_text(self) -> Result<String> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(Error::Llm(format!("Prompt blocked: {}", reason)));
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::Llm("No candidates in Gemini response".to_string()))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(Error::Llm(format!(
                "No text in Gemini response (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(text)
    }
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    http: GeminiHttp,
    model: String,
}

impl GeminiClient {
    /// Create a client for `config.model` using `api_key`
    pub fn new(config: &LlmConfig, api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config("GOOGLE_API_KEY is not set".to_string()));
        }
        Ok(Self {
            http: GeminiHttp::new(config, api_key)?,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let url = self.http.model_url(&self.model, "generateContent");
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_output_tokens,
                response_mime_type: "text/plain",
            },
        };

        tracing::debug!(
            "Generating with {} (temperature {}, max tokens {})",
            self.model,
            options.temperature,
            options.max_output_tokens
        );

        let response: GenerateResponse = self.http.post_json(&url, &request, Error::Llm).await?;
        response.into_text()
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.http.model_available(&self.model).await)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
    #[serde(rename = "taskType")]
    task_type: &'static str,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Gemini embedding provider (`embedContent` / `batchEmbedContents`)
pub struct GeminiEmbedder {
    http: GeminiHttp,
    model: String,
    dimensions: usize,
}

impl GeminiEmbedder {
    /// Create an embedder for `embeddings.gemini_model`
    pub fn new(llm: &LlmConfig, embeddings: &EmbeddingConfig) -> Result<Self> {
        if !llm.has_api_key() {
            return Err(Error::Config(
                "EMBEDDING_PROVIDER=gemini requires GOOGLE_API_KEY".to_string(),
            ));
        }
        Ok(Self {
            http: GeminiHttp::new(llm, &llm.api_key)?,
            model: embeddings.gemini_model.clone(),
            dimensions: GEMINI_EMBEDDING_DIMENSIONS,
        })
    }

    fn request(&self, text: &str, task_type: &'static str) -> EmbedRequest {
        EmbedRequest {
            model: format!("models/{}", self.model),
            content: Content {
                role: None,
                parts: vec![Part {
                    text: Some(text.to_string()),
                }],
            },
            task_type,
        }
    }

    async fn embed_one(&self, text: &str, task_type: &'static str) -> Result<Vec<f32>> {
        let url = self.http.model_url(&self.model, "embedContent");
        let request = self.request(text, task_type);
        let response: EmbedResponse = self
            .http
            .post_json(&url, &request, Error::Embedding)
            .await?;
        Ok(response.embedding.values)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_one(text, "RETRIEVAL_DOCUMENT").await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.http.model_url(&self.model, "batchEmbedContents");
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_EMBED_BATCH) {
            let request = BatchEmbedRequest {
                requests: batch
                    .iter()
                    .map(|t| self.request(t, "RETRIEVAL_DOCUMENT"))
                    .collect(),
            };
            let response: BatchEmbedResponse = self
                .http
                .post_json(&url, &request, Error::Embedding)
                .await?;

            if response.embeddings.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    response.embeddings.len()
                )));
            }
            all_embeddings.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        Ok(all_embeddings)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embed_one(query, "RETRIEVAL_QUERY").await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.http.model_available(&self.model).await)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
