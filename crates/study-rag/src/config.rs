//! Configuration for the study assistant
//!
//! Values are layered: built-in defaults, then an optional TOML file named by
//! `STUDY_RAG_CONFIG`, then environment variables, then the `APP_ENV` profile.
//! [`RagConfig::validate`] runs last.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Environment variable naming an optional TOML config file
pub const CONFIG_FILE_ENV: &str = "STUDY_RAG_CONFIG";

/// File types accepted for upload
pub const SUPPORTED_FILE_TYPES: [&str; 4] = ["pdf", "docx", "pptx", "txt"];

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Deployment profile (set through `APP_ENV`)
    #[serde(default)]
    pub environment: Option<Environment>,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Gemini configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Vector store configuration
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,
    /// Upload configuration
    #[serde(default)]
    pub files: FileConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Caching, batching and timeouts
    #[serde(default)]
    pub performance: PerformanceConfig,
}

/// Deployment profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Verbose logging, answer cache off
    Development,
    /// Info logging, answer cache on
    Production,
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(Error::Config(format!("APP_ENV: unknown environment '{}'", other))),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Idle time after which a session is dropped (0 keeps sessions forever)
    pub session_idle_secs: u64,
    /// Live sessions kept at most; the least recently used goes first
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            session_idle_secs: 3600,
            max_sessions: 1000,
        }
    }
}

/// Gemini configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Google API key (never serialized)
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Generation model name
    #[serde(default = "default_model")]
    pub model: String,
    /// Temperature for answers, summaries and explanations
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum output tokens
    #[serde(default = "default_max_tokens")]
    pub max_output_tokens: u32,
    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_tokens(),
            base_url: default_base_url(),
            timeout_secs: default_llm_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl LlmConfig {
    /// Whether an API key is configured
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Embedding backend selection
///
/// The sentence-transformer is the default whenever the `onnx` feature is
/// compiled in; builds without it fall back to feature hashing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Offline feature hashing, for tests and air-gapped runs
    #[cfg_attr(not(feature = "onnx"), default)]
    Hashing,
    /// Gemini embedding API
    Gemini,
    /// Local ONNX sentence-transformer (requires the `onnx` feature)
    #[cfg_attr(feature = "onnx", default)]
    Onnx,
}

impl FromStr for EmbeddingBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hashing" | "hash" | "local" => Ok(Self::Hashing),
            "gemini" | "google" => Ok(Self::Gemini),
            "onnx" => Ok(Self::Onnx),
            other => Err(Error::Config(format!(
                "EMBEDDING_PROVIDER: unknown provider '{}' (expected hashing, gemini or onnx)",
                other
            ))),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which embedder to use
    pub provider: EmbeddingBackend,
    /// Sentence-transformer model for the ONNX backend
    pub model: String,
    /// Execution device for the ONNX backend
    pub device: String,
    /// Model for the Gemini backend
    pub gemini_model: String,
    /// Dimensions of the hashing backend
    pub hashing_dimensions: usize,
    /// Maximum token sequence length (ONNX)
    pub max_length: usize,
    /// Model cache directory (ONNX)
    pub cache_dir: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::default(),
            model: "all-MiniLM-L6-v2".to_string(),
            device: "cpu".to_string(),
            gemini_model: "text-embedding-004".to_string(),
            hashing_dimensions: 384,
            max_length: 256,
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("study-rag")
                .join("models"),
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// Directory holding collection files
    pub persist_dir: PathBuf,
    /// Collection name
    pub collection_name: String,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            persist_dir: PathBuf::from("./vector_store"),
            collection_name: "study_materials".to_string(),
        }
    }
}

impl VectorStoreConfig {
    /// Path of the collection's chunk file
    pub fn collection_path(&self) -> PathBuf {
        self.persist_dir.join(format!("{}.json", self.collection_name))
    }

    /// Path of the collection's document registry
    pub fn documents_path(&self) -> PathBuf {
        self.persist_dir
            .join(format!("{}_documents.json", self.collection_name))
    }
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Chunks retrieved per question
    pub default_k: usize,
    /// Upper bound for any caller-supplied k
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_k: 5,
            max_results: 10,
        }
    }
}

impl SearchConfig {
    /// Clamp a requested k into `1..=max_results`
    pub fn clamp_k(&self, k: Option<usize>) -> usize {
        k.unwrap_or(self.default_k).clamp(1, self.max_results.max(1))
    }
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Accepted extensions (lowercase, no dot)
    pub supported_types: Vec<String>,
    /// Maximum size of a single file in MB
    pub max_file_size_mb: u64,
    /// Maximum number of files in one upload
    pub max_files_per_upload: usize,
    /// Keep raw uploads on disk after extraction
    pub keep_uploads: bool,
    /// Where kept uploads are written
    pub upload_dir: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            supported_types: SUPPORTED_FILE_TYPES.iter().map(|s| s.to_string()).collect(),
            max_file_size_mb: 50,
            max_files_per_upload: 10,
            keep_uploads: false,
            upload_dir: PathBuf::from("./uploads"),
        }
    }
}

impl FileConfig {
    /// Maximum size of a single file in bytes
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    /// Whether an extension is accepted
    pub fn is_supported(&self, extension: &str) -> bool {
        let ext = extension.trim_start_matches('.').to_lowercase();
        self.supported_types.iter().any(|t| *t == ext)
    }

    /// Request body limit for multipart uploads
    pub fn upload_body_limit(&self) -> usize {
        let per_file = self.max_file_size_bytes() as usize;
        per_file
            .saturating_mul(self.max_files_per_upload.max(1))
            .saturating_add(1024 * 1024)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level name (DEBUG, INFO, WARNING, ERROR)
    pub level: String,
    /// Log file; `None` disables file logging
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: Some(PathBuf::from("study_assistant.log")),
        }
    }
}

impl LoggingConfig {
    /// Level as a tracing filter directive
    pub fn level_directive(&self) -> &'static str {
        match self.level.trim().to_uppercase().as_str() {
            "TRACE" => "trace",
            "DEBUG" => "debug",
            "WARN" | "WARNING" => "warn",
            "ERROR" | "CRITICAL" | "FATAL" => "error",
            _ => "info",
        }
    }
}

/// Caching, batching and timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Cache answers to repeated questions
    pub enable_caching: bool,
    /// Cache entry lifetime in seconds
    pub cache_ttl_secs: u64,
    /// Maximum cached answers
    pub cache_max_entries: usize,
    /// Chunks per embedding batch
    pub batch_size: usize,
    /// Per-file processing timeout in seconds
    pub timeout_secs: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            enable_caching: true,
            cache_ttl_secs: 3600,
            cache_max_entries: 1000,
            batch_size: 10,
            timeout_secs: 30,
        }
    }
}

impl RagConfig {
    /// Load from defaults, optional TOML file, environment and profile, then validate
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_FILE_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        config.apply_env_with(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Invalid config file {}: {}", path.display(), e))
        })
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        // LLM
        if let Some(v) = lookup("GOOGLE_API_KEY") {
            self.llm.api_key = v.trim().to_string();
        }
        if let Some(v) = var("GEMINI_MODEL") {
            self.llm.model = v.trim().to_string();
        }
        if let Some(v) = var("GEMINI_TEMPERATURE") {
            self.llm.temperature = parse_value("GEMINI_TEMPERATURE", &v)?;
        }
        if let Some(v) = var("GEMINI_MAX_TOKENS") {
            self.llm.max_output_tokens = parse_value("GEMINI_MAX_TOKENS", &v)?;
        }
        if let Some(v) = var("GEMINI_BASE_URL") {
            self.llm.base_url = v.trim().trim_end_matches('/').to_string();
        }
        if let Some(v) = var("LLM_TIMEOUT_SECONDS") {
            self.llm.timeout_secs = parse_value("LLM_TIMEOUT_SECONDS", &v)?;
        }
        if let Some(v) = var("LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_value("LLM_MAX_RETRIES", &v)?;
        }

        // Embeddings
        if let Some(v) = var("EMBEDDING_PROVIDER") {
            self.embeddings.provider = v.parse()?;
        }
        if let Some(v) = var("EMBEDDING_MODEL") {
            self.embeddings.model = v.trim().to_string();
        }
        if let Some(v) = var("EMBEDDING_DEVICE") {
            self.embeddings.device = v.trim().to_string();
        }
        if let Some(v) = var("GEMINI_EMBEDDING_MODEL") {
            self.embeddings.gemini_model = v.trim().to_string();
        }

        // Chunking
        if let Some(v) = var("CHUNK_SIZE") {
            self.chunking.chunk_size = parse_value("CHUNK_SIZE", &v)?;
        }
        if let Some(v) = var("CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = parse_value("CHUNK_OVERLAP", &v)?;
        }

        // Vector store
        if let Some(v) = var("VECTOR_STORE_PATH").or_else(|| var("CHROMA_PERSIST_DIR")) {
            self.vector_store.persist_dir = PathBuf::from(v.trim());
        }
        if let Some(v) = var("COLLECTION_NAME") {
            self.vector_store.collection_name = v.trim().to_string();
        }

        // Search
        if let Some(v) = var("DEFAULT_SEARCH_K") {
            self.search.default_k = parse_value("DEFAULT_SEARCH_K", &v)?;
        }
        if let Some(v) = var("MAX_SEARCH_RESULTS") {
            self.search.max_results = parse_value("MAX_SEARCH_RESULTS", &v)?;
        }

        // Files
        if let Some(v) = var("MAX_FILE_SIZE_MB") {
            self.files.max_file_size_mb = parse_value("MAX_FILE_SIZE_MB", &v)?;
        }
        if let Some(v) = var("MAX_FILES_PER_UPLOAD") {
            self.files.max_files_per_upload = parse_value("MAX_FILES_PER_UPLOAD", &v)?;
        }
        if let Some(v) = var("KEEP_UPLOADS") {
            self.files.keep_uploads = parse_bool("KEEP_UPLOADS", &v)?;
        }
        if let Some(v) = var("UPLOAD_DIR") {
            self.files.upload_dir = PathBuf::from(v.trim());
        }

        // Logging
        let level_set = var("LOG_LEVEL");
        if let Some(v) = &level_set {
            self.logging.level = v.trim().to_string();
        }
        if let Some(v) = lookup("LOG_FILE") {
            let v = v.trim();
            self.logging.file = if v.is_empty() { None } else { Some(PathBuf::from(v)) };
        }

        // Performance
        let caching_set = var("ENABLE_CACHING");
        if let Some(v) = &caching_set {
            self.performance.enable_caching = parse_bool("ENABLE_CACHING", v)?;
        }
        if let Some(v) = var("CACHE_TTL") {
            self.performance.cache_ttl_secs = parse_value("CACHE_TTL", &v)?;
        }
        if let Some(v) = var("CACHE_MAX_ENTRIES") {
            self.performance.cache_max_entries = parse_value("CACHE_MAX_ENTRIES", &v)?;
        }
        if let Some(v) = var("BATCH_SIZE") {
            self.performance.batch_size = parse_value("BATCH_SIZE", &v)?;
        }
        if let Some(v) = var("TIMEOUT_SECONDS") {
            self.performance.timeout_secs = parse_value("TIMEOUT_SECONDS", &v)?;
        }

        // Server
        if let Some(v) = var("HOST") {
            self.server.host = v.trim().to_string();
        }
        if let Some(v) = var("PORT") {
            self.server.port = parse_value("PORT", &v)?;
        }
        if let Some(v) = var("ENABLE_CORS") {
            self.server.enable_cors = parse_bool("ENABLE_CORS", &v)?;
        }
        if let Some(v) = var("SESSION_IDLE_SECONDS") {
            self.server.session_idle_secs = parse_value("SESSION_IDLE_SECONDS", &v)?;
        }
        if let Some(v) = var("MAX_SESSIONS") {
            self.server.max_sessions = parse_value("MAX_SESSIONS", &v)?;
        }

        // Profile fills in what was not set explicitly
        if let Some(v) = var("APP_ENV") {
            self.environment = Some(v.parse()?);
        }
        match self.environment {
            Some(Environment::Development) => {
                if level_set.is_none() {
                    self.logging.level = "DEBUG".to_string();
                }
                if caching_set.is_none() {
                    self.performance.enable_caching = false;
                }
            }
            Some(Environment::Production) => {
                if level_set.is_none() {
                    self.logging.level = "INFO".to_string();
                }
                if caching_set.is_none() {
                    self.performance.enable_caching = true;
                }
            }
            None => {}
        }

        Ok(())
    }

    /// Check invariants and create the vector store directory
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("CHUNK_SIZE must be positive".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "CHUNK_OVERLAP ({}) must be less than CHUNK_SIZE ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.search.default_k == 0 {
            return Err(Error::Config("DEFAULT_SEARCH_K must be positive".to_string()));
        }
        if self.search.max_results < self.search.default_k {
            return Err(Error::Config(format!(
                "MAX_SEARCH_RESULTS ({}) must be at least DEFAULT_SEARCH_K ({})",
                self.search.max_results, self.search.default_k
            )));
        }
        if self.files.max_file_size_mb == 0 {
            return Err(Error::Config("MAX_FILE_SIZE_MB must be positive".to_string()));
        }
        if self.files.max_files_per_upload == 0 {
            return Err(Error::Config("MAX_FILES_PER_UPLOAD must be positive".to_string()));
        }
        if self.server.max_sessions == 0 {
            return Err(Error::Config("MAX_SESSIONS must be positive".to_string()));
        }
        if self.performance.batch_size == 0 {
            return Err(Error::Config("BATCH_SIZE must be positive".to_string()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::Config(format!(
                "GEMINI_TEMPERATURE must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }
        if self.vector_store.collection_name.trim().is_empty()
            || self
                .vector_store
                .collection_name
                .contains(|c: char| c == '/' || c == '\\')
        {
            return Err(Error::Config(format!(
                "COLLECTION_NAME '{}' is not a valid name",
                self.vector_store.collection_name
            )));
        }

        std::fs::create_dir_all(&self.vector_store.persist_dir).map_err(|e| {
            Error::Config(format!(
                "Cannot create vector store directory {}: {}",
                self.vector_store.persist_dir.display(),
                e
            ))
        })?;

        Ok(())
    }
}

fn parse_value<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| Error::Config(format!("{}: invalid value '{}': {}", name, value, e)))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!(
            "{}: invalid boolean '{}'",
            name, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.llm.model, "gemini-2.5-pro");
        assert_eq!(config.llm.max_output_tokens, 8192);
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.search.default_k, 5);
        assert_eq!(config.files.max_files_per_upload, 10);
        assert_eq!(config.vector_store.collection_name, "study_materials");
        assert!(config.performance.enable_caching);
        assert!(config.files.is_supported("PDF"));
        assert!(config.files.is_supported(".txt"));
        assert!(!config.files.is_supported("exe"));
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("GOOGLE_API_KEY", "AIzaTestKey"),
            ("GEMINI_TEMPERATURE", "0.4"),
            ("CHUNK_SIZE", "500"),
            ("CHUNK_OVERLAP", "50"),
            ("CHROMA_PERSIST_DIR", "/tmp/legacy"),
            ("ENABLE_CACHING", "false"),
            ("EMBEDDING_PROVIDER", "gemini"),
            ("LOG_FILE", ""),
            ("MAX_SESSIONS", "25"),
        ]);
        let mut config = RagConfig::default();
        config.apply_env_with(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.llm.api_key, "AIzaTestKey");
        assert!((config.llm.temperature - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.vector_store.persist_dir, PathBuf::from("/tmp/legacy"));
        assert!(!config.performance.enable_caching);
        assert_eq!(config.embeddings.provider, EmbeddingBackend::Gemini);
        assert!(config.logging.file.is_none());
        assert_eq!(config.server.max_sessions, 25);
    }

    #[test]
    fn test_invalid_number_names_variable() {
        let vars = env(&[("CHUNK_SIZE", "lots")]);
        let mut config = RagConfig::default();
        let err = config.apply_env_with(|k| vars.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains("CHUNK_SIZE"));
    }

    #[test]
    fn test_development_profile_respects_explicit_values() {
        let vars = env(&[("APP_ENV", "development")]);
        let mut config = RagConfig::default();
        config.apply_env_with(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.logging.level, "DEBUG");
        assert!(!config.performance.enable_caching);

        let vars = env(&[("APP_ENV", "development"), ("ENABLE_CACHING", "true")]);
        let mut config = RagConfig::default();
        config.apply_env_with(|k| vars.get(k).cloned()).unwrap();
        assert!(config.performance.enable_caching);
    }

    #[test]
    fn test_validate_rejects_bad_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RagConfig::default();
        config.vector_store.persist_dir = dir.path().join("store");
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(config.validate().is_err());

        config.chunking.chunk_overlap = 100;
        config.validate().unwrap();
        assert!(config.vector_store.persist_dir.exists());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = LlmConfig::default();
        config.api_key = "AIzaVerySecret".to_string();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("AIzaVerySecret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_toml_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study.toml");
        std::fs::write(
            &path,
            "[chunking]\nchunk_size = 800\n\n[search]\ndefault_k = 3\n",
        )
        .unwrap();
        let config = RagConfig::from_file(&path).unwrap();
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.search.default_k, 3);
        assert_eq!(config.search.max_results, 10);
    }

    #[test]
    fn test_clamp_k() {
        let search = SearchConfig::default();
        assert_eq!(search.clamp_k(None), 5);
        assert_eq!(search.clamp_k(Some(0)), 1);
        assert_eq!(search.clamp_k(Some(50)), 10);
    }
}
