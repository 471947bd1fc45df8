use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

const ENV_PREFIX: &str = "RAG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// OpenAI-compatible `/embeddings` endpoint serving the configured model.
    Remote,
    /// Local feature-hashing embedder, no network access.
    Hashed,
}

/// Named configuration for the whole pipeline.
///
/// Loaded from `RAG_*` environment variables (after `.env` is applied by the
/// binary). Every field has a default so a bare environment still starts.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,

    pub embedding_backend: EmbeddingBackend,
    pub embedding_api_base: String,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub embedding_max_chars: usize,
    pub embedding_batch_size: usize,

    pub llm_api_base: String,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub api_key: Option<String>,

    pub request_timeout_secs: u64,
    /// Empty string keeps the index in memory for the lifetime of the process.
    pub store_path: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            embedding_backend: EmbeddingBackend::Remote,
            embedding_api_base: "http://localhost:8080/v1".to_string(),
            embedding_api_key: None,
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            embedding_dimension: 384,
            embedding_max_chars: 8000,
            embedding_batch_size: 32,
            llm_api_base: "https://api.groq.com/openai/v1".to_string(),
            llm_model: "llama3-70b-8192".to_string(),
            llm_temperature: 0.0,
            llm_max_tokens: 1024,
            api_key: None,
            request_timeout_secs: 120,
            store_path: "data/vector_store.json".to_string(),
        }
    }
}

impl RagConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let mut cfg = Self::from_settings(settings)?;

        if cfg.api_key.is_none() {
            cfg.api_key = std::env::var("GROQ_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok()
                .filter(|key| !key.is_empty());
        }
        if cfg.api_key.is_none() {
            warn!("No LLM API key configured; answer generation will fail until one is set");
        }

        debug!("Loaded configuration: {:?}", cfg);
        Ok(cfg)
    }

    pub fn from_settings(settings: config::Config) -> Result<Self> {
        let cfg: RagConfig = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Configuration("chunk_size must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        // Every chunk must fit in one embedding request.
        if self.chunk_size > self.embedding_max_chars {
            return Err(RagError::Configuration(format!(
                "chunk_size ({}) exceeds embedding_max_chars ({})",
                self.chunk_size, self.embedding_max_chars
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Configuration("top_k must be positive".into()));
        }
        if self.embedding_dimension == 0 {
            return Err(RagError::Configuration(
                "embedding_dimension must be positive".into(),
            ));
        }
        if self.embedding_batch_size == 0 {
            return Err(RagError::Configuration(
                "embedding_batch_size must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn store_location(&self) -> Option<PathBuf> {
        let trimmed = self.store_path.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    }
}

// Keys stay out of logs.
impl fmt::Debug for RagConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RagConfig")
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("top_k", &self.top_k)
            .field("embedding_backend", &self.embedding_backend)
            .field("embedding_api_base", &self.embedding_api_base)
            .field("embedding_api_key", &self.embedding_api_key.as_ref().map(|_| "<redacted>"))
            .field("embedding_model", &self.embedding_model)
            .field("embedding_dimension", &self.embedding_dimension)
            .field("embedding_max_chars", &self.embedding_max_chars)
            .field("embedding_batch_size", &self.embedding_batch_size)
            .field("llm_api_base", &self.llm_api_base)
            .field("llm_model", &self.llm_model)
            .field("llm_temperature", &self.llm_temperature)
            .field("llm_max_tokens", &self.llm_max_tokens)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("store_path", &self.store_path)
            .finish()
    }
}
