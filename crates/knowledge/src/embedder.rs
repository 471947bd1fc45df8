use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use legal_rag_common::{EmbeddingBackend, RagConfig, RagError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Maps text to fixed-length vectors. Implementations must be deterministic
/// for a given model and input.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier recorded alongside persisted vectors.
    fn model_id(&self) -> &str;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("no embedding returned".to_string()))
    }
}

pub fn build_embedder(config: &RagConfig) -> Arc<dyn Embedder> {
    match config.embedding_backend {
        EmbeddingBackend::Remote => Arc::new(RemoteEmbedder::new(config)),
        EmbeddingBackend::Hashed => Arc::new(HashEmbedder::new(
            config.embedding_dimension,
            config.embedding_max_chars,
        )),
    }
}

fn check_length(text: &str, max_chars: usize) -> Result<()> {
    let len = text.chars().count();
    if len > max_chars {
        return Err(RagError::Embedding(format!(
            "input of {} characters exceeds the model limit of {}",
            len, max_chars
        )));
    }
    Ok(())
}

/// Embeddings from an OpenAI-compatible `/embeddings` endpoint.
pub struct RemoteEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    max_chars: usize,
    timeout: Duration,
}

impl RemoteEmbedder {
    pub fn new(config: &RagConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_base(&config.embedding_api_base);
        if let Some(key) = &config.embedding_api_key {
            openai_config = openai_config.with_api_key(key);
        }

        info!(
            "Using remote embedding model '{}' at {}",
            config.embedding_model, config.embedding_api_base
        );

        Self {
            client: Client::with_config(openai_config),
            model: config.embedding_model.clone(),
            max_chars: config.embedding_max_chars,
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        for text in texts {
            check_length(text, self.max_chars)?;
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(texts.to_vec())
            .build()
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.embeddings().create(request))
            .await
            .map_err(|_| {
                error!("Embedding request timed out after {:?}", self.timeout);
                RagError::Embedding(format!("request timed out after {:?}", self.timeout))
            })?
            .map_err(|e| {
                error!("Embedding API error: {}", e);
                RagError::Embedding(e.to_string())
            })?;

        let mut data = response.data;
        if data.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, received {}",
                texts.len(),
                data.len()
            )));
        }
        data.sort_by_key(|embedding| embedding.index);

        debug!("Embedded {} texts with '{}'", texts.len(), self.model);
        Ok(data.into_iter().map(|embedding| embedding.embedding).collect())
    }
}

/// Feature-hashing embedder: each lower-cased alphanumeric token adds ±1 to
/// one bucket, and the result is L2-normalised. No model download, no
/// network, fully deterministic.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
    max_chars: usize,
    model_id: String,
}

impl HashEmbedder {
    pub fn new(dimension: usize, max_chars: usize) -> Self {
        Self {
            dimension,
            max_chars,
            model_id: format!("hashed-{}", dimension),
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(token.to_lowercase().as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|text| {
                check_length(text, self.max_chars)?;
                Ok(self.vectorize(text))
            })
            .collect()
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes
        .iter()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(PRIME))
}
