pub mod generator;
pub mod orchestrator;
pub mod prompt;

pub use generator::{AnswerGenerator, OpenAiGenerator};
pub use orchestrator::{
    DocumentReport, IngestReport, Pipeline, PipelineState, QueryOutcome, UploadedDocument,
};
pub use prompt::{Prompt, PromptAssembler};

use legal_rag_common::{RagConfig, Result};
use legal_rag_knowledge::{build_embedder, VectorStore};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// The pipeline plus the caller-owned state it operates on.
pub struct RagCore {
    pub pipeline: Arc<Pipeline>,
    pub state: Arc<RwLock<PipelineState>>,
}

impl RagCore {
    /// Build every component from `config`. A persisted store at
    /// `config.store_path` is loaded and the state starts out `Indexed`.
    pub async fn new(config: &RagConfig) -> Result<Self> {
        let generator: Arc<dyn AnswerGenerator> = Arc::new(OpenAiGenerator::new(config));
        Self::with_generator(config, generator).await
    }

    pub async fn with_generator(
        config: &RagConfig,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Result<Self> {
        config.validate()?;

        let embedder = build_embedder(config);
        let store = match config.store_location() {
            Some(path) => VectorStore::open(embedder, path, config.embedding_batch_size).await?,
            None => {
                info!("No store path configured; using a session-scoped in-memory store");
                VectorStore::in_memory(embedder, config.embedding_batch_size)
            }
        };

        let pipeline = Pipeline::new(config, Arc::new(store), generator)?;
        let state = pipeline.initial_state().await;
        info!("Pipeline initialised in state {:?}", state);

        Ok(Self {
            pipeline: Arc::new(pipeline),
            state: Arc::new(RwLock::new(state)),
        })
    }
}
