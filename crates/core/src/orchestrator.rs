use crate::generator::AnswerGenerator;
use crate::prompt::PromptAssembler;
use legal_rag_common::{Answer, RagConfig, RagError, Result, SearchHit, NOT_READY_MESSAGE};
use legal_rag_knowledge::{DocumentProcessor, TextChunker, VectorStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Caller-owned pipeline state. There is no transition back to `Empty`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Empty,
    Indexed { documents: Vec<String>, chunks: usize },
}

impl PipelineState {
    pub fn is_ready(&self) -> bool {
        matches!(self, PipelineState::Indexed { .. })
    }
}

/// One uploaded file, as received from the caller.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub source: String,
    pub pages: usize,
    pub chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub documents: Vec<DocumentReport>,
    pub chunks_indexed: usize,
    pub total_chunks: usize,
}

#[derive(Debug, Clone)]
pub enum QueryOutcome {
    NotReady(String),
    Answered(Answer),
}

/// Wires loader, chunker, store, prompt assembler and generator into the
/// ingest and answer operations.
pub struct Pipeline {
    top_k: usize,
    max_query_chars: usize,
    processor: DocumentProcessor,
    chunker: TextChunker,
    store: Arc<VectorStore>,
    assembler: PromptAssembler,
    generator: Arc<dyn AnswerGenerator>,
}

impl Pipeline {
    pub fn new(
        config: &RagConfig,
        store: Arc<VectorStore>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Result<Self> {
        Ok(Self {
            top_k: config.top_k,
            max_query_chars: config.embedding_max_chars,
            processor: DocumentProcessor::new(),
            chunker: TextChunker::from_config(config)?,
            store,
            assembler: PromptAssembler::new(),
            generator,
        })
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// State matching whatever the store already holds, so a persisted index
    /// is queryable right after start-up.
    pub async fn initial_state(&self) -> PipelineState {
        if self.store.is_built().await {
            PipelineState::Indexed {
                documents: self.store.sources().await,
                chunks: self.store.len().await,
            }
        } else {
            PipelineState::Empty
        }
    }

    /// Load, chunk and index `uploads` as one batch. Any failure aborts the
    /// batch before the store is touched and leaves `state` unchanged.
    pub async fn ingest(
        &self,
        state: &mut PipelineState,
        uploads: Vec<UploadedDocument>,
    ) -> Result<IngestReport> {
        if uploads.is_empty() {
            return Err(RagError::InvalidInput("no documents were uploaded".to_string()));
        }

        info!("Ingesting batch of {} documents", uploads.len());

        let mut reports = Vec::with_capacity(uploads.len());
        let mut chunks = Vec::new();
        for upload in uploads {
            let document = self
                .processor
                .load_bytes(&upload.name, upload.bytes)
                .await
                .map_err(|e| {
                    warn!("Aborting batch: {}", e);
                    e
                })?;

            let document_chunks = self.chunker.chunk_document(&document);
            if document_chunks.is_empty() {
                return Err(RagError::load(&document.source, "no extractable text"));
            }

            reports.push(DocumentReport {
                source: document.source.clone(),
                pages: document.page_count(),
                chunks: document_chunks.len(),
            });
            chunks.extend(document_chunks);
        }

        let chunks_indexed = self.store.index(&chunks).await.map_err(|e| {
            error!("Indexing failed: {}", e);
            e
        })?;

        let total_chunks = self.store.len().await;
        *state = PipelineState::Indexed {
            documents: self.store.sources().await,
            chunks: total_chunks,
        };

        info!(
            "Batch indexed: {} chunks from {} documents ({} total)",
            chunks_indexed,
            reports.len(),
            total_chunks
        );

        Ok(IngestReport {
            documents: reports,
            chunks_indexed,
            total_chunks,
        })
    }

    /// Top-`k` retrieved passages without generation.
    pub async fn search(
        &self,
        state: &PipelineState,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<SearchHit>> {
        if !state.is_ready() {
            return Err(RagError::StoreNotFound(NOT_READY_MESSAGE.to_string()));
        }
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::InvalidInput("query must not be empty".to_string()));
        }
        let query_chars = query.chars().count();
        if query_chars > self.max_query_chars {
            return Err(RagError::InvalidInput(format!(
                "query of {} characters exceeds the limit of {}",
                query_chars, self.max_query_chars
            )));
        }
        self.store.search(query, top_k.unwrap_or(self.top_k)).await
    }

    /// Retrieve, assemble and generate. While `Empty` this returns the
    /// not-ready message without embedding or calling the generator.
    pub async fn answer(
        &self,
        state: &PipelineState,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<QueryOutcome> {
        if !state.is_ready() {
            debug!("Query received before any documents were indexed");
            return Ok(QueryOutcome::NotReady(NOT_READY_MESSAGE.to_string()));
        }

        let hits = self.search(state, query, top_k).await?;
        debug!("Retrieved {} passages for query", hits.len());

        let prompt = self.assembler.assemble(query, &hits);
        let text = self.generator.generate(&prompt).await?;

        info!(
            "Answered query using {} passages with '{}'",
            hits.len(),
            self.generator.model_id()
        );

        Ok(QueryOutcome::Answered(Answer {
            question: query.trim().to_string(),
            text,
            sources: hits,
            model: self.generator.model_id().to_string(),
            generated_at: chrono::Utc::now(),
        }))
    }
}
