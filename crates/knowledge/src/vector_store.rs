//! Vector store: (vector, text, metadata) entries with cosine search.
//!
//! The store is either absent (nothing indexed yet) or built. When a path is
//! configured the whole index is written as one JSON artifact with a format
//! version and parallel `vectors` / `texts` / `metadata` arrays.

use crate::embedder::Embedder;
use crate::semantic_search;
use legal_rag_common::{Chunk, ChunkMetadata, RagError, Result, SearchHit};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

pub const STORE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexSnapshot {
    format_version: u32,
    embedding_model: String,
    dimension: usize,
    vectors: Vec<Vec<f32>>,
    texts: Vec<String>,
    metadata: Vec<ChunkMetadata>,
}

impl IndexSnapshot {
    fn empty(embedding_model: &str, dimension: usize) -> Self {
        Self {
            format_version: STORE_FORMAT_VERSION,
            embedding_model: embedding_model.to_string(),
            dimension,
            vectors: Vec::new(),
            texts: Vec::new(),
            metadata: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn validate(&self, expected_model: &str) -> Result<()> {
        if self.format_version != STORE_FORMAT_VERSION {
            return Err(RagError::Store(format!(
                "unsupported store format version {} (expected {})",
                self.format_version, STORE_FORMAT_VERSION
            )));
        }
        if self.embedding_model != expected_model {
            return Err(RagError::Store(format!(
                "store was built with embedding model '{}' but '{}' is configured",
                self.embedding_model, expected_model
            )));
        }
        if self.texts.len() != self.vectors.len() || self.metadata.len() != self.vectors.len() {
            return Err(RagError::Store(format!(
                "corrupt store: {} vectors, {} texts, {} metadata entries",
                self.vectors.len(),
                self.texts.len(),
                self.metadata.len()
            )));
        }
        if let Some(bad) = self.vectors.iter().position(|v| v.len() != self.dimension) {
            return Err(RagError::Store(format!(
                "corrupt store: vector {} does not have dimension {}",
                bad, self.dimension
            )));
        }
        Ok(())
    }
}

pub struct VectorStore {
    embedder: Arc<dyn Embedder>,
    path: Option<PathBuf>,
    batch_size: usize,
    index: RwLock<Option<Arc<IndexSnapshot>>>,
    writer: Mutex<()>,
}

impl VectorStore {
    /// Session-scoped store that is never written to disk.
    pub fn in_memory(embedder: Arc<dyn Embedder>, batch_size: usize) -> Self {
        Self {
            embedder,
            path: None,
            batch_size: batch_size.max(1),
            index: RwLock::new(None),
            writer: Mutex::new(()),
        }
    }

    /// Store backed by `path`. An existing artifact is loaded and validated;
    /// a missing one leaves the store absent until the first `index` call.
    pub async fn open(
        embedder: Arc<dyn Embedder>,
        path: impl Into<PathBuf>,
        batch_size: usize,
    ) -> Result<Self> {
        let path = path.into();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: IndexSnapshot = serde_json::from_slice(&bytes).map_err(|e| {
                    RagError::Store(format!("failed to parse {}: {}", path.display(), e))
                })?;
                snapshot.validate(embedder.model_id())?;
                info!(
                    "Loaded vector store from {} ({} entries)",
                    path.display(),
                    snapshot.len()
                );
                Some(Arc::new(snapshot))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No vector store at {}; starting empty", path.display());
                None
            }
            Err(e) => {
                return Err(RagError::Store(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        Ok(Self {
            embedder,
            path: Some(path),
            batch_size: batch_size.max(1),
            index: RwLock::new(snapshot),
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn embedding_model(&self) -> &str {
        self.embedder.model_id()
    }

    pub async fn is_built(&self) -> bool {
        self.index.read().await.is_some()
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.as_ref().map_or(0, |s| s.len())
    }

    /// Distinct source identifiers, in the order they were first indexed.
    pub async fn sources(&self) -> Vec<String> {
        let guard = self.index.read().await;
        let mut sources: Vec<String> = Vec::new();
        if let Some(snapshot) = guard.as_ref() {
            for meta in &snapshot.metadata {
                if !sources.contains(&meta.source) {
                    sources.push(meta.source.clone());
                }
            }
        }
        sources
    }

    /// Embed and append `chunks`, then persist. Calls are serialised; the new
    /// entries become visible to `search` only once the artifact is written.
    /// On any failure the store is left as it was.
    pub async fn index(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let _writer = self.writer.lock().await;

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embedder.embed_batch(batch).await?);
        }
        if vectors.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, received {}",
                texts.len(),
                vectors.len()
            )));
        }

        let current = self.index.read().await.clone();
        let mut next = match current {
            Some(snapshot) => (*snapshot).clone(),
            None => {
                let dimension = vectors[0].len();
                if dimension == 0 {
                    return Err(RagError::Embedding("model returned empty vectors".to_string()));
                }
                IndexSnapshot::empty(self.embedder.model_id(), dimension)
            }
        };

        for (chunk, vector) in chunks.iter().zip(vectors) {
            if vector.len() != next.dimension {
                return Err(RagError::Store(format!(
                    "embedding dimension {} does not match index dimension {}",
                    vector.len(),
                    next.dimension
                )));
            }
            next.vectors.push(vector);
            next.texts.push(chunk.text.clone());
            next.metadata.push(chunk.metadata.clone());
        }

        if let Some(path) = &self.path {
            persist(path, &next).await?;
        }

        let total = next.len();
        *self.index.write().await = Some(Arc::new(next));

        info!("Indexed {} chunks ({} entries total)", chunks.len(), total);
        Ok(chunks.len())
    }

    /// Top-`k` entries by cosine similarity to `query`, best first.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let snapshot = self.index.read().await.clone().ok_or_else(|| {
            RagError::StoreNotFound("no documents have been indexed yet".to_string())
        })?;

        if k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;
        if query_vector.len() != snapshot.dimension {
            return Err(RagError::Embedding(format!(
                "query embedding dimension {} does not match index dimension {}",
                query_vector.len(),
                snapshot.dimension
            )));
        }

        let hits: Vec<SearchHit> = semantic_search::top_k(&query_vector, &snapshot.vectors, k)
            .into_iter()
            .enumerate()
            .map(|(rank, (idx, score))| SearchHit {
                rank: rank + 1,
                score,
                text: snapshot.texts[idx].clone(),
                metadata: snapshot.metadata[idx].clone(),
            })
            .collect();

        debug!(
            "Search returned {} of {} entries (k = {})",
            hits.len(),
            snapshot.len(),
            k
        );
        Ok(hits)
    }
}

// Write to a sibling temp file, then rename over the artifact.
async fn persist(path: &Path, snapshot: &IndexSnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RagError::Store(format!("failed to create {}: {}", parent.display(), e)))?;
        }
    }

    let bytes = serde_json::to_vec(snapshot)
        .map_err(|e| RagError::Store(format!("failed to serialise store: {}", e)))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(|e| RagError::Store(format!("failed to write {}: {}", tmp.display(), e)))?;

    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        warn!("Failed to move {} into place: {}", tmp.display(), e);
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(RagError::Store(format!(
            "failed to replace {}: {}",
            path.display(),
            e
        )));
    }

    debug!("Persisted {} entries to {}", snapshot.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashEmbedder;

    fn embedder() -> Arc<dyn Embedder> {
        Arc::new(HashEmbedder::new(256, 10_000))
    }

    fn chunk(source: &str, index: usize, text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            metadata: ChunkMetadata {
                source: source.to_string(),
                page: Some(1),
                chunk_index: index,
                char_offset: 0,
            },
        }
    }

    fn temp_store_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("legal-rag-test-{}", uuid::Uuid::new_v4()))
            .join("store.json")
    }

    #[tokio::test]
    async fn test_search_before_index_fails() {
        let store = VectorStore::in_memory(embedder(), 8);
        let err = store.search("anything", 3).await.unwrap_err();
        assert!(matches!(err, RagError::StoreNotFound(_)));
        assert!(!store.is_built().await);
    }

    #[tokio::test]
    async fn test_indexing_nothing_keeps_store_absent() {
        let store = VectorStore::in_memory(embedder(), 8);
        assert_eq!(store.index(&[]).await.unwrap(), 0);
        assert!(!store.is_built().await);
    }

    #[tokio::test]
    async fn test_fewer_entries_than_k_returns_all_ranked() {
        let store = VectorStore::in_memory(embedder(), 2);
        store
            .index(&[
                chunk("a.pdf", 0, "Clause 2: Data privacy is a top priority."),
                chunk("b.pdf", 0, "Clause 1: Governing law is India."),
                chunk("c.pdf", 0, "Clause 3: All users must agree to the terms."),
            ])
            .await
            .unwrap();

        let hits = store.search("What is the governing law?", 5).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].metadata.source, "b.pdf");
        assert!(hits[0].text.contains("Governing law is India"));
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(
            hits.iter().map(|h| h.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[tokio::test]
    async fn test_equal_scores_keep_insertion_order() {
        let store = VectorStore::in_memory(embedder(), 8);
        store
            .index(&[
                chunk("first.pdf", 0, "identical clause text"),
                chunk("second.pdf", 0, "identical clause text"),
            ])
            .await
            .unwrap();

        let hits = store.search("identical clause text", 2).await.unwrap();
        assert_eq!(hits[0].metadata.source, "first.pdf");
        assert_eq!(hits[1].metadata.source, "second.pdf");
    }

    #[tokio::test]
    async fn test_index_appends_and_tracks_sources() {
        let store = VectorStore::in_memory(embedder(), 8);
        store.index(&[chunk("a.pdf", 0, "alpha")]).await.unwrap();
        store
            .index(&[chunk("b.pdf", 0, "beta"), chunk("a.pdf", 1, "gamma")])
            .await
            .unwrap();

        assert_eq!(store.len().await, 3);
        assert_eq!(store.sources().await, vec!["a.pdf", "b.pdf"]);
    }

    #[tokio::test]
    async fn test_persist_and_reload() {
        let path = temp_store_path();

        let store = VectorStore::open(embedder(), &path, 8).await.unwrap();
        assert!(!store.is_built().await);
        store
            .index(&[chunk("contract.pdf", 0, "Clause 1: Governing law is India.")])
            .await
            .unwrap();
        assert!(path.exists());

        let reopened = VectorStore::open(embedder(), &path, 8).await.unwrap();
        assert_eq!(reopened.len().await, 1);
        let hits = reopened.search("governing law", 1).await.unwrap();
        assert_eq!(hits[0].metadata.source, "contract.pdf");

        reopened
            .index(&[chunk("other.pdf", 0, "Clause 9: Notices in writing.")])
            .await
            .unwrap();
        let again = VectorStore::open(embedder(), &path, 8).await.unwrap();
        assert_eq!(again.len().await, 2);

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["format_version"], STORE_FORMAT_VERSION);
        assert_eq!(raw["texts"].as_array().unwrap().len(), 2);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_index_calls_are_serialised() {
        let path = temp_store_path();
        let store = Arc::new(VectorStore::open(embedder(), &path, 2).await.unwrap());

        let writers = 16;
        let per_batch = 5;
        let handles: Vec<_> = (0..writers)
            .map(|w| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let batch: Vec<Chunk> = (0..per_batch)
                        .map(|i| chunk(&format!("doc-{}.txt", w), i, &format!("clause {} of {}", i, w)))
                        .collect();
                    store.index(&batch).await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), per_batch);
        }

        assert_eq!(store.len().await, writers * per_batch);
        assert_eq!(store.sources().await.len(), writers);

        let reopened = VectorStore::open(embedder(), &path, 2).await.unwrap();
        assert_eq!(reopened.len().await, writers * per_batch);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_model_mismatch_is_rejected() {
        let path = temp_store_path();
        let store = VectorStore::open(embedder(), &path, 8).await.unwrap();
        store.index(&[chunk("a.pdf", 0, "alpha")]).await.unwrap();

        let other: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(32, 10_000));
        let result = VectorStore::open(other, &path, 8).await;
        assert!(matches!(result, Err(RagError::Store(_))));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_artifact_is_rejected() {
        let path = temp_store_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{ not json").unwrap();

        let result = VectorStore::open(embedder(), &path, 8).await;
        assert!(matches!(result, Err(RagError::Store(_))));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_failed_embedding_leaves_store_unchanged() {
        let small: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(64, 20));
        let store = VectorStore::in_memory(small, 8);
        store.index(&[chunk("a.pdf", 0, "short")]).await.unwrap();

        let err = store
            .index(&[chunk("b.pdf", 0, "this chunk is far too long for the model")])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
        assert_eq!(store.len().await, 1);
    }
}
