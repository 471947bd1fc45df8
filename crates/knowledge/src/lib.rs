//! Knowledge base module: document loading, chunking, embedding and vector search

pub mod chunker;
pub mod document_processor;
pub mod embedder;
pub mod semantic_search;
pub mod vector_store;

pub use chunker::{TextChunker, TextSpan};
pub use document_processor::{DocumentFormat, DocumentProcessor, LoadedDocument};
pub use embedder::{build_embedder, Embedder, HashEmbedder, RemoteEmbedder};
pub use vector_store::{VectorStore, STORE_FORMAT_VERSION};
