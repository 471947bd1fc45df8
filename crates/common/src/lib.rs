pub mod config;
pub mod error;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use config::{EmbeddingBackend, RagConfig};
pub use error::{RagError, Result};

/// Returned instead of an answer while nothing has been indexed.
pub const NOT_READY_MESSAGE: &str =
    "The document processing pipeline has not been set up. Please upload documents first.";

// Knowledge base types

/// Where a chunk came from. `source` is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    /// 1-based page number when the loader segments by page.
    pub page: Option<usize>,
    pub chunk_index: usize,
    /// Offset of the first character of the chunk within its page text.
    pub char_offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// One ranked retrieval result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub rank: usize,
    pub score: f32,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl SearchHit {
    /// Citation label such as `lease.pdf, page 3`.
    pub fn citation(&self) -> String {
        match self.metadata.page {
            Some(page) => format!("{}, page {}", self.metadata.source, page),
            None => self.metadata.source.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub text: String,
    pub sources: Vec<SearchHit>,
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

// API response types
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(page: Option<usize>) -> SearchHit {
        SearchHit {
            rank: 1,
            score: 0.9,
            text: "Governing law is India.".to_string(),
            metadata: ChunkMetadata {
                source: "contract.pdf".to_string(),
                page,
                chunk_index: 0,
                char_offset: 0,
            },
        }
    }

    #[test]
    fn test_citation_includes_page_when_known() {
        assert_eq!(hit(Some(3)).citation(), "contract.pdf, page 3");
        assert_eq!(hit(None).citation(), "contract.pdf");
    }

    #[test]
    fn test_api_response() {
        let response = ApiResponse::success("data");
        assert!(response.success);
        assert_eq!(response.data, Some("data"));
        assert!(response.error.is_none());
    }
}
