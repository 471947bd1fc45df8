use thiserror::Error;

/// Failure taxonomy shared by every pipeline stage.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("Failed to load document '{document}': {message}")]
    Load { document: String, message: String },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store not found: {0}")]
    StoreNotFound(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RagError {
    pub fn load(document: impl Into<String>, message: impl ToString) -> Self {
        RagError::Load {
            document: document.into(),
            message: message.to_string(),
        }
    }

    /// Stable machine-readable code, used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            RagError::Load { .. } => "LOAD_ERROR",
            RagError::Embedding(_) => "EMBEDDING_ERROR",
            RagError::StoreNotFound(_) => "STORE_NOT_FOUND",
            RagError::Store(_) => "STORE_ERROR",
            RagError::Generation(_) => "GENERATION_ERROR",
            RagError::InvalidInput(_) => "INVALID_INPUT",
            RagError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

impl From<config::ConfigError> for RagError {
    fn from(err: config::ConfigError) -> Self {
        RagError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
