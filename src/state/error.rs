use thiserror::Error;

use crate::core::config::ConfigError;
use crate::llm::LlmError;
use crate::rag::SearchError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to initialize LLM client: {0}")]
    Llm(#[from] LlmError),

    #[error("Failed to initialize vector store: {0}")]
    VectorStore(#[from] SearchError),
}
