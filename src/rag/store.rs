//! Search and ingestion seams for the manual index.
//!
//! The retrieval step only needs [`ManualSearch`]; the admin and seed
//! tooling additionally write through [`ManualIndex`].

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::LlmError;
use crate::schema::ManualChunk;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("vector store request failed: {0}")]
    Transport(String),
    #[error("vector store returned HTTP {status}: {body}")]
    Backend { status: u16, body: String },
    #[error("embedding failed: {0}")]
    Embedding(#[from] LlmError),
    #[error("invalid vector store payload: {0}")]
    InvalidPayload(String),
}

/// Best-effort nearest-passage lookup.
#[async_trait]
pub trait ManualSearch: Send + Sync {
    /// Returns at most `limit` passages, most relevant first. An empty result
    /// is not an error.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ManualChunk>, SearchError>;
}

#[async_trait]
pub trait ManualIndex: ManualSearch {
    /// Read-only view handed to the retrieval step.
    fn as_search(&self) -> &dyn ManualSearch;

    /// Embeds and stores chunks, replacing any with the same chunk id.
    async fn upsert(&self, chunks: Vec<ManualChunk>) -> Result<usize, SearchError>;

    async fn count(&self) -> Result<usize, SearchError>;

    /// Distinct source document names, sorted.
    async fn list_sources(&self) -> Result<Vec<String>, SearchError>;
}
