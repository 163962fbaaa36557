use async_trait::async_trait;
use thiserror::Error;

use super::types::{ChatCompletion, ChatRequest};
use crate::schema::DiagnosticResult;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API key configured for the LLM provider")]
    MissingApiKey,
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

/// Failure of a single generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The model could not be reached; not recoverable by regenerating.
    #[error("generator unavailable: {0}")]
    Unavailable(String),
    /// The model answered but the answer does not satisfy the report contract.
    #[error("{0}")]
    Malformed(String),
}

impl From<LlmError> for GenerationError {
    fn from(err: LlmError) -> Self {
        GenerationError::Unavailable(err.to_string())
    }
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name for logs (e.g. "openai")
    fn name(&self) -> &str;

    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion, LlmError>;
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// One vector per input, in input order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;
}

/// Produces a validated report from a fully rendered prompt.
#[async_trait]
pub trait DiagnosticGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<DiagnosticResult, GenerationError>;
}
