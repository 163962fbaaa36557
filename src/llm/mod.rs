pub mod openai;
pub mod provider;
pub mod service;
pub mod types;

pub use openai::OpenAiClient;
pub use provider::{ChatProvider, DiagnosticGenerator, EmbeddingProvider, GenerationError, LlmError};
pub use service::StructuredGenerator;
pub use types::{ChatCompletion, ChatMessage, ChatRequest, ResponseFormat};
