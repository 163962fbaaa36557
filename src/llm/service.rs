use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::provider::{ChatProvider, DiagnosticGenerator, GenerationError};
use super::types::{ChatMessage, ChatRequest, ResponseFormat};
use crate::schema::DiagnosticResult;

const SYSTEM_PROMPT: &str = "You produce maintenance diagnostic reports. \
Reply with a single JSON object matching the DiagnosticResult schema and nothing else.";

/// JSON schema the model output is constrained to.
pub fn diagnostic_result_schema() -> Value {
    serde_json::to_value(schemars::schema_for!(DiagnosticResult)).unwrap_or(Value::Null)
}

/// Deterministic, schema-constrained report generator over a chat provider.
#[derive(Clone)]
pub struct StructuredGenerator {
    provider: Arc<dyn ChatProvider>,
    schema: Value,
}

impl StructuredGenerator {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            provider,
            schema: diagnostic_result_schema(),
        }
    }

    fn build_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest::new(vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)])
            .with_temperature(0.0)
            .with_response_format(ResponseFormat::JsonSchema {
                name: "DiagnosticResult".to_string(),
                schema: self.schema.clone(),
                strict: false,
            })
    }
}

#[async_trait]
impl DiagnosticGenerator for StructuredGenerator {
    async fn generate(&self, prompt: &str) -> Result<DiagnosticResult, GenerationError> {
        let request = self.build_request(prompt);
        let completion = self.provider.chat(request).await?;

        if let Some(refusal) = completion.refusal.filter(|r| !r.trim().is_empty()) {
            return Err(GenerationError::Malformed(format!(
                "Model refused to produce a report: {}",
                refusal
            )));
        }

        let content = completion
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                GenerationError::Malformed("Model returned an empty response".to_string())
            })?;

        DiagnosticResult::from_model_output(&content).map_err(|err| {
            tracing::debug!(
                "{} output failed coercion (finish_reason={:?}): {}",
                self.provider.name(),
                completion.finish_reason,
                err
            );
            GenerationError::Malformed(err.to_string())
        })
    }
}
