// Generate Node
// Renders the prompt and asks the generator for a report

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext};
use crate::graph::prompt::build_diagnostic_prompt;
use crate::graph::state::{RunState, StateUpdate};
use crate::llm::GenerationError;

#[derive(Default)]
pub struct GenerateNode;

impl GenerateNode {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Node for GenerateNode {
    fn id(&self) -> &'static str {
        "generate"
    }

    fn name(&self) -> &'static str {
        "Diagnosis Generation"
    }

    async fn execute(
        &self,
        state: &RunState,
        ctx: &NodeContext<'_>,
    ) -> Result<StateUpdate, GraphError> {
        let prompt = build_diagnostic_prompt(
            &state.telemetry,
            &state.retrieved_docs,
            state.validation_error.as_deref(),
        );
        tracing::info!(
            "Generating diagnosis (attempt {}, retry {})",
            state.attempts + 1,
            state.retry_count
        );

        match ctx.generator.generate(&prompt).await {
            Ok(report) => Ok(StateUpdate::Generated(report)),
            Err(GenerationError::Malformed(cause)) => {
                tracing::warn!("Generation produced no usable report: {}", cause);
                Ok(StateUpdate::GenerationFailed(cause))
            }
            Err(err @ GenerationError::Unavailable(_)) => {
                Err(GraphError::new(self.id(), err.to_string()))
            }
        }
    }
}
