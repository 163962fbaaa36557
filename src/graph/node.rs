// Node trait and types
// Base abstraction for the diagnostic steps

use async_trait::async_trait;

use crate::core::errors::ApiError;
use crate::llm::DiagnosticGenerator;
use crate::rag::ManualSearch;

use super::state::{RunState, StateUpdate};

/// Collaborators borrowed by nodes during one run.
#[derive(Clone, Copy)]
pub struct NodeContext<'a> {
    pub search: &'a dyn ManualSearch,
    pub generator: &'a dyn DiagnosticGenerator,
}

impl<'a> NodeContext<'a> {
    pub fn new(search: &'a dyn ManualSearch, generator: &'a dyn DiagnosticGenerator) -> Self {
        Self { search, generator }
    }
}

/// Graph execution error
///
/// Includes an `execution_trace` recording the node IDs visited before the
/// failure, oldest first.
#[derive(Debug, Clone)]
pub struct GraphError {
    pub node_id: String,
    pub message: String,
    pub execution_trace: Vec<String>,
}

impl GraphError {
    pub fn new(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            message: message.into(),
            execution_trace: Vec::new(),
        }
    }

    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.execution_trace = trace;
        self
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        if err.execution_trace.is_empty() {
            ApiError::internal(format!("Graph error in {}: {}", err.node_id, err.message))
        } else {
            ApiError::internal(format!(
                "Graph error in {} (trace: {}): {}",
                err.node_id,
                err.execution_trace.join(" -> "),
                err.message
            ))
        }
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.execution_trace.is_empty() {
            write!(f, "GraphError in {}: {}", self.node_id, self.message)
        } else {
            write!(
                f,
                "GraphError in {} (trace: {}): {}",
                self.node_id,
                self.execution_trace.join(" -> "),
                self.message
            )
        }
    }
}

impl std::error::Error for GraphError {}

/// Node trait - every step of the run implements this
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique identifier for this node
    fn id(&self) -> &'static str;

    /// Human-readable name for display
    fn name(&self) -> &'static str {
        self.id()
    }

    /// Reads the state and returns only what changed.
    async fn execute(
        &self,
        state: &RunState,
        ctx: &NodeContext<'_>,
    ) -> Result<StateUpdate, GraphError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn graph_error_display_includes_trace() {
        let err = GraphError::new("generate", "connection refused")
            .with_trace(vec!["retrieve".into(), "generate".into()]);

        assert_eq!(
            err.to_string(),
            "GraphError in generate (trace: retrieve -> generate): connection refused"
        );
    }

    #[test]
    fn graph_error_maps_to_internal_api_error() {
        let api: ApiError = GraphError::new("retrieve", "qdrant down").into();
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(api.to_string().contains("qdrant down"));
    }
}
