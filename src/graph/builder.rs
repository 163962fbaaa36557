// Graph Builder
// Constructs the diagnostic loop from agent settings

use crate::core::config::AgentSettings;

use super::runtime::DiagnosticGraph;

pub fn build_diagnostic_graph(settings: &AgentSettings) -> DiagnosticGraph {
    DiagnosticGraph::new(settings.retrieval_limit, settings.max_retries)
}
