// Graph Runtime
// Retrieve -> Generate -> Validate loop with a bounded retry ceiling

use super::node::{GraphError, Node, NodeContext};
use super::nodes::{GenerateNode, RetrieveNode, ValidateNode};
use super::state::{RunOutcome, RunState};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Position of the run in the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Retrieve,
    Generate,
    Validate,
    Terminal,
}

/// Decision taken after every validation.
pub fn route_after_validation(state: &RunState, max_retries: u32) -> Stage {
    if state.validation_error.is_some() && state.retry_count < max_retries {
        Stage::Generate
    } else {
        Stage::Terminal
    }
}

/// Static successor of every stage except Validate, which is routed.
fn next_stage(current: Stage, state: &RunState, max_retries: u32) -> Stage {
    match current {
        Stage::Retrieve => Stage::Generate,
        Stage::Generate => Stage::Validate,
        Stage::Validate => route_after_validation(state, max_retries),
        Stage::Terminal => Stage::Terminal,
    }
}

pub struct DiagnosticGraph {
    retrieve: RetrieveNode,
    generate: GenerateNode,
    validate: ValidateNode,
    max_retries: u32,
    max_steps: usize,
}

impl DiagnosticGraph {
    pub fn new(retrieval_limit: usize, max_retries: u32) -> Self {
        Self {
            retrieve: RetrieveNode::new(retrieval_limit),
            generate: GenerateNode::new(),
            validate: ValidateNode::new(),
            max_retries,
            // One retrieval, then a generate/validate pair per attempt.
            max_steps: 1 + 2 * (max_retries as usize + 1),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    fn node(&self, stage: Stage) -> Option<&dyn Node> {
        match stage {
            Stage::Retrieve => Some(&self.retrieve as &dyn Node),
            Stage::Generate => Some(&self.generate as &dyn Node),
            Stage::Validate => Some(&self.validate as &dyn Node),
            Stage::Terminal => None,
        }
    }

    /// Runs one diagnosis to its terminal outcome.
    pub async fn run(
        &self,
        mut state: RunState,
        ctx: &NodeContext<'_>,
    ) -> Result<RunOutcome, GraphError> {
        let mut stage = Stage::Retrieve;
        let mut trace: Vec<String> = Vec::new();
        let mut step = 0;

        while let Some(node) = self.node(stage) {
            if step >= self.max_steps {
                return Err(GraphError::new(
                    "runtime",
                    format!("Maximum steps ({}) exceeded", self.max_steps),
                )
                .with_trace(trace));
            }

            let node_id = node.id();
            tracing::debug!("Executing node: {} [{}] (step {})", node.name(), node_id, step);

            let update = match node.execute(&state, ctx).await {
                Ok(update) => update,
                Err(err) => return Err(err.with_trace(trace)),
            };
            trace.push(node_id.to_string());
            state.apply(update);

            stage = next_stage(stage, &state, self.max_retries);
            step += 1;
        }

        tracing::debug!("Run finished after {} steps: {}", step, trace.join(" -> "));
        Ok(finish(state))
    }
}

impl Default for DiagnosticGraph {
    fn default() -> Self {
        Self::new(super::nodes::retrieve::DEFAULT_PER_QUERY_LIMIT, DEFAULT_MAX_RETRIES)
    }
}

fn finish(state: RunState) -> RunOutcome {
    match (state.validation_error, state.diagnostic_report) {
        (None, Some(report)) => RunOutcome::Accepted {
            report,
            retry_count: state.retry_count,
            attempts: state.attempts,
        },
        (reason, report) => RunOutcome::Exhausted {
            report,
            reason: reason.unwrap_or_else(|| super::nodes::validate::NO_REPORT_MESSAGE.to_string()),
            retry_count: state.retry_count,
            attempts: state.attempts,
        },
    }
}
