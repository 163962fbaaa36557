// Validate Node
// Safety guardrail over the generated report

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext};
use crate::graph::state::{RunState, StateUpdate, Verdict};

pub const HIGH_SEVERITY_THRESHOLD: u8 = 7;

/// A high-severity report must mention at least one of these in a warning.
pub const SAFETY_TERMS: [&str; 5] = ["lock out", "power off", "safety", "danger", "stop"];

pub const NO_REPORT_MESSAGE: &str = "No report generated.";
pub const MISSING_SAFETY_MESSAGE: &str =
    "High severity detected but no 'Lock Out' or 'Safety' warning provided.";

fn mentions_safety_term(warning: &str) -> bool {
    let lowered = warning.to_lowercase();
    SAFETY_TERMS.iter().any(|term| lowered.contains(term))
}

/// Pure guardrail decision for the current state.
pub fn check_report(state: &RunState) -> Verdict {
    let Some(report) = state.diagnostic_report.as_ref() else {
        let reason = match state.validation_error.as_deref() {
            Some(cause) if !cause.trim().is_empty() => format!("{} {}", NO_REPORT_MESSAGE, cause),
            _ => NO_REPORT_MESSAGE.to_string(),
        };
        return Verdict::Rejected(reason);
    };

    if report.is_high_severity(HIGH_SEVERITY_THRESHOLD)
        && !report.safety_warnings.iter().any(|w| mentions_safety_term(w))
    {
        return Verdict::Rejected(MISSING_SAFETY_MESSAGE.to_string());
    }

    Verdict::Accepted
}

#[derive(Default)]
pub struct ValidateNode;

impl ValidateNode {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Node for ValidateNode {
    fn id(&self) -> &'static str {
        "validate"
    }

    fn name(&self) -> &'static str {
        "Safety Guardrail"
    }

    async fn execute(
        &self,
        state: &RunState,
        _ctx: &NodeContext<'_>,
    ) -> Result<StateUpdate, GraphError> {
        let verdict = check_report(state);
        match &verdict {
            Verdict::Accepted => tracing::info!("Report passed the safety guardrail"),
            Verdict::Rejected(reason) => tracing::warn!("Guardrail rejected report: {}", reason),
        }
        Ok(StateUpdate::Validated(verdict))
    }
}
