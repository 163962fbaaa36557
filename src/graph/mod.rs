// Diagnostic Graph Module
// Retrieve -> Generate -> Validate control loop

pub mod builder;
pub mod node;
pub mod nodes;
pub mod prompt;
pub mod runtime;
pub mod state;

pub use builder::build_diagnostic_graph;
pub use node::{GraphError, Node, NodeContext};
pub use runtime::{route_after_validation, DiagnosticGraph, Stage, DEFAULT_MAX_RETRIES};
pub use state::{RunOutcome, RunState, StateUpdate, Verdict};
