// Run State
// Typed state threaded through one diagnostic run

use serde::Serialize;

use crate::schema::{DiagnosticResult, ManualChunk, TelemetryReading};

/// Outcome of the safety guardrail for one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(String),
}

/// The fields a single step changed. Steps never touch `RunState` directly.
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    Retrieved(Vec<ManualChunk>),
    Generated(DiagnosticResult),
    /// The generator produced nothing usable; carries its failure description.
    GenerationFailed(String),
    Validated(Verdict),
}

/// State owned by the control loop for the duration of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunState {
    pub telemetry: TelemetryReading,
    pub retrieved_docs: Vec<ManualChunk>,
    pub diagnostic_report: Option<DiagnosticResult>,
    pub validation_error: Option<String>,
    pub retry_count: u32,
    /// Generation attempts made so far, successful or not.
    pub attempts: u32,
}

impl RunState {
    pub fn new(telemetry: TelemetryReading) -> Self {
        Self {
            telemetry,
            retrieved_docs: Vec::new(),
            diagnostic_report: None,
            validation_error: None,
            retry_count: 0,
            attempts: 0,
        }
    }

    /// Merges a step's update. This is the only place `retry_count` changes.
    pub fn apply(&mut self, update: StateUpdate) {
        match update {
            StateUpdate::Retrieved(docs) => {
                self.retrieved_docs = docs;
            }
            StateUpdate::Generated(report) => {
                self.diagnostic_report = Some(report);
                self.attempts += 1;
            }
            StateUpdate::GenerationFailed(cause) => {
                self.diagnostic_report = None;
                self.validation_error = Some(cause);
                self.attempts += 1;
            }
            StateUpdate::Validated(Verdict::Accepted) => {
                self.validation_error = None;
            }
            StateUpdate::Validated(Verdict::Rejected(reason)) => {
                self.validation_error = Some(reason);
                self.retry_count += 1;
            }
        }
    }
}

/// Terminal result of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Accepted {
        report: DiagnosticResult,
        retry_count: u32,
        attempts: u32,
    },
    Exhausted {
        /// Last report produced, if any attempt produced one.
        report: Option<DiagnosticResult>,
        reason: String,
        retry_count: u32,
        attempts: u32,
    },
}

impl RunOutcome {
    pub fn retry_count(&self) -> u32 {
        match self {
            RunOutcome::Accepted { retry_count, .. } | RunOutcome::Exhausted { retry_count, .. } => {
                *retry_count
            }
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RunOutcome::Accepted { attempts, .. } | RunOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, RunOutcome::Accepted { .. })
    }
}
