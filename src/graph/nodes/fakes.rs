//! Scripted collaborators for loop tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{DiagnosticGenerator, GenerationError};
use crate::rag::{ManualSearch, SearchError};
use crate::schema::{DiagnosticResult, ManualChunk, SeverityScore, TelemetryReading};

/// Returns canned passages per query and records every call.
#[derive(Default)]
pub struct RecordingSearch {
    pub results: HashMap<String, Vec<ManualChunk>>,
    pub calls: Mutex<Vec<(String, usize)>>,
    pub fail: bool,
}

impl RecordingSearch {
    pub fn with(results: Vec<(&str, Vec<ManualChunk>)>) -> Self {
        Self {
            results: results
                .into_iter()
                .map(|(query, docs)| (query.to_string(), docs))
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ManualSearch for RecordingSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ManualChunk>, SearchError> {
        self.calls.lock().unwrap().push((query.to_string(), limit));
        if self.fail {
            return Err(SearchError::Transport("connection refused".into()));
        }
        Ok(self
            .results
            .get(query)
            .map(|docs| docs.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

/// Pops one scripted reply per call; repeats the last one when drained.
pub struct QueuedGenerator {
    replies: Mutex<VecDeque<Result<DiagnosticResult, GenerationError>>>,
    last: Mutex<Option<Result<DiagnosticResult, GenerationError>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl QueuedGenerator {
    pub fn new(replies: Vec<Result<DiagnosticResult, GenerationError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: Result<DiagnosticResult, GenerationError>) -> Self {
        Self::new(vec![reply])
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiagnosticGenerator for QueuedGenerator {
    async fn generate(&self, prompt: &str) -> Result<DiagnosticResult, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.replies.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(reply) => {
                *last = Some(reply.clone());
                reply
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(GenerationError::Unavailable("no scripted reply".into()))),
        }
    }
}

pub fn telemetry(codes: &[&str]) -> TelemetryReading {
    serde_json::from_value(serde_json::json!({
        "elevator_id": "KONE-001",
        "timestamp": "2026-01-01T00:00:00Z",
        "velocity_m_s": 1.5,
        "door_cycles_count": 1200,
        "vibration_level_hz": 4.5,
        "error_codes": codes,
    }))
    .unwrap()
}

pub fn report(severity: i64, warnings: &[&str]) -> DiagnosticResult {
    DiagnosticResult {
        fault_summary: "Door obstruction".to_string(),
        root_cause_hypothesis: "Debris in the sill groove".to_string(),
        severity_score: SeverityScore::new(severity).unwrap(),
        cited_manual_references: vec!["Doors.pdf p.42".to_string()],
        recommended_actions: vec![],
        safety_warnings: warnings.iter().map(|w| w.to_string()).collect(),
    }
}

pub fn chunk(id: &str, source: &str) -> ManualChunk {
    ManualChunk {
        chunk_id: id.to_string(),
        content: format!("content of {}", id),
        source_doc: source.to_string(),
        page_number: 1,
        related_error_codes: vec![],
    }
}
