use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use flowguard_engine::graph::nodes::{check_report, HIGH_SEVERITY_THRESHOLD, SAFETY_TERMS};
use flowguard_engine::graph::{
    route_after_validation, DiagnosticGraph, NodeContext, RunOutcome, RunState, Stage,
    StateUpdate, Verdict,
};
use flowguard_engine::llm::{DiagnosticGenerator, GenerationError};
use flowguard_engine::rag::seed::reference_manuals;
use flowguard_engine::rag::{InMemoryManualStore, ManualIndex, ManualSearch, SearchError};
use flowguard_engine::schema::{DiagnosticResult, ManualChunk, SeverityScore, TelemetryReading};

struct RecordingSearch {
    calls: Mutex<Vec<(String, usize)>>,
}

impl RecordingSearch {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ManualSearch for RecordingSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ManualChunk>, SearchError> {
        self.calls.lock().unwrap().push((query.to_string(), limit));
        // Both codes surface the shared safety passage.
        Ok(vec![
            chunk(&format!("{}-specific", query)),
            chunk("shared-safety"),
        ])
    }
}

struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<DiagnosticResult, GenerationError>>>,
    calls: Mutex<u32>,
}

impl ScriptedGenerator {
    fn new(replies: Vec<Result<DiagnosticResult, GenerationError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl DiagnosticGenerator for ScriptedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<DiagnosticResult, GenerationError> {
        *self.calls.lock().unwrap() += 1;
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Malformed("script exhausted".into())))
    }
}

fn chunk(id: &str) -> ManualChunk {
    ManualChunk {
        chunk_id: id.to_string(),
        content: format!("passage {}", id),
        source_doc: "Manual.pdf".to_string(),
        page_number: 1,
        related_error_codes: vec![],
    }
}

fn telemetry(codes: &[&str]) -> TelemetryReading {
    serde_json::from_value(json!({
        "elevator_id": "KONE-TEST-01",
        "velocity_m_s": 0.0,
        "door_cycles_count": 12000,
        "vibration_level_hz": 0.1,
        "error_codes": codes,
    }))
    .unwrap()
}

fn report(severity: i64, warnings: &[&str]) -> DiagnosticResult {
    DiagnosticResult {
        fault_summary: "Door obstruction".to_string(),
        root_cause_hypothesis: "Debris in sill groove".to_string(),
        severity_score: SeverityScore::new(severity).unwrap(),
        cited_manual_references: vec!["KONE_Door_Systems_Maintenance_2024.pdf".to_string()],
        recommended_actions: vec![],
        safety_warnings: warnings.iter().map(|w| w.to_string()).collect(),
    }
}

fn state_with_report(report: DiagnosticResult) -> RunState {
    let mut state = RunState::new(telemetry(&["E-302"]));
    state.apply(StateUpdate::Generated(report));
    state
}

#[test]
fn high_severity_without_lock_out_is_rejected() {
    let mut state = state_with_report(report(9, &["Wear gloves"]));

    let verdict = check_report(&state);
    state.apply(StateUpdate::Validated(verdict));

    assert!(state.validation_error.as_deref().unwrap().contains("Lock Out"));
    assert_eq!(state.retry_count, 1);
}

#[test]
fn high_severity_with_lock_out_is_accepted() {
    let mut state = state_with_report(report(9, &["Lock out power before servicing"]));

    let verdict = check_report(&state);
    assert_eq!(verdict, Verdict::Accepted);
    state.apply(StateUpdate::Validated(verdict));

    assert!(state.validation_error.is_none());
    assert_eq!(state.retry_count, 0);
}

#[test]
fn routing_decisions() {
    let mut state = RunState::new(telemetry(&[]));

    state.validation_error = Some("Some error".to_string());
    state.retry_count = 1;
    assert_eq!(route_after_validation(&state, 3), Stage::Generate);

    state.retry_count = 3;
    assert_eq!(route_after_validation(&state, 3), Stage::Terminal);

    state.validation_error = None;
    for retry_count in [0, 1, 2, 3] {
        state.retry_count = retry_count;
        assert_eq!(route_after_validation(&state, 3), Stage::Terminal);
    }
}

#[tokio::test]
async fn retrieval_issues_one_query_per_code_and_dedups() {
    let search = RecordingSearch::new();
    let generator = ScriptedGenerator::new(vec![Ok(report(3, &[]))]);
    let ctx = NodeContext::new(&search, &generator);

    let outcome = DiagnosticGraph::default()
        .run(RunState::new(telemetry(&["E-302", "E-501"])), &ctx)
        .await
        .unwrap();
    assert!(outcome.is_accepted());

    let mut calls = search.calls.lock().unwrap().clone();
    calls.sort();
    assert_eq!(
        calls,
        vec![("E-302".to_string(), 2), ("E-501".to_string(), 2)]
    );
}

#[tokio::test]
async fn merged_passages_are_unique_by_chunk_id() {
    use flowguard_engine::graph::nodes::RetrieveNode;
    use flowguard_engine::graph::Node;

    let search = RecordingSearch::new();
    let generator = ScriptedGenerator::new(vec![]);
    let ctx = NodeContext::new(&search, &generator);
    let state = RunState::new(telemetry(&["E-302", "E-501"]));

    let StateUpdate::Retrieved(docs) = RetrieveNode::default().execute(&state, &ctx).await.unwrap()
    else {
        panic!("expected retrieved passages");
    };

    let ids: Vec<_> = docs.iter().map(|d| d.chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["E-302-specific", "shared-safety", "E-501-specific"]);
}

#[tokio::test]
async fn every_script_terminates_within_the_ceiling() {
    let accepted = || Ok(report(3, &[]));
    let rejected = || Ok(report(9, &["Wear gloves"]));
    let malformed = || Err(GenerationError::Malformed("Invalid report format: x".into()));
    let warned = |warning: &str| Ok(report(9, &[warning]));

    let scripts: Vec<Vec<Result<DiagnosticResult, GenerationError>>> = vec![
        vec![accepted()],
        vec![rejected(), accepted()],
        vec![malformed(), rejected(), accepted()],
        vec![rejected(), rejected(), rejected(), rejected(), rejected()],
        vec![malformed(), malformed(), malformed(), malformed()],
        vec![],
        vec![rejected(), warned("DANGER: moving parts")],
        vec![warned("Power off the main drive first")],
        vec![malformed(), warned("Engage the pit STOP switch")],
        vec![warned("Follow site safety rules")],
    ];

    for script in scripts {
        let search = RecordingSearch::new();
        let generator = ScriptedGenerator::new(script);
        let ctx = NodeContext::new(&search, &generator);

        let outcome = DiagnosticGraph::default()
            .run(RunState::new(telemetry(&["E-302"])), &ctx)
            .await
            .unwrap();

        assert!(outcome.retry_count() <= 3);
        assert!(generator.calls() <= 4);
        assert_eq!(outcome.attempts(), generator.calls());
        assert_eq!(search.calls.lock().unwrap().len(), 1);

        if let RunOutcome::Accepted { report, .. } = &outcome {
            assert!(
                report.severity_score.value() < HIGH_SEVERITY_THRESHOLD
                    || report.safety_warnings.iter().any(|w| {
                        let w = w.to_lowercase();
                        SAFETY_TERMS.iter().any(|term| w.contains(term))
                    })
            );
            assert_eq!(check_report(&state_with_report(report.clone())), Verdict::Accepted);
        }
    }
}

#[tokio::test]
async fn any_fixed_safety_term_satisfies_the_guardrail() {
    for term in SAFETY_TERMS {
        let warning = format!("Technician must {} before inspection", term.to_uppercase());
        let search = RecordingSearch::new();
        let generator = ScriptedGenerator::new(vec![Ok(report(10, &[warning.as_str()]))]);
        let ctx = NodeContext::new(&search, &generator);

        let outcome = DiagnosticGraph::default()
            .run(RunState::new(telemetry(&["E-302"])), &ctx)
            .await
            .unwrap();

        assert!(outcome.is_accepted(), "rejected warning: {}", warning);
        assert_eq!(outcome.retry_count(), 0);
    }
}

#[tokio::test]
async fn loop_runs_against_the_in_memory_index() {
    let index = InMemoryManualStore::new();
    index.upsert(reference_manuals()).await.unwrap();
    assert_eq!(index.count().await.unwrap(), 3);

    let generator = ScriptedGenerator::new(vec![
        Ok(report(8, &["Check the door"])),
        Ok(report(8, &["DANGER: engage the pit stop switch"])),
    ]);
    let ctx = NodeContext::new(index.as_search(), &generator);

    let outcome = DiagnosticGraph::default()
        .run(RunState::new(telemetry(&["E-302"])), &ctx)
        .await
        .unwrap();

    match outcome {
        RunOutcome::Accepted {
            report,
            retry_count,
            attempts,
        } => {
            assert_eq!(retry_count, 1);
            assert_eq!(attempts, 2);
            assert_eq!(report.severity_score.value(), 8);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn report_contract_rejects_out_of_range_severity() {
    let text = json!({
        "fault_summary": "x",
        "root_cause_hypothesis": "y",
        "severity_score": 11,
        "cited_manual_references": [],
        "recommended_actions": [],
        "safety_warnings": []
    })
    .to_string();

    assert!(DiagnosticResult::from_model_output(&text).is_err());
    assert!(SeverityScore::new(0).is_err());
    assert!(SeverityScore::new(10).is_ok());
}
