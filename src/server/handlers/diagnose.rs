use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::errors::{ApiError, DegradedReport};
use crate::graph::{NodeContext, RunOutcome, RunState};
use crate::schema::{DiagnosticResult, TelemetryReading};
use crate::state::AppState;

pub async fn diagnose(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TelemetryReading>, JsonRejection>,
) -> Result<Json<DiagnosticResult>, ApiError> {
    let Json(telemetry) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let report = run_diagnosis(&state, telemetry).await?;
    Ok(Json(report))
}

/// Runs one diagnosis under the configured deadline and maps the outcome.
pub async fn run_diagnosis(
    state: &AppState,
    telemetry: TelemetryReading,
) -> Result<DiagnosticResult, ApiError> {
    telemetry
        .validate()
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let run_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "diagnose",
        %run_id,
        elevator_id = %telemetry.elevator_id
    );
    let timeout_secs = state.settings.agent.run_timeout_secs;

    let ctx = NodeContext::new(state.index.as_search(), state.generator.as_ref());
    let run = state.graph.run(RunState::new(telemetry), &ctx).instrument(span.clone());

    let outcome = match tokio::time::timeout(Duration::from_secs(timeout_secs), run).await {
        Ok(result) => result?,
        Err(_) => {
            span.in_scope(|| tracing::error!("Run exceeded {}s deadline", timeout_secs));
            return Err(ApiError::Timeout(format!(
                "Diagnostic run exceeded the {}s deadline",
                timeout_secs
            )));
        }
    };

    span.in_scope(|| {
        tracing::info!(
            "Run finished: accepted={} attempts={} retries={}",
            outcome.is_accepted(),
            outcome.attempts(),
            outcome.retry_count()
        )
    });

    match outcome {
        RunOutcome::Accepted { report, .. } => Ok(report),
        RunOutcome::Exhausted {
            report: Some(report),
            reason,
            retry_count,
            ..
        } => Err(ApiError::Unvalidated(Box::new(DegradedReport {
            error: reason,
            retry_count,
            degraded_report: report,
        }))),
        RunOutcome::Exhausted {
            report: None,
            reason,
            ..
        } => Err(ApiError::Internal(format!(
            "Agent failed to generate a report. {}",
            reason
        ))),
    }
}
