//! Prompt rendering for the generation step.
//!
//! Output depends only on the arguments, so identical runs produce
//! byte-identical prompts.

use crate::schema::{ManualChunk, TelemetryReading};

const PREAMBLE: &str = "You are an expert KONE Industrial IoT Engineer.\n\
Analyze the following Elevator Telemetry and Technical Manuals to produce a diagnostic report.";

const NO_PASSAGES: &str = "(no matching manual passages were found)";

const REQUIREMENTS: &str = "REQUIREMENTS:\n\
1. Identify the root cause based on sensor values and error codes.\n\
2. Cite specific manuals in your findings.\n\
3. Assign a severity score (1-10).\n\
4. Provide a step-by-step action plan for the technician.\n\
5. For severity 7 or above, include an explicit lock out or safety warning.";

const SCHEMA_NOTE: &str = "IMPORTANT SCHEMA NOTE:\n\
- 'recommended_actions' must be a list of objects.\n\
- EACH object must have: 'step_order' (int), 'instruction' (str), 'action_type' (str), and 'estimated_time_minutes' (int).\n\
\n\
Example:\n\
[\n  \
{ \"step_order\": 1, \"instruction\": \"Check door track\", \"action_type\": \"inspection\", \"estimated_time_minutes\": 15 },\n  \
{ \"step_order\": 2, \"instruction\": \"Clean debris\", \"action_type\": \"repair\", \"estimated_time_minutes\": 10 }\n\
]";

pub fn format_passage(chunk: &ManualChunk) -> String {
    format!(
        "Source: {} (Pg {}): {}",
        chunk.source_doc, chunk.page_number, chunk.content
    )
}

fn render_manuals(docs: &[ManualChunk]) -> String {
    if docs.is_empty() {
        return NO_PASSAGES.to_string();
    }
    docs.iter()
        .map(format_passage)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_retry_block(error: &str) -> String {
    format!(
        "CRITICAL INSTRUCTION: Your previous attempt failed validation.\n\
ERROR: {}\n\
\n\
Reflect on this error. Ensure 'recommended_actions' is a LIST OF OBJECTS with 'step_order', 'instruction', 'action_type', and 'estimated_time_minutes'.\n\
Do NOT return simple strings for actions.",
        error
    )
}

pub fn build_diagnostic_prompt(
    telemetry: &TelemetryReading,
    docs: &[ManualChunk],
    prior_error: Option<&str>,
) -> String {
    let telemetry_json =
        serde_json::to_string_pretty(telemetry).unwrap_or_else(|_| format!("{:?}", telemetry));

    let mut sections = vec![
        PREAMBLE.to_string(),
        format!("TELEMETRY DATA:\n{}", telemetry_json),
        format!(
            "TECHNICAL MANUALS (Reference these explicitly):\n{}",
            render_manuals(docs)
        ),
    ];

    if let Some(error) = prior_error.filter(|e| !e.trim().is_empty()) {
        sections.push(render_retry_block(error));
    }

    sections.push(REQUIREMENTS.to_string());
    sections.push(SCHEMA_NOTE.to_string());
    sections.join("\n\n")
}
