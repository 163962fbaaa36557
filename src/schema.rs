//! Domain contracts shared by the diagnostic pipeline.
//!
//! These types bridge raw IoT telemetry, the manual index and the
//! structured output of the language model.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use schemars::{json_schema, JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Query used when a reading carries no active error codes.
pub const FALLBACK_QUERY: &str = "general maintenance";

pub const MIN_SEVERITY: u8 = 1;
pub const MAX_SEVERITY: u8 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Severity score must be between 1 and 10 (got {0})")]
    SeverityOutOfRange(i64),
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },
    #[error("page_number must be >= 1")]
    InvalidPage,
    #[error("{0}")]
    Malformed(String),
}

// ------------------------------------------------------------------
// Telemetry input
// ------------------------------------------------------------------

/// A single snapshot of elevator sensor data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReading {
    /// Unique identifier for the asset
    #[serde(alias = "asset_id")]
    pub elevator_id: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Current cabin velocity in meters/second
    pub velocity_m_s: f64,
    /// Door open/close cycles since the last maintenance
    pub door_cycles_count: u64,
    /// Vibration frequency detected on the cabin rail
    pub vibration_level_hz: f64,
    /// Active error codes reported by the control board (e.g. "E-501")
    #[serde(default)]
    pub error_codes: Vec<String>,
}

impl TelemetryReading {
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.elevator_id.trim().is_empty() {
            return Err(SchemaError::EmptyField("elevator_id"));
        }
        if !self.velocity_m_s.is_finite() {
            return Err(SchemaError::NonFinite {
                field: "velocity_m_s",
            });
        }
        if !self.vibration_level_hz.is_finite() {
            return Err(SchemaError::NonFinite {
                field: "vibration_level_hz",
            });
        }
        Ok(())
    }

    /// One query per distinct error code, in reporting order.
    ///
    /// Blank codes are ignored; when nothing is left the reading is treated
    /// as a general maintenance request.
    pub fn search_queries(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let queries: Vec<String> = self
            .error_codes
            .iter()
            .map(|code| code.trim())
            .filter(|code| !code.is_empty())
            .filter(|code| seen.insert(code.to_string()))
            .map(str::to_string)
            .collect();

        if queries.is_empty() {
            vec![FALLBACK_QUERY.to_string()]
        } else {
            queries
        }
    }
}

// ------------------------------------------------------------------
// Retrieved context
// ------------------------------------------------------------------

/// A section of a technical manual stored in the vector index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualChunk {
    pub chunk_id: String,
    pub content: String,
    /// Filename of the manual (e.g. "Maintenance_Guide_v2.pdf")
    pub source_doc: String,
    pub page_number: u32,
    #[serde(default)]
    pub related_error_codes: Vec<String>,
}

impl ManualChunk {
    /// Builds a chunk whose id is derived from its source, page and text.
    pub fn new(
        content: impl Into<String>,
        source_doc: impl Into<String>,
        page_number: u32,
        related_error_codes: Vec<String>,
    ) -> Self {
        let content = content.into();
        let source_doc = source_doc.into();
        let chunk_id = derive_chunk_id(&source_doc, page_number, &content);
        Self {
            chunk_id,
            content,
            source_doc,
            page_number,
            related_error_codes,
        }
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.chunk_id.trim().is_empty() {
            return Err(SchemaError::EmptyField("chunk_id"));
        }
        if self.content.trim().is_empty() {
            return Err(SchemaError::EmptyField("content"));
        }
        if self.source_doc.trim().is_empty() {
            return Err(SchemaError::EmptyField("source_doc"));
        }
        if self.page_number < 1 {
            return Err(SchemaError::InvalidPage);
        }
        Ok(())
    }
}

pub fn derive_chunk_id(source_doc: &str, page_number: u32, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_doc.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(page_number.to_le_bytes());
    hasher.update(b"\x1f");
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

// ------------------------------------------------------------------
// Structured model output
// ------------------------------------------------------------------

/// Severity on a 1 (cosmetic) to 10 (critical / safety risk) scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct SeverityScore(u8);

impl SeverityScore {
    pub fn new(value: i64) -> Result<Self, SchemaError> {
        if (MIN_SEVERITY as i64..=MAX_SEVERITY as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(SchemaError::SeverityOutOfRange(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for SeverityScore {
    type Error = SchemaError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SeverityScore> for u8 {
    fn from(score: SeverityScore) -> Self {
        score.0
    }
}

impl fmt::Display for SeverityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl JsonSchema for SeverityScore {
    fn schema_name() -> Cow<'static, str> {
        "SeverityScore".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "integer",
            "minimum": MIN_SEVERITY,
            "maximum": MAX_SEVERITY,
            "description": "1 (Cosmetic) to 10 (Critical/Safety Risk)"
        })
    }
}

/// A single actionable step for the field technician.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MaintenanceStep {
    pub step_order: u32,
    pub instruction: String,
    /// Category of work, e.g. "inspection", "repair", "lockout"
    pub action_type: String,
    pub estimated_time_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_required: Option<String>,
}

/// The structured diagnostic report produced by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DiagnosticResult {
    /// Concise technical summary of the issue
    #[serde(deserialize_with = "non_empty_string")]
    #[schemars(with = "String")]
    pub fault_summary: String,
    /// Best guess at the physical cause
    pub root_cause_hypothesis: String,
    pub severity_score: SeverityScore,
    /// Manual sources or pages used to derive the diagnosis
    pub cited_manual_references: Vec<String>,
    /// Ordered action plan for the technician
    pub recommended_actions: Vec<MaintenanceStep>,
    /// Crucial safety protocols (e.g. "Lock out power")
    pub safety_warnings: Vec<String>,
}

impl DiagnosticResult {
    /// Strictly coerces raw model text into a report.
    ///
    /// Accepts either a bare JSON object or prose wrapping a single object.
    pub fn from_model_output(text: &str) -> Result<Self, SchemaError> {
        let value = extract_json_object(text).ok_or_else(|| {
            SchemaError::Malformed("Invalid report format: no JSON object in model output".into())
        })?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        serde_json::from_value(value)
            .map_err(|err| SchemaError::Malformed(format!("Invalid report format: {}", err)))
    }

    pub fn is_high_severity(&self, threshold: u8) -> bool {
        self.severity_score.value() >= threshold
    }
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    if value.trim().is_empty() {
        return Err(serde::de::Error::custom("fault_summary must not be empty"));
    }
    Ok(value)
}

fn extract_json_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() {
            return Some(value);
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end])
        .ok()
        .filter(Value::is_object)
}
