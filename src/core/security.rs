use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

use crate::core::errors::ApiError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared secret guarding the admin (ingestion) routes.
#[derive(Debug, Clone)]
pub struct AdminToken {
    value: String,
}

impl AdminToken {
    /// Returns `None` for a missing or blank key, leaving admin routes open.
    pub fn from_setting(value: Option<&str>) -> Option<Self> {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| AdminToken {
                value: v.to_string(),
            })
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

pub fn require_api_key(headers: &HeaderMap, expected: &AdminToken) -> Result<(), ApiError> {
    let header_value = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if header_value.is_empty() {
        return Err(ApiError::Unauthorized);
    }

    let matches: bool = header_value
        .as_bytes()
        .ct_eq(expected.value().as_bytes())
        .into();
    if !matches {
        return Err(ApiError::Unauthorized);
    }

    Ok(())
}

/// Enforces the admin key only when one is configured.
pub fn require_admin(headers: &HeaderMap, expected: Option<&AdminToken>) -> Result<(), ApiError> {
    match expected {
        Some(token) => require_api_key(headers, token),
        None => Ok(()),
    }
}
