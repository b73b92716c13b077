//! Error envelope shared by Google REST APIs.
//!
//! Firestore and the Identity Toolkit both answer failures with
//! `{"error": {"code": 404, "message": "...", "status": "NOT_FOUND"}}`.

use reqwest::StatusCode;
use serde::Deserialize;
use supernotes_core::Error;

#[derive(Debug, Deserialize)]
pub struct GoogleErrorResponse {
    pub error: GoogleError,
}

#[derive(Debug, Default, Deserialize)]
pub struct GoogleError {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

impl GoogleError {
    /// Parse an error body, falling back to the raw text.
    pub fn from_body(status: StatusCode, body: &str) -> Self {
        serde_json::from_str::<GoogleErrorResponse>(body)
            .map(|r| r.error)
            .unwrap_or_else(|_| GoogleError {
                code: status.as_u16(),
                message: body.trim().to_string(),
                status: String::new(),
            })
    }
}

/// Map a failed Firestore response onto the core taxonomy.
pub fn map_status(status: StatusCode, err: GoogleError) -> Error {
    let detail = if err.message.is_empty() {
        status.to_string()
    } else {
        err.message
    };
    match (err.status.as_str(), status) {
        ("NOT_FOUND", _) | (_, StatusCode::NOT_FOUND) => Error::NotFound(detail),
        ("PERMISSION_DENIED", _) | (_, StatusCode::FORBIDDEN) => Error::Forbidden(detail),
        ("UNAUTHENTICATED", _) | (_, StatusCode::UNAUTHORIZED) => Error::Unauthorized(detail),
        ("INVALID_ARGUMENT", _) | ("FAILED_PRECONDITION", _) => Error::InvalidInput(detail),
        _ => Error::Request(format!("{}: {}", status, detail)),
    }
}
