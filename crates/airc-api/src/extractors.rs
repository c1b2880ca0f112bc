//! # Request Extraction & Validation
//!
//! The [`Validate`] trait for request DTOs, JSON body helpers that map
//! rejections to [`AppError::BadRequest`], and path parsing for subject and
//! version identifiers.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use airc_core::{SubjectId, VersionNumber};

use crate::error::AppError;

/// Request types with rules beyond what serde checks.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Parse a `{subject_id}` path segment.
pub fn parse_subject(raw: &str) -> Result<SubjectId, AppError> {
    SubjectId::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Parse a `{version}` path segment. Versions start at 1.
pub fn parse_version(raw: u64) -> Result<VersionNumber, AppError> {
    VersionNumber::new(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}
