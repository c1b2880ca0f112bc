//! # Subjects API
//!
//! Profile intake, evaluation, review and ledger reads for one subject.
//!
//! ## Endpoints
//!
//! - `PUT /v1/subjects/{subject_id}/profile`: submit answers
//! - `POST /v1/subjects/{subject_id}/evaluate`: run the pipeline
//! - `GET /v1/subjects/{subject_id}/classification`: current version
//! - `GET /v1/subjects/{subject_id}/versions`: full history
//! - `GET /v1/subjects/{subject_id}/versions/{version}`: one version
//! - `POST /v1/subjects/{subject_id}/versions/{version}/review`: sign-off or override
//! - `GET /v1/subjects/{subject_id}/versions/{version}/gaps`: transparency gap report
//! - `POST /v1/subjects/{subject_id}/reassessment`: register a trigger
//! - `POST /v1/subjects/{subject_id}/retire`: retire the subject
//! - `GET /v1/subjects/{subject_id}/verify`: verify the version chain
//!
//! Engine calls run on the blocking pool; request parsing stays on the
//! runtime.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use airc_classify::GapReport;
use airc_core::{AnswerMap, Classification, EngineError, ReviewerId};
use airc_engine::ReviewRequest;
use airc_ledger::{ChainReport, ClassificationVersion};
use airc_state::{MonitorState, TriggerDisposition, TriggerReason};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_subject, parse_version, Validate};
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// Answers for a subject's profile.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SubmitProfileRequest {
    /// Answers keyed by question key, each `{kind, value}`.
    #[schema(value_type = Object)]
    pub answers: AnswerMap,
}

impl Validate for SubmitProfileRequest {
    fn validate(&self) -> Result<(), String> {
        if self.answers.is_empty() {
            return Err("answers must not be empty".to_string());
        }
        Ok(())
    }
}

/// Result of a profile submission.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitProfileResponse {
    pub subject_id: String,
    pub profile_version: u64,
    /// False if the answers were identical to the stored ones.
    pub changed: bool,
    /// What happened to the `profile_changed` trigger, if one was fired.
    #[schema(value_type = Option<String>)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reassessment: Option<TriggerDisposition>,
}

/// A sign-off or override of a version.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ReviewBody {
    /// One of `BLOCKED`, `HIGH_RISK_CANDIDATE`, `LIMITED_RISK`, `MINIMAL_RISK`.
    pub final_classification: String,
    /// Reviewer identity checked against the capability grants.
    pub reviewer: String,
    /// Required when the final classification differs from the suggestion.
    #[serde(default)]
    pub rationale: String,
}

impl Validate for ReviewBody {
    fn validate(&self) -> Result<(), String> {
        if self.reviewer.trim().is_empty() {
            return Err("reviewer must not be empty".to_string());
        }
        Ok(())
    }
}

/// A reassessment trigger.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct TriggerBody {
    /// Tagged reason, e.g. `{"kind": "critical_incident", "incident": "INC-7"}`.
    #[schema(value_type = Object)]
    pub reason: TriggerReason,
    /// Also run the pending reassessment before responding.
    #[serde(default)]
    pub run: bool,
}

impl Validate for TriggerBody {
    fn validate(&self) -> Result<(), String> {
        let blank = match &self.reason {
            TriggerReason::LinkedVendorChanged { vendor } => vendor.trim().is_empty(),
            TriggerReason::CriticalIncident { incident } => incident.trim().is_empty(),
            TriggerReason::ProfileChanged { .. } | TriggerReason::ScheduledReview { .. } => false,
        };
        if blank {
            return Err("trigger reference must not be empty".to_string());
        }
        Ok(())
    }
}

/// Result of a trigger.
#[derive(Debug, Serialize, ToSchema)]
pub struct TriggerResponse {
    #[schema(value_type = String)]
    pub disposition: TriggerDisposition,
    /// The version sealed by the run, when `run` was requested.
    #[schema(value_type = Option<Object>)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<ClassificationVersion>,
}

/// Why a subject is retired.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RetireBody {
    pub reason: String,
}

impl Validate for RetireBody {
    fn validate(&self) -> Result<(), String> {
        if self.reason.trim().is_empty() {
            return Err("reason must not be empty".to_string());
        }
        Ok(())
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the subjects router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/subjects/{subject_id}/profile", put(submit_profile))
        .route("/v1/subjects/{subject_id}/evaluate", post(evaluate))
        .route("/v1/subjects/{subject_id}/classification", get(get_classification))
        .route("/v1/subjects/{subject_id}/versions", get(list_versions))
        .route("/v1/subjects/{subject_id}/versions/{version}", get(get_version))
        .route(
            "/v1/subjects/{subject_id}/versions/{version}/review",
            post(review_version),
        )
        .route(
            "/v1/subjects/{subject_id}/versions/{version}/gaps",
            get(get_gaps),
        )
        .route("/v1/subjects/{subject_id}/reassessment", post(trigger_reassessment))
        .route("/v1/subjects/{subject_id}/retire", post(retire_subject))
        .route("/v1/subjects/{subject_id}/verify", get(verify_chain))
}

// ── Handlers ────────────────────────────────────────────────────────

/// PUT /v1/subjects/{subject_id}/profile: Submit answers.
///
/// A real change to a subject that already has a sealed version fires a
/// `profile_changed` trigger.
#[utoipa::path(
    put,
    path = "/v1/subjects/{subject_id}/profile",
    params(("subject_id" = String, Path, description = "Subject UUID")),
    request_body = SubmitProfileRequest,
    responses(
        (status = 200, description = "Profile stored", body = SubmitProfileResponse),
        (status = 422, description = "Malformed answers", body = crate::error::ErrorBody),
    ),
    tag = "subjects"
)]
pub async fn submit_profile(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    body: Result<Json<SubmitProfileRequest>, JsonRejection>,
) -> Result<Json<SubmitProfileResponse>, AppError> {
    let subject = parse_subject(&subject_id)?;
    let req = extract_validated_json(body)?;
    let response = state
        .blocking(move |state| {
            let outcome = state.profiles.submit(subject, req.answers)?;
            let reassessment = if outcome.changed
                && state.engine.monitor_state(subject) != Some(MonitorState::Retired)
            {
                match state.engine.get_current(subject) {
                    Ok(_) => Some(state.engine.trigger_reassessment(
                        subject,
                        TriggerReason::ProfileChanged {
                            profile_version: outcome.profile_version,
                        },
                    )?),
                    Err(EngineError::NotFound(_)) => None,
                    Err(e) => return Err(e.into()),
                }
            } else {
                None
            };
            Ok(SubmitProfileResponse {
                subject_id: subject.to_string(),
                profile_version: outcome.profile_version,
                changed: outcome.changed,
                reassessment,
            })
        })
        .await?;
    Ok(Json(response))
}

/// POST /v1/subjects/{subject_id}/evaluate: Run the pipeline and seal a version.
#[utoipa::path(
    post,
    path = "/v1/subjects/{subject_id}/evaluate",
    params(("subject_id" = String, Path, description = "Subject UUID")),
    responses(
        (status = 201, description = "Version sealed", body = serde_json::Value),
        (status = 404, description = "No profile for subject", body = crate::error::ErrorBody),
        (status = 409, description = "Run already in flight", body = crate::error::ErrorBody),
        (status = 422, description = "Incomplete profile", body = crate::error::ErrorBody),
    ),
    tag = "subjects"
)]
pub async fn evaluate(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<(StatusCode, Json<ClassificationVersion>), AppError> {
    let subject = parse_subject(&subject_id)?;
    let version = state
        .blocking(move |state| Ok(state.engine.evaluate(subject)?))
        .await?;
    Ok((StatusCode::CREATED, Json(version)))
}

/// GET /v1/subjects/{subject_id}/classification: Current version.
#[utoipa::path(
    get,
    path = "/v1/subjects/{subject_id}/classification",
    params(("subject_id" = String, Path, description = "Subject UUID")),
    responses(
        (status = 200, description = "Latest sealed version", body = serde_json::Value),
        (status = 404, description = "No versions", body = crate::error::ErrorBody),
    ),
    tag = "subjects"
)]
pub async fn get_classification(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<ClassificationVersion>, AppError> {
    let subject = parse_subject(&subject_id)?;
    let current = state
        .blocking(move |state| Ok(state.engine.get_current(subject)?))
        .await?;
    Ok(Json(current))
}

/// GET /v1/subjects/{subject_id}/versions: Full history, ascending.
#[utoipa::path(
    get,
    path = "/v1/subjects/{subject_id}/versions",
    params(("subject_id" = String, Path, description = "Subject UUID")),
    responses(
        (status = 200, description = "Every sealed version", body = serde_json::Value),
        (status = 404, description = "No versions", body = crate::error::ErrorBody),
    ),
    tag = "subjects"
)]
pub async fn list_versions(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<Vec<ClassificationVersion>>, AppError> {
    let subject = parse_subject(&subject_id)?;
    let history = state
        .blocking(move |state| Ok(state.engine.get_history(subject)?))
        .await?;
    Ok(Json(history))
}

/// GET /v1/subjects/{subject_id}/versions/{version}: One version.
#[utoipa::path(
    get,
    path = "/v1/subjects/{subject_id}/versions/{version}",
    params(
        ("subject_id" = String, Path, description = "Subject UUID"),
        ("version" = u64, Path, description = "Version number, from 1"),
    ),
    responses(
        (status = 200, description = "The version", body = serde_json::Value),
        (status = 404, description = "No such version", body = crate::error::ErrorBody),
    ),
    tag = "subjects"
)]
pub async fn get_version(
    State(state): State<AppState>,
    Path((subject_id, version)): Path<(String, u64)>,
) -> Result<Json<ClassificationVersion>, AppError> {
    let subject = parse_subject(&subject_id)?;
    let number = parse_version(version)?;
    let found = state
        .blocking(move |state| Ok(state.engine.get_version(subject, number)?))
        .await?;
    Ok(Json(found))
}

/// POST /v1/subjects/{subject_id}/versions/{version}/review: Sign off or override.
#[utoipa::path(
    post,
    path = "/v1/subjects/{subject_id}/versions/{version}/review",
    params(
        ("subject_id" = String, Path, description = "Subject UUID"),
        ("version" = u64, Path, description = "Version under review; must be current"),
    ),
    request_body = ReviewBody,
    responses(
        (status = 201, description = "Review sealed as a new version", body = serde_json::Value),
        (status = 403, description = "Reviewer lacks capability", body = crate::error::ErrorBody),
        (status = 409, description = "Version superseded", body = crate::error::ErrorBody),
        (status = 422, description = "Missing or short rationale", body = crate::error::ErrorBody),
    ),
    tag = "subjects"
)]
pub async fn review_version(
    State(state): State<AppState>,
    Path((subject_id, version)): Path<(String, u64)>,
    body: Result<Json<ReviewBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ClassificationVersion>), AppError> {
    let subject = parse_subject(&subject_id)?;
    let number = parse_version(version)?;
    let req = extract_validated_json(body)?;
    let final_classification: Classification = req.final_classification.parse()?;
    let reviewer = ReviewerId::new(req.reviewer)?;

    let request = ReviewRequest {
        subject_id: subject,
        version: number,
        final_classification,
        reviewer,
        rationale: req.rationale,
    };
    let sealed = state
        .blocking(move |state| Ok(state.engine.override_classification(request)?))
        .await?;
    Ok((StatusCode::CREATED, Json(sealed)))
}

/// GET /v1/subjects/{subject_id}/versions/{version}/gaps: Transparency gap report.
#[utoipa::path(
    get,
    path = "/v1/subjects/{subject_id}/versions/{version}/gaps",
    params(
        ("subject_id" = String, Path, description = "Subject UUID"),
        ("version" = u64, Path, description = "Version number, from 1"),
    ),
    responses(
        (status = 200, description = "Gap report", body = serde_json::Value),
        (status = 404, description = "No such version", body = crate::error::ErrorBody),
    ),
    tag = "subjects"
)]
pub async fn get_gaps(
    State(state): State<AppState>,
    Path((subject_id, version)): Path<(String, u64)>,
) -> Result<Json<GapReport>, AppError> {
    let subject = parse_subject(&subject_id)?;
    let number = parse_version(version)?;
    let report = state
        .blocking(move |state| Ok(state.engine.gap_report(subject, number)?))
        .await?;
    Ok(Json(report))
}

/// POST /v1/subjects/{subject_id}/reassessment: Register a trigger.
#[utoipa::path(
    post,
    path = "/v1/subjects/{subject_id}/reassessment",
    params(("subject_id" = String, Path, description = "Subject UUID")),
    request_body = TriggerBody,
    responses(
        (status = 202, description = "Trigger registered", body = TriggerResponse),
        (status = 422, description = "Subject retired", body = crate::error::ErrorBody),
    ),
    tag = "subjects"
)]
pub async fn trigger_reassessment(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    body: Result<Json<TriggerBody>, JsonRejection>,
) -> Result<(StatusCode, Json<TriggerResponse>), AppError> {
    let subject = parse_subject(&subject_id)?;
    let req = extract_validated_json(body)?;
    let response = state
        .blocking(move |state| {
            let disposition = state.engine.trigger_reassessment(subject, req.reason)?;
            let version = if req.run {
                state.engine.reassess_subject(subject)?
            } else {
                None
            };
            Ok(TriggerResponse {
                disposition,
                version,
            })
        })
        .await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// POST /v1/subjects/{subject_id}/retire: Stop accepting triggers and reviews.
#[utoipa::path(
    post,
    path = "/v1/subjects/{subject_id}/retire",
    params(("subject_id" = String, Path, description = "Subject UUID")),
    request_body = RetireBody,
    responses(
        (status = 204, description = "Subject retired"),
        (status = 409, description = "Run in flight", body = crate::error::ErrorBody),
        (status = 422, description = "Already retired", body = crate::error::ErrorBody),
    ),
    tag = "subjects"
)]
pub async fn retire_subject(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    body: Result<Json<RetireBody>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let subject = parse_subject(&subject_id)?;
    let req = extract_validated_json(body)?;
    state
        .blocking(move |state| Ok(state.engine.retire_subject(subject, req.reason.trim())?))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/subjects/{subject_id}/verify: Re-derive digests and links.
#[utoipa::path(
    get,
    path = "/v1/subjects/{subject_id}/verify",
    params(("subject_id" = String, Path, description = "Subject UUID")),
    responses(
        (status = 200, description = "Chain report", body = serde_json::Value),
    ),
    tag = "subjects"
)]
pub async fn verify_chain(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<ChainReport>, AppError> {
    let subject = parse_subject(&subject_id)?;
    let report = state
        .blocking(move |state| Ok(state.engine.verify_history(subject)?))
        .await?;
    Ok(Json(report))
}
