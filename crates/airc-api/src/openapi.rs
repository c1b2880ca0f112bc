//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into one OpenAPI document served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "AIRC API: AI System Risk Classification",
        version = "0.1.0",
        description = "Staged risk classification of AI systems with human review, an append-only version ledger and trigger-driven reassessment.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::subjects::submit_profile,
        crate::routes::subjects::evaluate,
        crate::routes::subjects::get_classification,
        crate::routes::subjects::list_versions,
        crate::routes::subjects::get_version,
        crate::routes::subjects::review_version,
        crate::routes::subjects::get_gaps,
        crate::routes::subjects::trigger_reassessment,
        crate::routes::subjects::retire_subject,
        crate::routes::subjects::verify_chain,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::subjects::SubmitProfileRequest,
        crate::routes::subjects::SubmitProfileResponse,
        crate::routes::subjects::ReviewBody,
        crate::routes::subjects::TriggerBody,
        crate::routes::subjects::TriggerResponse,
        crate::routes::subjects::RetireBody,
    )),
    tags(
        (name = "subjects", description = "Classification, review and reassessment of AI systems"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
