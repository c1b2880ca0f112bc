//! # airc-api: Axum API Services
//!
//! HTTP surface over the classification engine.
//!
//! ## API Surface
//!
//! | Prefix                    | Module                 | Domain                          |
//! |---------------------------|------------------------|---------------------------------|
//! | `/v1/subjects/*`          | [`routes::subjects`]   | Intake, evaluation, review, ledger |
//! | `/openapi.json`           | [`openapi`]            | Generated OpenAPI document      |
//! | `/health/*`               | this module            | Probes (unauthenticated)        |
//! | `/metrics`                | [`metrics`]            | Prometheus scrape (unauthenticated) |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod error;
pub mod extractors;
pub mod metrics;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::metrics::ApiMetrics;
use crate::state::AppState;

pub use error::AppError;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) and `/metrics` are mounted outside the auth
/// middleware so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = if state.config.metrics_enabled {
        match ApiMetrics::new() {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::error!(error = %e, "metrics registry unavailable, /metrics disabled");
                None
            }
        }
    } else {
        None
    };

    let mut api = Router::new()
        .merge(routes::subjects::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware));
    if let Some(m) = &metrics {
        api = api
            .layer(from_fn(metrics::metrics_middleware))
            .layer(axum::Extension(m.clone()));
    }
    let api = api
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));
    if let Some(m) = metrics {
        unauthenticated = unauthenticated
            .route("/metrics", axum::routing::get(metrics::prometheus_metrics))
            .layer(axum::Extension(m));
    }

    Router::new()
        .merge(unauthenticated.with_state(state))
        .merge(api)
}

/// Liveness probe.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe.
async fn readiness() -> &'static str {
    "ready"
}
