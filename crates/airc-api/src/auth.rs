//! # Bearer Token Gate
//!
//! Optional static bearer token for the `/v1` routes. With no `AUTH_TOKEN`
//! configured every request passes. Reviewer identity is not derived from
//! the token: it travels in the review body and the engine checks its
//! capabilities.

use axum::extract::Request;
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;

use crate::error::ErrorBody;

/// Token configuration carried in request extensions. `Debug` redacts it.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    MissingHeader,
    WrongScheme,
    WrongToken,
}

impl Rejection {
    fn message(self) -> &'static str {
        match self {
            Self::MissingHeader => "missing authorization header",
            Self::WrongScheme => "authorization header must use Bearer scheme",
            Self::WrongToken => "invalid bearer token",
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        tracing::warn!(reason = self.message(), "request rejected by token gate");
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody::new("UNAUTHORIZED", self.message())),
        )
            .into_response()
    }
}

/// Compare in constant time. A length mismatch still burns one comparison.
fn tokens_match(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

fn check(headers: &HeaderMap, expected: &str) -> Result<(), Rejection> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(Rejection::MissingHeader)?;
    let provided = value
        .strip_prefix("Bearer ")
        .ok_or(Rejection::WrongScheme)?;
    if tokens_match(provided.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(Rejection::WrongToken)
    }
}

/// Middleware enforcing [`AuthConfig::token`] when one is set.
pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let expected = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.token.clone());
    if let Some(expected) = expected {
        if let Err(rejection) = check(request.headers(), &expected) {
            return rejection.into_response();
        }
    }
    next.run(request).await
}
