//! HTTP Basic auth gate
//!
//! The expected credentials come from two environment variables. With both
//! set, every request must present them. With both unset, the gate is open.
//! With only one set, every request is refused.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::Response,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::config::AuthConfig;

use super::server::AppState;

const REALM_CHALLENGE: &str = "Basic realm=\"Authentication Required\"";

/// Gate mode derived from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BasicAuth {
    /// No credentials configured; every request passes
    Disabled,
    /// Requests must carry these credentials
    Required { username: String, password: String },
    /// Only one of username/password configured; every request is refused
    Misconfigured,
}

impl BasicAuth {
    /// Read expected credentials from the configured environment variables
    pub fn from_env(config: &AuthConfig) -> Self {
        Self::from_values(
            std::env::var(&config.username_env).ok(),
            std::env::var(&config.password_env).ok(),
        )
    }

    /// Build the gate from optional values; empty strings count as unset
    pub fn from_values(username: Option<String>, password: Option<String>) -> Self {
        let username = username.filter(|u| !u.is_empty());
        let password = password.filter(|p| !p.is_empty());

        match (username, password) {
            (Some(username), Some(password)) => BasicAuth::Required { username, password },
            (None, None) => BasicAuth::Disabled,
            _ => BasicAuth::Misconfigured,
        }
    }

    /// Check an `Authorization` header value against the gate
    pub fn verify(&self, authorization: Option<&HeaderValue>) -> bool {
        match self {
            BasicAuth::Disabled => true,
            BasicAuth::Misconfigured => false,
            BasicAuth::Required { username, password } => authorization
                .and_then(decode_basic)
                .is_some_and(|(u, p)| {
                    let expected = (username.as_str(), password.as_str());
                    credentials_match((u.as_str(), p.as_str()), expected)
                }),
        }
    }
}

/// Compare both fields in constant time, without short-circuiting on the username
fn credentials_match(given: (&str, &str), expected: (&str, &str)) -> bool {
    let username = given.0.as_bytes().ct_eq(expected.0.as_bytes());
    let password = given.1.as_bytes().ct_eq(expected.1.as_bytes());
    (username & password).into()
}

/// Decode `Basic <base64(user:pass)>` into its parts
fn decode_basic(value: &HeaderValue) -> Option<(String, String)> {
    let value = value.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Middleware applying the gate to every route
pub async fn require_basic_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if state
        .auth
        .verify(request.headers().get(header::AUTHORIZATION))
    {
        return next.run(request).await;
    }

    tracing::debug!("Rejected unauthenticated request to {}", request.uri().path());
    unauthorized_response()
}

fn unauthorized_response() -> Response {
    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .header(header::WWW_AUTHENTICATE, REALM_CHALLENGE)
        .body(Body::from("Unauthorized Access"))
        .unwrap_or_else(|_| {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::UNAUTHORIZED;
            response
        })
}
