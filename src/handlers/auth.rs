//! HTTP basic authentication middleware.
//!
//! Layered onto the router only when `basic_auth_users` is configured.
//! Credentials are checked against the static username/password map loaded
//! at startup; every failure path answers 401 with a `WWW-Authenticate`
//! challenge without invoking the wrapped handler. Stateless, no rate
//! limiting.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use base64::Engine;
use tracing::{debug, warn};

const CHALLENGE: &str = "Basic realm=\"Restricted\"";

/// Why a request failed authentication. Only ever logged, never sent to the
/// client beyond the generic 401.
#[derive(Debug, PartialEq)]
pub enum AuthFailure {
    MissingHeader,
    NotBasic,
    MalformedCredentials,
    UnknownUser,
    WrongPassword,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            AuthFailure::MissingHeader => "no authorization header",
            AuthFailure::NotBasic => "not basic auth",
            AuthFailure::MalformedCredentials => "malformed credentials",
            AuthFailure::UnknownUser => "unknown user",
            AuthFailure::WrongPassword => "wrong password",
        };
        f.write_str(reason)
    }
}

/// Checks an `Authorization` header value against the configured user map.
/// Returns the authenticated username on success.
fn authenticate(
    auth_header: Option<&HeaderValue>,
    users: &HashMap<String, String>,
) -> Result<String, AuthFailure> {
    let auth_str = auth_header
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthFailure::MissingHeader)?;

    let encoded = auth_str
        .strip_prefix("Basic ")
        .ok_or(AuthFailure::NotBasic)?;

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| AuthFailure::MalformedCredentials)?;
    let decoded_str =
        String::from_utf8(decoded).map_err(|_| AuthFailure::MalformedCredentials)?;

    let (user, pass) = decoded_str
        .split_once(':')
        .ok_or(AuthFailure::MalformedCredentials)?;

    let expected = users.get(user).ok_or(AuthFailure::UnknownUser)?;
    if expected != pass {
        return Err(AuthFailure::WrongPassword);
    }

    Ok(user.to_owned())
}

fn unauthorized() -> axum::response::Response {
    axum::response::Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .header(header::WWW_AUTHENTICATE, CHALLENGE)
        .body(Body::from("Unauthorized"))
        .unwrap()
}

/// Basic auth middleware wrapping the metrics handler.
pub async fn basic_auth_middleware(
    State(users): State<Arc<HashMap<String, String>>>,
    req: Request,
    next: Next,
) -> axum::response::Response {
    let path = req.uri().path().to_owned();

    match authenticate(req.headers().get(header::AUTHORIZATION), &users) {
        Ok(user) => {
            debug!(user = %user, path = %path, "authenticated");
            next.run(req).await
        }
        Err(reason) => {
            warn!(path = %path, "auth failed: {}", reason);
            unauthorized()
        }
    }
}
