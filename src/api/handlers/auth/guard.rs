//! Route guard for admin-only routes.
//!
//! Stateless: every request re-verifies the `admin-auth` cookie. API callers
//! get a JSON 401; page requests are redirected to the login page with the
//! original path in `next`.

use axum::{
    Json,
    extract::{Extension, Request},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::debug;
use url::form_urlencoded;

use super::{
    cookie::{AdminGrant, CookieError, extract_auth_token, verify_token},
    state::{AuthConfig, AuthState},
    types::ErrorResponse,
};
use crate::unix_now;

/// Axum middleware that admits only requests carrying a valid admin cookie.
///
/// On success the [`AdminGrant`] is inserted into the request extensions.
pub async fn require_admin(
    Extension(auth_state): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let verdict = authorize(request.headers(), auth_state.config(), unix_now());
    match verdict {
        Ok(grant) => {
            request.extensions_mut().insert(grant);
            next.run(request).await
        }
        Err(err) => {
            let path = request.uri().path();
            debug!(path, "Admin cookie rejected: {err}");
            reject(path, request.uri().query(), auth_state.config())
        }
    }
}

pub(crate) fn authorize(
    headers: &HeaderMap,
    config: &AuthConfig,
    now: i64,
) -> Result<AdminGrant, CookieError> {
    let token = extract_auth_token(headers).ok_or(CookieError::Missing)?;
    verify_token(config.admin_secret(), &token, now)
}

fn reject(path: &str, query: Option<&str>, config: &AuthConfig) -> Response {
    if path == "/api" || path.starts_with("/api/") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Unauthorized")),
        )
            .into_response();
    }
    Redirect::to(&login_redirect(config.login_path(), path, query)).into_response()
}

fn login_redirect(login_path: &str, path: &str, query: Option<&str>) -> String {
    let next = match query {
        Some(query) if !query.is_empty() => format!("{path}?{query}"),
        _ => path.to_string(),
    };
    let encoded: String = form_urlencoded::byte_serialize(next.as_bytes()).collect();
    let separator = if login_path.contains('?') { '&' } else { '?' };
    format!("{login_path}{separator}next={encoded}")
}
