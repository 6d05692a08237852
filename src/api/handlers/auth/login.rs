//! Password login that issues the `admin-auth` cookie.

use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{RETRY_AFTER, SET_COOKIE},
    },
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{
    cookie::{auth_cookie, issue_token},
    rate_limit::RateLimitDecision,
    state::AuthState,
    types::{ErrorResponse, LoginRequest, OkResponse},
    utils::extract_client_ip,
};
use crate::unix_now;

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Password accepted, cookie set", body = OkResponse),
        (status = 400, description = "Missing or malformed body", body = ErrorResponse),
        (status = 401, description = "Wrong password", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
        (status = 500, description = "Cookie could not be issued", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let client_ip = extract_client_ip(&headers);
    let limiter = auth_state.rate_limiter();

    match limiter.check_ip(client_ip.as_deref()) {
        RateLimitDecision::Allowed => {}
        RateLimitDecision::Limited => {
            warn!(client_ip = client_ip.as_deref(), "Login rate limited");
            return too_many_requests(None).into_response();
        }
        RateLimitDecision::Cooldown { remaining_seconds } => {
            warn!(
                client_ip = client_ip.as_deref(),
                remaining_seconds, "Login in cooldown"
            );
            return too_many_requests(Some(remaining_seconds)).into_response();
        }
    }

    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Bad Request")),
            )
                .into_response();
        }
    };

    let config = auth_state.config();
    if !config.admin_secret().matches(&request.senha) {
        limiter.record_failure(client_ip.as_deref());
        info!(client_ip = client_ip.as_deref(), "Admin login rejected");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Unauthorized")),
        )
            .into_response();
    }

    let Some(token) = issue_token(
        config.admin_secret(),
        unix_now(),
        config.session_ttl_seconds(),
    ) else {
        error!("Failed to generate admin cookie token");
        return internal_error("Failed to issue session cookie").into_response();
    };

    let cookie = match auth_cookie(config, &token) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build admin cookie: {err}");
            return internal_error("Failed to issue session cookie").into_response();
        }
    };

    limiter.record_success(client_ip.as_deref());
    info!(client_ip = client_ip.as_deref(), "Admin login accepted");

    let mut response_headers = HeaderMap::new();
    response_headers.insert(SET_COOKIE, cookie);
    (StatusCode::OK, response_headers, Json(OkResponse::OK)).into_response()
}

fn too_many_requests(retry_after: Option<u64>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    if let Some(seconds) = retry_after {
        headers.insert(RETRY_AFTER, HeaderValue::from(seconds));
    }
    (
        StatusCode::TOO_MANY_REQUESTS,
        headers,
        Json(ErrorResponse::new("Too Many Requests")),
    )
}

fn internal_error(message: &str) -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(message)),
    )
}
