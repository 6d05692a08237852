use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

use super::{cookie::clear_auth_cookie, state::AuthState, types::OkResponse};

#[utoipa::path(
    delete,
    path = "/api/logout",
    responses(
        (status = 200, description = "Cookie cleared", body = OkResponse)
    ),
    tag = "auth"
)]
pub async fn logout(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    // Idempotent: the clearing cookie is sent whether or not one was presented.
    let mut response_headers = HeaderMap::new();
    match clear_auth_cookie(auth_state.config()) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build clearing cookie: {err}"),
    }
    (StatusCode::OK, response_headers, Json(OkResponse::OK))
}
