use axum::{Json, extract::Extension, response::IntoResponse};

use super::{
    cookie::AdminGrant,
    types::{AdminSessionResponse, ErrorResponse},
};

#[utoipa::path(
    get,
    path = "/api/admin/session",
    responses(
        (status = 200, description = "Admin cookie is valid", body = AdminSessionResponse),
        (status = 401, description = "Missing, invalid or expired cookie", body = ErrorResponse)
    ),
    tag = "auth"
)]
/// Report the expiry of the caller's admin cookie.
///
/// The guard has already verified the cookie; this only echoes the grant.
pub async fn admin_session(grant: Extension<AdminGrant>) -> impl IntoResponse {
    Json(AdminSessionResponse {
        ok: true,
        expires_at: grant.expires_at,
    })
}
