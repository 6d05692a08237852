//! HTTP handlers for the admin API.

pub mod auth;
pub mod health;

/// Plain banner for `GET /`.
pub async fn root() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}
