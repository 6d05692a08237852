//! Admin authentication handlers and supporting modules.
//!
//! Flow Overview: `POST /api/login` checks the submitted password against the
//! shared admin secret and sets the `admin-auth` cookie; protected routes run
//! [`guard::require_admin`], which verifies the cookie on every request;
//! `DELETE /api/logout` clears the cookie.
//!
//! ## Cookie token
//!
//! The cookie carries `<expires_at>.<nonce>.<signature>`, signed with
//! HMAC-SHA256 keyed by the admin secret. Nothing about the caller is encoded.
//! There is no server-side session table, so a leaked cookie stays valid until
//! it expires; rotating the admin secret invalidates all of them.
//!
//! ## Login Rate Limiting
//!
//! - **Attempt Limit:** 10 attempts per client IP within 10 minutes; successful
//!   logins are not counted.
//! - **Failure Cooldown:** 5 consecutive failures trigger a 15-minute cooldown.

pub(crate) mod cookie;
mod credentials;
pub(crate) mod guard;
pub(crate) mod login;
pub(crate) mod logout;
mod rate_limit;
pub(crate) mod session;
mod state;
pub(crate) mod types;
mod utils;

pub use cookie::{AUTH_COOKIE_NAME, AdminGrant};
pub use credentials::{AdminSecret, SecretError};
pub use guard::require_admin;
pub use rate_limit::{LoginRateLimiter, NoopRateLimiter, RateLimitDecision, RateLimiter};
pub use state::{
    AuthConfig, AuthState, DEFAULT_SESSION_TTL_SECONDS, Environment, MAX_SESSION_TTL_SECONDS,
};

#[cfg(test)]
mod tests;
