//! # ipe-admin (admin authentication and session service)
//!
//! `ipe-admin` gates the internal dashboard of the IPE real-estate site behind a
//! single shared admin secret, and ships the client-side session machinery the
//! dashboard uses to track who is signed in.
//!
//! ## Credential check and cookie
//!
//! `POST /api/login` compares the submitted password against the configured
//! admin secret and, on a match, sets the `admin-auth` cookie. The cookie value
//! is a signed token (`<expires_at>.<nonce>.<hmac>`) rather than the secret
//! itself; `DELETE /api/logout` clears it.
//!
//! - **No fallback secret:** the service refuses to start without an admin
//!   secret, and rejects the legacy `suasenha123` default.
//! - **Rate limiting:** login attempts are limited per client IP, with a
//!   cooldown after repeated failures.
//!
//! ## Route guard
//!
//! Protected routes verify the cookie signature and expiry on every request.
//! There is no revocation list; rotating the admin secret invalidates every
//! outstanding cookie.
//!
//! ## Session store
//!
//! [`session::SessionStore`] is an observable holding the backend (Supabase)
//! session, with replay-on-subscribe semantics. [`session::SessionHook`] adapts
//! it for view code.

pub mod api;
pub mod cli;
pub mod client;
pub mod error;
pub mod session;

pub use error::AuthError;

use std::time::{SystemTime, UNIX_EPOCH};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Current time as unix seconds; a clock before the epoch reads as 0.
#[must_use]
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX)
        })
}
