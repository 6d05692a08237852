//! The `admin-auth` cookie: signed token format and `Set-Cookie` values.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};
use base64ct::{Base64UrlUnpadded, Encoding};
use once_cell::sync::Lazy;
use rand::{RngCore, rngs::OsRng};
use regex::Regex;

use super::{credentials::AdminSecret, state::AuthConfig};

pub const AUTH_COOKIE_NAME: &str = "admin-auth";

const NONCE_LEN: usize = 16;

// expiry (unix seconds) . nonce (16 bytes) . HMAC-SHA256 (32 bytes), base64url without padding
static TOKEN_SHAPE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[0-9]{1,12}\.[A-Za-z0-9_-]{22}\.[A-Za-z0-9_-]{43}$").ok());

/// Verified contents of an `admin-auth` cookie.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdminGrant {
    pub expires_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CookieError {
    #[error("auth cookie missing")]
    Missing,
    #[error("auth cookie malformed")]
    Malformed,
    #[error("auth cookie signature mismatch")]
    BadSignature,
    #[error("auth cookie expired")]
    Expired,
}

/// Mint a token valid for `ttl_seconds` from `now`.
///
/// Returns `None` if the OS RNG fails.
pub(crate) fn issue_token(secret: &AdminSecret, now: i64, ttl_seconds: i64) -> Option<String> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.try_fill_bytes(&mut nonce).ok()?;

    let expires_at = now.saturating_add(ttl_seconds);
    let payload = format!("{expires_at}.{}", Base64UrlUnpadded::encode_string(&nonce));
    let signature = secret.sign(payload.as_bytes())?;
    Some(format!(
        "{payload}.{}",
        Base64UrlUnpadded::encode_string(&signature)
    ))
}

/// Check shape, signature and expiry of a presented token.
pub(crate) fn verify_token(
    secret: &AdminSecret,
    token: &str,
    now: i64,
) -> Result<AdminGrant, CookieError> {
    let shaped = TOKEN_SHAPE
        .as_ref()
        .is_some_and(|regex| regex.is_match(token));
    if !shaped {
        return Err(CookieError::Malformed);
    }

    let (payload, signature) = token.rsplit_once('.').ok_or(CookieError::Malformed)?;
    let signature = Base64UrlUnpadded::decode_vec(signature).map_err(|_| CookieError::Malformed)?;
    if !secret.verify(payload.as_bytes(), &signature) {
        return Err(CookieError::BadSignature);
    }

    let expires_at = payload
        .split_once('.')
        .and_then(|(expiry, _nonce)| expiry.parse::<i64>().ok())
        .ok_or(CookieError::Malformed)?;
    if expires_at <= now {
        return Err(CookieError::Expired);
    }

    Ok(AdminGrant { expires_at })
}

/// Build the `Set-Cookie` value for a freshly issued token.
pub(crate) fn auth_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let max_age = config.session_ttl_seconds();
    let mut cookie =
        format!("{AUTH_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Build the `Set-Cookie` value that removes the cookie.
pub(crate) fn clear_auth_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{AUTH_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Read the `admin-auth` value from the `Cookie` header, if any.
pub(crate) fn extract_auth_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == AUTH_COOKIE_NAME)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
