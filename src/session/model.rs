use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use uuid::Uuid;

/// Backend tokens for a session. Never serialized and redacted in `Debug`.
#[derive(Clone)]
pub struct SessionTokens {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
}

impl SessionTokens {
    #[must_use]
    pub fn new(access_token: SecretString, refresh_token: SecretString) -> Self {
        Self {
            access_token,
            refresh_token,
        }
    }
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .finish()
    }
}

/// Authenticated identity and its validity window.
#[derive(Clone, Debug, Serialize)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
    /// Unix seconds.
    pub issued_at: i64,
    /// Unix seconds.
    pub expires_at: i64,
    #[serde(skip)]
    pub tokens: SessionTokens,
}

impl Session {
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    pub(crate) fn refresh_token(&self) -> &str {
        self.tokens.refresh_token.expose_secret()
    }

    pub(crate) fn access_token(&self) -> &str {
        self.tokens.access_token.expose_secret()
    }
}

/// Email/password pair submitted to the backend.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: SecretString) -> Self {
        Self {
            email: email.into(),
            password,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}
