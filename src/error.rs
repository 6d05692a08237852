//! Error taxonomy shared by the session store, the backend provider and the
//! admin API client.

/// Authentication failures surfaced to callers.
///
/// `Network` is kept apart from `Unauthorized` so callers can tell a transient
/// outage (retry later) from rejected credentials (ask the user again).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Credentials were rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// The session could not be re-validated, or there is nothing to refresh.
    #[error("Session expired")]
    SessionExpired,

    /// The backend could not be reached or timed out.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with something unexpected.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Invalid client or provider configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Whether retrying the same call later could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            Self::Network(err.to_string())
        } else {
            Self::Provider(err.to_string())
        }
    }
}
