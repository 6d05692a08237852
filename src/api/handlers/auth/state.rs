//! Auth state and configuration shared by every request.

use std::str::FromStr;
use std::sync::Arc;

use super::{credentials::AdminSecret, rate_limit::RateLimiter};

pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;
/// One year. Keeps the cookie expiry a plain unix timestamp.
pub const MAX_SESSION_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;
const DEFAULT_LOGIN_PATH: &str = "/login";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    admin_secret: AdminSecret,
    environment: Environment,
    session_ttl_seconds: i64,
    login_path: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(admin_secret: AdminSecret) -> Self {
        Self {
            admin_secret,
            environment: Environment::default(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Values outside `1..=MAX_SESSION_TTL_SECONDS` are clamped.
    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds.clamp(1, MAX_SESSION_TTL_SECONDS);
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, login_path: String) -> Self {
        self.login_path = login_path;
        self
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub(super) fn admin_secret(&self) -> &AdminSecret {
        &self.admin_secret
    }

    pub(super) fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    // Browsers drop Secure cookies on plain http, so only production sets it.
    pub(super) fn cookie_secure(&self) -> bool {
        self.environment == Environment::Production
    }
}

pub struct AuthState {
    config: AuthConfig,
    rate_limiter: Arc<dyn RateLimiter>,
}

impl AuthState {
    pub fn new(config: AuthConfig, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            config,
            rate_limiter,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(super) fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }
}
