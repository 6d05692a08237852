//! Supabase GoTrue provider.
//!
//! Speaks the three REST calls the dashboard needs: password grant, refresh
//! token grant and logout. Every call carries the project `apikey` header.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use super::{
    model::{Credentials, Session, SessionTokens},
    provider::AuthProvider,
};
use crate::{APP_USER_AGENT, error::AuthError, unix_now};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct SupabaseConfig {
    url: Url,
    anon_key: SecretString,
    timeout: Duration,
}

impl SupabaseConfig {
    /// # Errors
    /// Returns [`AuthError::Config`] if the URL is not absolute http(s) or the key is blank.
    pub fn new(url: &str, anon_key: SecretString) -> Result<Self, AuthError> {
        let mut url =
            Url::parse(url).map_err(|err| AuthError::Config(format!("invalid url {url}: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
            return Err(AuthError::Config(format!(
                "unsupported supabase url: {url}"
            )));
        }
        if anon_key.expose_secret().trim().is_empty() {
            return Err(AuthError::Config("missing supabase anon key".to_string()));
        }
        // Url::join drops the last path segment unless it ends with '/'.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self {
            url,
            anon_key,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        self.url
            .join(path)
            .map_err(|err| AuthError::Config(format!("invalid endpoint {path}: {err}")))
    }
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"***")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: TokenUser,
}

#[derive(Deserialize, Debug)]
struct TokenUser {
    id: Uuid,
    email: Option<String>,
    role: Option<String>,
    #[serde(default)]
    app_metadata: Value,
}

#[derive(Debug, Clone, Copy)]
enum Grant {
    Password,
    RefreshToken,
}

impl Grant {
    fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::RefreshToken => "refresh_token",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SupabaseProvider {
    client: Client,
    config: SupabaseConfig,
}

impl SupabaseProvider {
    /// # Errors
    /// Returns [`AuthError::Config`] if the HTTP client cannot be built.
    pub fn new(config: SupabaseConfig) -> Result<Self, AuthError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|err| AuthError::Config(err.to_string()))?;
        Ok(Self { client, config })
    }

    async fn token(&self, grant: Grant, body: Value) -> Result<Session, AuthError> {
        let url = self.config.endpoint("auth/v1/token")?;
        let response = self
            .client
            .post(url)
            .query(&[("grant_type", grant.as_str())])
            .header("apikey", self.config.anon_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let err = classify_failure(grant, status, &body);
            debug!(grant = grant.as_str(), %status, "Token request rejected: {err}");
            return Err(err);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| AuthError::Provider(format!("invalid token response: {err}")))?;
        session_from_token_response(token, unix_now())
    }
}

#[async_trait]
impl AuthProvider for SupabaseProvider {
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let body = json!({
            "email": credentials.email,
            "password": credentials.password.expose_secret(),
        });
        self.token(Grant::Password, body).await
    }

    #[instrument(skip_all)]
    async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
        let body = json!({ "refresh_token": session.refresh_token() });
        self.token(Grant::RefreshToken, body).await
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        // Local scope revokes only this session, not the user's other devices.
        let url = self.config.endpoint("auth/v1/logout?scope=local")?;
        let response = self
            .client
            .post(url)
            .header("apikey", self.config.anon_key.expose_secret())
            .bearer_auth(session.access_token())
            .send()
            .await?;

        let status = response.status();
        match status {
            _ if status.is_success() => Ok(()),
            // The token is already gone on the backend side.
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                warn!(%status, "Backend session already invalid on sign out");
                Ok(())
            }
            _ => Err(AuthError::Provider(format!("logout failed: {status}"))),
        }
    }
}

fn classify_failure(grant: Grant, status: StatusCode, body: &Value) -> AuthError {
    let message = body["error_description"]
        .as_str()
        .or_else(|| body["msg"].as_str())
        .or_else(|| body["message"].as_str())
        .unwrap_or("");

    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::NOT_FOUND
        | StatusCode::UNPROCESSABLE_ENTITY => match grant {
            Grant::Password => AuthError::Unauthorized,
            Grant::RefreshToken => AuthError::SessionExpired,
        },
        // Gateway failures mean the backend is unreachable from the proxy.
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            AuthError::Network(format!("{status} {message}").trim().to_string())
        }
        _ => AuthError::Provider(format!("{status} {message}").trim().to_string()),
    }
}

fn session_from_token_response(token: TokenResponse, now: i64) -> Result<Session, AuthError> {
    let expires_at = match (token.expires_at, token.expires_in) {
        (Some(expires_at), _) => expires_at,
        (None, Some(expires_in)) => now.saturating_add(expires_in),
        (None, None) => {
            return Err(AuthError::Provider(
                "token response without expiry".to_string(),
            ));
        }
    };
    let issued_at = token
        .expires_in
        .map_or(now, |expires_in| expires_at.saturating_sub(expires_in));

    let role = token.user.app_metadata["role"]
        .as_str()
        .map(str::to_string)
        .or(token.user.role)
        .unwrap_or_else(|| "authenticated".to_string());

    Ok(Session {
        user_id: token.user.id,
        email: token.user.email.unwrap_or_default(),
        role,
        issued_at,
        expires_at,
        tokens: SessionTokens::new(
            SecretString::from(token.access_token),
            SecretString::from(token.refresh_token),
        ),
    })
}
