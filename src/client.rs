//! HTTP client for the admin API.
//!
//! Keeps the `admin-auth` cookie in its own cookie jar, the way a browser
//! would, and doubles as the [`CookieGate`] the session store uses on logout.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::{
    APP_USER_AGENT,
    api::{AdminSessionResponse, ErrorResponse, LoginRequest},
    error::AuthError,
    session::CookieGate,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct AdminClient {
    client: Client,
    base_url: Url,
}

impl AdminClient {
    /// # Errors
    /// Returns [`AuthError::Config`] for an invalid base URL or client setup failure.
    pub fn new(base_url: &str) -> Result<Self, AuthError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| AuthError::Config(format!("invalid admin url {base_url}: {err}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(AuthError::Config(format!(
                "unsupported admin url scheme: {}",
                base_url.scheme()
            )));
        }
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .cookie_store(true)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|err| AuthError::Config(err.to_string()))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        self.base_url
            .join(path)
            .map_err(|err| AuthError::Config(format!("invalid endpoint {path}: {err}")))
    }

    /// Submit the admin password; on success the cookie is kept in the jar.
    ///
    /// # Errors
    /// [`AuthError::Unauthorized`] for a wrong password, [`AuthError::Network`]
    /// when the API is unreachable, [`AuthError::Provider`] otherwise.
    #[instrument(skip_all)]
    pub async fn login(&self, senha: &SecretString) -> Result<(), AuthError> {
        let body = LoginRequest {
            senha: senha.expose_secret().to_string(),
        };
        let response = self
            .client
            .post(self.endpoint("/api/login")?)
            .json(&body)
            .send()
            .await?;
        expect_success(response).await.map(drop)
    }

    /// Ask the API to clear the cookie.
    ///
    /// # Errors
    /// Returns an error if the API cannot be reached or answers with a failure.
    #[instrument(skip_all)]
    pub async fn logout(&self) -> Result<(), AuthError> {
        let response = self
            .client
            .delete(self.endpoint("/api/logout")?)
            .send()
            .await?;
        expect_success(response).await.map(drop)
    }

    /// Check the cookie currently held in the jar.
    ///
    /// # Errors
    /// [`AuthError::Unauthorized`] when the cookie is missing, invalid or expired.
    #[instrument(skip_all)]
    pub async fn admin_session(&self) -> Result<AdminSessionResponse, AuthError> {
        let response = self
            .client
            .get(self.endpoint("/api/admin/session")?)
            .send()
            .await?;
        expect_success(response)
            .await?
            .json()
            .await
            .map_err(|err| AuthError::Provider(format!("invalid session response: {err}")))
    }
}

#[async_trait]
impl CookieGate for AdminClient {
    async fn clear_cookie(&self) -> Result<(), AuthError> {
        self.logout().await
    }
}

async fn expect_success(response: Response) -> Result<Response, AuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<ErrorResponse>()
        .await
        .map(|body| body.error)
        .unwrap_or_default();
    debug!(%status, "Admin API call failed: {message}");

    Err(match status {
        StatusCode::UNAUTHORIZED => AuthError::Unauthorized,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            AuthError::Network(format!("{status} {message}").trim().to_string())
        }
        _ => AuthError::Provider(format!("{status} {message}").trim().to_string()),
    })
}
