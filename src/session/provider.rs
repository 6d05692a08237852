use async_trait::async_trait;

use super::model::{Credentials, Session};
use crate::error::AuthError;

/// Backend that turns credentials into sessions.
///
/// Implementations must map unreachable backends to [`AuthError::Network`]
/// and rejected credentials or refresh tokens to [`AuthError::Unauthorized`]
/// or [`AuthError::SessionExpired`].
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError>;

    async fn refresh(&self, session: &Session) -> Result<Session, AuthError>;

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;
}
