//! In-memory doubles for store and hook tests.

use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;
use uuid::Uuid;

use super::{
    event::{SessionEvent, SessionEventKind},
    model::{Credentials, Session, SessionTokens},
    provider::AuthProvider,
    store::{CookieGate, Navigator},
};
use crate::error::AuthError;

pub(crate) const FAR_FUTURE: i64 = 4_000_000_000;

pub(crate) fn session(email: &str, refresh_token: &str) -> Session {
    Session {
        user_id: Uuid::new_v4(),
        email: email.to_string(),
        role: "authenticated".to_string(),
        issued_at: 1_700_000_000,
        expires_at: FAR_FUTURE,
        tokens: SessionTokens::new(
            SecretString::from(format!("access-{refresh_token}")),
            SecretString::from(refresh_token.to_string()),
        ),
    }
}

pub(crate) fn credentials() -> Credentials {
    Credentials::new(
        "admin@ipeplataformadigital.com.br",
        SecretString::from("ipeplataformadigital".to_string()),
    )
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Provider answering from scripted queues; an empty queue means success.
#[derive(Default)]
pub(crate) struct FakeProvider {
    sign_in_results: Mutex<VecDeque<Result<Session, AuthError>>>,
    refresh_results: Mutex<VecDeque<Result<Session, AuthError>>>,
    sign_out_result: Mutex<Option<AuthError>>,
    signed_out: Mutex<Vec<String>>,
    refreshed: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
}

impl FakeProvider {
    pub(crate) fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub(crate) fn push_sign_in(&self, result: Result<Session, AuthError>) {
        lock(&self.sign_in_results).push_back(result);
    }

    pub(crate) fn push_refresh(&self, result: Result<Session, AuthError>) {
        lock(&self.refresh_results).push_back(result);
    }

    pub(crate) fn fail_sign_out(&self, err: AuthError) {
        *lock(&self.sign_out_result) = Some(err);
    }

    pub(crate) fn signed_out(&self) -> Vec<String> {
        lock(&self.signed_out).clone()
    }

    pub(crate) fn refreshed(&self) -> Vec<String> {
        lock(&self.refreshed).clone()
    }
}

#[async_trait]
impl AuthProvider for FakeProvider {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        lock(&self.sign_in_results)
            .pop_front()
            .unwrap_or_else(|| Ok(session(&credentials.email, "refresh-0")))
    }

    async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
        lock(&self.refreshed).push(session.refresh_token().to_string());
        lock(&self.refresh_results).pop_front().unwrap_or_else(|| {
            let mut next = session.clone();
            next.tokens = SessionTokens::new(
                SecretString::from("access-next".to_string()),
                SecretString::from(format!("{}+", session.refresh_token())),
            );
            Ok(next)
        })
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        lock(&self.signed_out).push(session.email.clone());
        lock(&self.sign_out_result).take().map_or(Ok(()), Err)
    }
}

#[derive(Default)]
pub(crate) struct RecordingCookieGate {
    calls: Mutex<usize>,
    fail: bool,
}

impl RecordingCookieGate {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        *lock(&self.calls)
    }
}

#[async_trait]
impl CookieGate for RecordingCookieGate {
    async fn clear_cookie(&self) -> Result<(), AuthError> {
        *lock(&self.calls) += 1;
        if self.fail {
            Err(AuthError::Network("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
pub(crate) struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub(crate) fn visits(&self) -> Vec<String> {
        lock(&self.visits).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        lock(&self.visits).push(path.to_string());
    }
}

/// Collects event kinds (and emails) seen by one subscriber.
#[derive(Clone, Default)]
pub(crate) struct EventLog {
    events: Arc<Mutex<Vec<(SessionEventKind, Option<String>)>>>,
}

impl EventLog {
    pub(crate) fn listener(&self) -> impl Fn(&SessionEvent) + Send + Sync + 'static {
        let events = Arc::clone(&self.events);
        move |event: &SessionEvent| {
            lock(&events).push((
                event.kind,
                event.session.as_ref().map(|session| session.email.clone()),
            ));
        }
    }

    pub(crate) fn kinds(&self) -> Vec<SessionEventKind> {
        lock(&self.events).iter().map(|(kind, _)| *kind).collect()
    }

    pub(crate) fn entries(&self) -> Vec<(SessionEventKind, Option<String>)> {
        lock(&self.events).clone()
    }
}
