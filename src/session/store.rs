//! Observable session store.
//!
//! Holds at most one backend session and publishes every change as a
//! [`SessionEvent`]. New subscribers get the current state replayed before any
//! later event, and all subscribers observe a single global event order.
//!
//! Locking:
//! - `ops` (async) serializes `login`, `refresh` and `logout`.
//! - `dispatch` serializes state commits, fan-out and subscribe-with-replay.
//! - `listeners` only guards the registry; it is never held while a listener runs,
//!   so a listener may drop its own [`Subscription`]. Calling `subscribe` from
//!   inside a listener deadlocks.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use tracing::{debug, info, warn};

use super::{
    event::SessionEvent,
    model::{Credentials, Session},
    provider::AuthProvider,
};
use crate::{error::AuthError, unix_now};

const DEFAULT_LOGIN_PATH: &str = "/login";

pub type SessionListener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// Clears the `admin-auth` cookie on logout.
#[async_trait]
pub trait CookieGate: Send + Sync {
    async fn clear_cookie(&self) -> Result<(), AuthError>;
}

#[derive(Clone, Debug, Default)]
pub struct NoopCookieGate;

#[async_trait]
impl CookieGate for NoopCookieGate {
    async fn clear_cookie(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Moves the view to another location after logout.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

#[derive(Clone, Debug, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, _path: &str) {}
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<(u64, SessionListener)>,
}

struct Inner {
    provider: Arc<dyn AuthProvider>,
    cookie_gate: Arc<dyn CookieGate>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    clock: fn() -> i64,
    current: RwLock<Option<Session>>,
    listeners: Mutex<Registry>,
    dispatch: Mutex<()>,
    ops: tokio::sync::Mutex<()>,
}

impl Inner {
    fn cached(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_registered(&self, id: u64) -> bool {
        self.registry().entries.iter().any(|(entry, _)| *entry == id)
    }

    fn remove(&self, id: u64) {
        self.registry().entries.retain(|(entry, _)| *entry != id);
    }

    /// Replace the cached session and publish `event` as one step.
    fn commit(&self, session: Option<Session>, event: &SessionEvent) {
        let _dispatch = self.dispatch.lock().unwrap_or_else(PoisonError::into_inner);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = session;

        let snapshot = self.registry().entries.clone();
        for (id, listener) in snapshot {
            // Skip listeners removed by an earlier listener in this fan-out.
            if self.is_registered(id) {
                listener(event);
            }
        }
    }
}

/// Single source of truth for the signed-in backend session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    #[must_use]
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self::from_parts(
            provider,
            Arc::new(NoopCookieGate),
            Arc::new(NoopNavigator),
            DEFAULT_LOGIN_PATH.to_string(),
            unix_now,
        )
    }

    fn from_parts(
        provider: Arc<dyn AuthProvider>,
        cookie_gate: Arc<dyn CookieGate>,
        navigator: Arc<dyn Navigator>,
        login_path: String,
        clock: fn() -> i64,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                cookie_gate,
                navigator,
                login_path,
                clock,
                current: RwLock::new(None),
                listeners: Mutex::new(Registry::default()),
                dispatch: Mutex::new(()),
                ops: tokio::sync::Mutex::new(()),
            }),
        }
    }

    fn rebuild(self, update: impl FnOnce(&mut Parts)) -> Self {
        let inner = &self.inner;
        let mut parts = Parts {
            cookie_gate: Arc::clone(&inner.cookie_gate),
            navigator: Arc::clone(&inner.navigator),
            login_path: inner.login_path.clone(),
            clock: inner.clock,
        };
        update(&mut parts);
        Self::from_parts(
            Arc::clone(&inner.provider),
            parts.cookie_gate,
            parts.navigator,
            parts.login_path,
            parts.clock,
        )
    }

    /// Builder methods start a fresh store; call them before subscribing.
    #[must_use]
    pub fn with_cookie_gate(self, cookie_gate: Arc<dyn CookieGate>) -> Self {
        self.rebuild(|parts| parts.cookie_gate = cookie_gate)
    }

    #[must_use]
    pub fn with_navigator(self, navigator: Arc<dyn Navigator>) -> Self {
        self.rebuild(|parts| parts.navigator = navigator)
    }

    #[must_use]
    pub fn with_login_path(self, login_path: impl Into<String>) -> Self {
        let login_path = login_path.into();
        self.rebuild(|parts| parts.login_path = login_path)
    }

    #[must_use]
    pub fn with_clock(self, clock: fn() -> i64) -> Self {
        self.rebuild(|parts| parts.clock = clock)
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.inner.login_path
    }

    /// Last known session, unless it has expired. Never blocks on I/O.
    #[must_use]
    pub fn get_current(&self) -> Option<Session> {
        let now = (self.inner.clock)();
        self.inner
            .cached()
            .filter(|session| !session.is_expired(now))
    }

    /// Register `listener` and replay the current state to it immediately.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let listener: SessionListener = Arc::new(listener);
        let _dispatch = self
            .inner
            .dispatch
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let id = {
            let mut registry = self.inner.registry();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.push((id, Arc::clone(&listener)));
            id
        };

        let replay = match self.get_current() {
            Some(session) => SessionEvent::signed_in(session),
            None => SessionEvent::signed_out(),
        };
        listener(&replay);

        Subscription {
            id,
            store: Arc::downgrade(&self.inner),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry().entries.len()
    }

    /// Sign in against the backend.
    ///
    /// A session that was already cached is signed out of the backend (best
    /// effort) once the new one is issued.
    ///
    /// # Errors
    /// Returns the provider error; the cached state is left untouched.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let _op = self.inner.ops.lock().await;
        match self.inner.provider.sign_in(credentials).await {
            Ok(session) => {
                if let Some(previous) = self.inner.cached() {
                    if let Err(err) = self.inner.provider.sign_out(&previous).await {
                        warn!("Failed to sign out replaced session: {err}");
                    }
                }
                info!(user_id = %session.user_id, "Session signed in");
                self.inner
                    .commit(Some(session.clone()), &SessionEvent::signed_in(session.clone()));
                Ok(session)
            }
            Err(err) => {
                warn!("Sign in failed: {err}");
                Err(err)
            }
        }
    }

    /// Re-validate the cached session once.
    ///
    /// Any failure signs the store out. Network failures come back as
    /// [`AuthError::Network`] so callers can offer a retry; everything else is
    /// [`AuthError::SessionExpired`].
    ///
    /// # Errors
    /// Returns [`AuthError::SessionExpired`] without emitting when nothing is cached.
    pub async fn refresh(&self) -> Result<Session, AuthError> {
        let _op = self.inner.ops.lock().await;
        let Some(current) = self.inner.cached() else {
            return Err(AuthError::SessionExpired);
        };

        match self.inner.provider.refresh(&current).await {
            Ok(session) => {
                debug!(user_id = %session.user_id, "Session refreshed");
                self.inner.commit(
                    Some(session.clone()),
                    &SessionEvent::token_refreshed(session.clone()),
                );
                Ok(session)
            }
            Err(err) => {
                warn!("Session refresh failed, signing out: {err}");
                self.inner.commit(None, &SessionEvent::signed_out());
                match err {
                    AuthError::Network(_) => Err(err),
                    _ => Err(AuthError::SessionExpired),
                }
            }
        }
    }

    /// Clear the cookie, sign out of the backend and return to the login page.
    ///
    /// Cookie and backend failures are logged and do not stop the local sign out.
    pub async fn logout(&self) {
        let _op = self.inner.ops.lock().await;

        if let Err(err) = self.inner.cookie_gate.clear_cookie().await {
            warn!("Failed to clear admin cookie: {err}");
        }
        if let Some(session) = self.inner.cached() {
            if let Err(err) = self.inner.provider.sign_out(&session).await {
                warn!("Backend sign out failed: {err}");
            }
        }

        self.inner.commit(None, &SessionEvent::signed_out());
        info!("Session signed out");
        self.inner.navigator.navigate(&self.inner.login_path);
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("login_path", &self.inner.login_path)
            .field("signed_in", &self.inner.cached().is_some())
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

struct Parts {
    cookie_gate: Arc<dyn CookieGate>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    clock: fn() -> i64,
}

/// Handle for one registered listener; unsubscribes on drop.
#[derive(Debug)]
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    store: Weak<Inner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.store.upgrade() {
            inner.remove(self.id);
        }
    }
}
