//! View adapter over [`SessionStore`].
//!
//! A hook owns at most one subscription at a time. Each mount gets a new
//! generation number and events tagged with an older generation are dropped,
//! so results landing after `unmount` never reach the view.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::{
    event::SessionEvent,
    model::Session,
    store::{SessionStore, Subscription},
};

/// What a view renders from the session.
#[derive(Clone, Debug)]
pub struct SessionView {
    pub user: Option<Session>,
    /// True until the first replayed event of the current mount arrives.
    pub loading: bool,
    pub is_authenticated: bool,
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
            is_authenticated: false,
        }
    }
}

type ChangeCallback = Arc<dyn Fn(&SessionView) + Send + Sync>;

#[derive(Default)]
struct HookState {
    view: Mutex<SessionView>,
    callbacks: Mutex<Vec<ChangeCallback>>,
    generation: AtomicU64,
}

impl HookState {
    fn view(&self) -> MutexGuard<'_, SessionView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, generation: u64, event: &SessionEvent) {
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        let next = SessionView {
            is_authenticated: event.session.is_some(),
            user: event.session.clone(),
            loading: false,
        };
        *self.view() = next.clone();

        let callbacks = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for callback in callbacks {
            callback(&next);
        }
    }
}

pub struct SessionHook {
    store: SessionStore,
    state: Arc<HookState>,
    subscription: Mutex<Option<Subscription>>,
}

impl SessionHook {
    #[must_use]
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            state: Arc::new(HookState::default()),
            subscription: Mutex::new(None),
        }
    }

    /// Open the subscription. Mounting twice keeps the existing one.
    ///
    /// No hook lock is held during the replay, so `on_change` callbacks may
    /// call `is_mounted` (it reads `false` until `mount` returns) or `unmount`.
    pub fn mount(&self) {
        if self.is_mounted() {
            return;
        }

        let generation = self.state.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.view().loading = true;

        let state: Weak<HookState> = Arc::downgrade(&self.state);
        let subscription = self.store.subscribe(move |event| {
            if let Some(state) = state.upgrade() {
                state.apply(generation, event);
            }
        });

        let mut slot = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // A later mount or an unmount during the replay supersedes this one.
        if self.state.generation.load(Ordering::SeqCst) == generation {
            *slot = Some(subscription);
        }
    }

    /// Tear the subscription down; later events and results are ignored.
    pub fn unmount(&self) {
        self.state.generation.fetch_add(1, Ordering::SeqCst);
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(subscription);
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        self.state.view().clone()
    }

    /// Run `callback` with the new view after every accepted event.
    pub fn on_change<F>(&self, callback: F)
    where
        F: Fn(&SessionView) + Send + Sync + 'static,
    {
        self.state
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(callback));
    }

    /// Sign out through the store; the view follows the emitted event.
    pub async fn logout(&self) {
        self.store.logout().await;
    }
}

impl Drop for SessionHook {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl std::fmt::Debug for SessionHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHook")
            .field("view", &self.view())
            .field("mounted", &self.is_mounted())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::provider::AuthProvider;
    use crate::session::testing::{FakeProvider, RecordingNavigator, credentials};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn store(provider: Arc<FakeProvider>) -> SessionStore {
        let provider: Arc<dyn AuthProvider> = provider;
        SessionStore::new(provider)
    }

    #[test]
    fn fresh_hook_is_loading() {
        let hook = SessionHook::new(store(Arc::new(FakeProvider::default())));
        let view = hook.view();
        assert!(view.loading);
        assert!(!view.is_authenticated);
        assert!(view.user.is_none());
    }

    #[test]
    fn mount_resolves_loading_from_replay() {
        let store = store(Arc::new(FakeProvider::default()));
        let hook = SessionHook::new(store.clone());
        hook.mount();
        assert!(!hook.view().loading);
        assert!(!hook.view().is_authenticated);
        assert_eq!(store.subscriber_count(), 1);
    }

    #[test]
    fn mounting_twice_keeps_one_subscription() {
        let store = store(Arc::new(FakeProvider::default()));
        let hook = SessionHook::new(store.clone());
        hook.mount();
        hook.mount();
        assert_eq!(store.subscriber_count(), 1);
        hook.unmount();
        assert_eq!(store.subscriber_count(), 0);
        assert!(!hook.is_mounted());
    }

    #[tokio::test]
    async fn view_follows_login_and_logout() -> anyhow::Result<()> {
        let navigator = Arc::new(RecordingNavigator::default());
        let store = store(Arc::new(FakeProvider::default())).with_navigator(navigator.clone());
        let hook = SessionHook::new(store.clone());
        let changes = Arc::new(AtomicUsize::new(0));
        {
            let changes = Arc::clone(&changes);
            hook.on_change(move |_view| {
                changes.fetch_add(1, Ordering::SeqCst);
            });
        }
        hook.mount();

        let session = store.login(&credentials()).await?;
        let view = hook.view();
        assert!(view.is_authenticated);
        assert!(!view.loading);
        assert_eq!(view.user.map(|user| user.user_id), Some(session.user_id));

        hook.logout().await;
        let view = hook.view();
        assert!(!view.is_authenticated);
        assert!(!view.loading);
        assert_eq!(navigator.visits(), vec!["/login".to_string()]);

        // replay, SIGNED_IN, SIGNED_OUT
        assert_eq!(changes.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn results_after_unmount_are_ignored() -> anyhow::Result<()> {
        let gate = Arc::new(Notify::new());
        let store = store(Arc::new(FakeProvider::gated(Arc::clone(&gate))));
        let hook = SessionHook::new(store.clone());
        hook.mount();

        let pending = {
            let store = store.clone();
            tokio::spawn(async move { store.login(&credentials()).await })
        };
        tokio::task::yield_now().await;
        hook.unmount();
        gate.notify_one();
        pending.await??;

        assert!(store.get_current().is_some());
        let view = hook.view();
        assert!(!view.is_authenticated);
        assert!(view.user.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn remount_sees_current_state() -> anyhow::Result<()> {
        let store = store(Arc::new(FakeProvider::default()));
        let hook = SessionHook::new(store.clone());
        hook.mount();
        hook.unmount();

        store.login(&credentials()).await?;
        assert!(!hook.view().is_authenticated);

        hook.mount();
        assert!(hook.view().is_authenticated);
        assert!(!hook.view().loading);
        Ok(())
    }

    #[test]
    fn callbacks_may_query_and_unmount_during_replay() {
        let store = store(Arc::new(FakeProvider::default()));
        let hook = Arc::new(SessionHook::new(store.clone()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let weak = Arc::downgrade(&hook);
            let seen = Arc::clone(&seen);
            hook.on_change(move |_view| {
                if let Some(hook) = weak.upgrade() {
                    seen.lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(hook.is_mounted());
                    hook.unmount();
                }
            });
        }

        hook.mount();
        assert_eq!(
            seen.lock().unwrap_or_else(PoisonError::into_inner).clone(),
            vec![false]
        );
        assert!(!hook.is_mounted());
        assert_eq!(store.subscriber_count(), 0);
        assert!(!hook.view().loading);
    }

    #[test]
    fn dropping_the_hook_unsubscribes() {
        let store = store(Arc::new(FakeProvider::default()));
        {
            let hook = SessionHook::new(store.clone());
            hook.mount();
            assert_eq!(store.subscriber_count(), 1);
        }
        assert_eq!(store.subscriber_count(), 0);
    }
}
