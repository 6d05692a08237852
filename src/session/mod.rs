//! Client-side session lifecycle for the admin dashboard.
//!
//! [`SessionStore`] owns the signed-in backend session and publishes
//! [`SessionEvent`]s; [`SessionHook`] adapts it for view code. The backend is
//! reached through the [`AuthProvider`] trait, with [`SupabaseProvider`] as the
//! production implementation.

mod event;
mod hook;
mod model;
mod provider;
mod store;
mod supabase;

pub use event::{SessionEvent, SessionEventKind};
pub use hook::{SessionHook, SessionView};
pub use model::{Credentials, Session, SessionTokens};
pub use provider::AuthProvider;
pub use store::{
    CookieGate, Navigator, NoopCookieGate, NoopNavigator, SessionListener, SessionStore,
    Subscription,
};
pub use supabase::{SupabaseConfig, SupabaseProvider};

#[cfg(test)]
pub(crate) mod testing;
