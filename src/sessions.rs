//! Per-request session access and the per-token lock registry that serializes requests
//! sharing one session.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tower_sessions::{
    cookie::SameSite, session::Error as SessionError, Expiry, Session, SessionManagerLayer,
    SessionStore,
};

use crate::config::AppConfig;

pub const SESSION_USER_ID_KEY: &str = "auth.user_id";
pub const SESSION_FLASH_KEY: &str = "flash";
pub const SESSION_REDIRECT_KEY: &str = "auth.redirect_after_login";
pub const SESSION_CSRF_KEY: &str = "security.csrf";

/// Session cookie settings: HTTP-only, `SameSite=Lax`, root path, expiring after the configured
/// period of inactivity.
pub fn session_layer<Store: SessionStore>(
    store: Store,
    config: &AppConfig,
) -> SessionManagerLayer<Store> {
    SessionManagerLayer::new(store)
        .with_secure(config.security.cookie_secure)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_path("/")
        .with_name(config.session.cookie_name.clone())
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(
            config.session.lifetime_hours,
        )))
}

/// Key/value view of the current request's session.
#[derive(Clone, Debug)]
pub struct AppSession(Session);

impl AppSession {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    pub async fn put<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: T,
    ) -> Result<(), SessionError> {
        self.0.insert(key, value).await
    }

    /// Stored value for `key`, or `T::default()` when absent.
    pub async fn get<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, SessionError> {
        Ok(self.0.get::<T>(key).await?.unwrap_or_default())
    }

    /// Remove and return a string value, or the empty string when absent.
    pub async fn pop_string(&self, key: &str) -> Result<String, SessionError> {
        Ok(self.0.remove::<String>(key).await?.unwrap_or_default())
    }

    pub async fn exists(&self, key: &str) -> Result<bool, SessionError> {
        Ok(self.0.get_value(key).await?.is_some())
    }

    pub async fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.0.remove_value(key).await?;
        Ok(())
    }

    /// Issue a new session id, keeping the stored data.
    pub async fn cycle_id(&self) -> Result<(), SessionError> {
        self.0.cycle_id().await
    }

    pub async fn authenticated_user_id(&self) -> Result<Option<i64>, SessionError> {
        if !self.exists(SESSION_USER_ID_KEY).await? {
            return Ok(None);
        }
        self.get::<i64>(SESSION_USER_ID_KEY).await.map(Some)
    }

    pub async fn store_user_id(&self, user_id: i64) -> Result<(), SessionError> {
        self.put(SESSION_USER_ID_KEY, user_id).await
    }

    pub async fn clear_user(&self) -> Result<(), SessionError> {
        self.remove(SESSION_USER_ID_KEY).await
    }

    pub async fn put_flash(&self, message: &str) -> Result<(), SessionError> {
        self.put(SESSION_FLASH_KEY, message).await
    }

    pub async fn pop_flash(&self) -> Result<Option<String>, SessionError> {
        let flash = self.pop_string(SESSION_FLASH_KEY).await?;
        Ok((!flash.is_empty()).then_some(flash))
    }

    pub async fn remember_redirect(&self, path: &str) -> Result<(), SessionError> {
        self.put(SESSION_REDIRECT_KEY, path).await
    }

    pub async fn take_redirect(&self) -> Result<Option<String>, SessionError> {
        let path = self.pop_string(SESSION_REDIRECT_KEY).await?;
        Ok((!path.is_empty()).then_some(path))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AppSession
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Session::from_request_parts(parts, state).await.map(Self)
    }
}

/// Async locks keyed by session cookie token. Holding a token's guard for the lifetime of a
/// request gives every request on that session an exclusive load-modify-save window.
#[derive(Default)]
pub struct SessionLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(self: &Arc<Self>, token: &str) -> SessionLockGuard {
        let lock = self
            .locks
            .entry(token.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        SessionLockGuard {
            guard: Some(lock.lock_owned().await),
            token: token.to_owned(),
            locks: Arc::clone(self),
        }
    }

    /// Drop the entry for `token` when no request holds or waits on it.
    fn release(&self, token: &str) {
        self.locks
            .remove_if(token, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of tokens currently tracked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive hold on one session token. Dropping it, on completion or when the request future
/// is cancelled or unwinds, frees the lock and prunes the registry entry.
pub struct SessionLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    token: String,
    locks: Arc<SessionLocks>,
}

impl Drop for SessionLockGuard {
    fn drop(&mut self) {
        // The owned guard keeps a reference to the mutex; it must go before the count check.
        self.guard.take();
        self.locks.release(&self.token);
    }
}
