//! Auth-session state for the dashboard user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Route guards and user-aware pages read [`AuthSession::snapshot`] to decide
//! between a loading state, the login redirect, and the dashboard. The
//! session owns the client-held token, the cached current user, and the
//! login/logout flows.
//!
//! CONCURRENCY
//! ===========
//! Sessions are cheap clones over shared state. The inner mutex is never held
//! across an await. Every commit from a network call first checks that the
//! session epoch has not moved and the session is not disposed, so a fetch
//! that lands after logout cannot resurrect the user.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde_json::json;

use super::user_cache::{DEFAULT_STALE_AFTER, Lookup, USER_QUERY_TAG, UserCache, UserKey};
use crate::net::api::{ApiClient, ApiRequest};
use crate::net::types::{AuthUser, Credentials, login_token};
use crate::util::storage::TokenStore;

pub const CHECK_AUTH_ENDPOINT: &str = "admin/check-auth";
pub const LOGIN_ENDPOINT: &str = "admin/login";
pub const LOGOUT_ENDPOINT: &str = "admin/logout";

/// Unauthenticated entry point.
pub const UNAUTH_ROUTE: &str = "/auth";

/// Where the session credential lives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CredentialMode {
    /// Token kept in the [`TokenStore`] and sent as a bearer header, alongside
    /// the proxy's cookie.
    #[default]
    ClientToken,
    /// Only the proxy's httpOnly cookie; the client never holds the token.
    CookieSession,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthPhase {
    #[default]
    Uninitialized,
    Unauthenticated,
    Authenticated,
}

#[derive(Clone, Debug)]
pub struct AuthOptions {
    pub mode: CredentialMode,
    /// Freshness window for the cached user.
    pub stale_after: Duration,
    pub unauth_route: String,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            mode: CredentialMode::default(),
            stale_after: DEFAULT_STALE_AFTER,
            unauth_route: UNAUTH_ROUTE.to_owned(),
        }
    }
}

/// Route changes requested by the session (logout redirect).
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn navigate(&self, route: &str) {
        self(route);
    }
}

/// Point-in-time view for rendering decisions.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthSnapshot {
    pub phase: AuthPhase,
    pub user: Option<AuthUser>,
    pub token: Option<String>,
    /// True before `init` settles and while a user fetch is in flight.
    pub loading: bool,
}

impl AuthSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.phase == AuthPhase::Authenticated && self.user.is_some()
    }

    /// Guard rule: redirect once loading is done and nobody is signed in.
    pub fn should_redirect_unauth(&self) -> bool {
        !self.loading && self.user.is_none()
    }
}

#[derive(Debug)]
struct Inner {
    phase: AuthPhase,
    token: Option<String>,
    cache: UserCache,
    epoch: u64,
    in_flight: usize,
    disposed: bool,
}

impl Inner {
    fn key(&self) -> UserKey {
        UserKey::user(self.token.as_deref())
    }

    fn cached_user(&self, now: Instant) -> Option<AuthUser> {
        match self.cache.lookup(&self.key(), now) {
            Lookup::Fresh(user) | Lookup::Stale(user) => user,
            Lookup::Missing => None,
        }
    }
}

/// Counts one user fetch in `Inner::in_flight` until it settles or its
/// future is dropped.
struct InFlight {
    inner: Arc<Mutex<Inner>>,
    armed: bool,
}

impl InFlight {
    /// Release the count under a lock the caller already holds.
    fn settle(mut self, inner: &mut Inner) {
        inner.in_flight = inner.in_flight.saturating_sub(1);
        self.armed = false;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.in_flight = inner.in_flight.saturating_sub(1);
        // A cancelled first fetch resolved nothing; stop reporting loading.
        if inner.phase == AuthPhase::Uninitialized && !inner.disposed {
            inner.phase = AuthPhase::Unauthenticated;
        }
        tracing::debug!("user fetch cancelled before it settled");
    }
}

/// The dashboard's auth session.
#[derive(Clone)]
pub struct AuthSession {
    api: ApiClient,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    options: Arc<AuthOptions>,
    inner: Arc<Mutex<Inner>>,
}

impl AuthSession {
    pub fn new(
        api: ApiClient,
        store: impl TokenStore + 'static,
        navigator: impl Navigator + 'static,
        options: AuthOptions,
    ) -> Self {
        let inner = Inner {
            phase: AuthPhase::Uninitialized,
            token: None,
            cache: UserCache::new(options.stale_after),
            epoch: 0,
            in_flight: 0,
            disposed: false,
        };
        Self {
            api,
            store: Arc::new(store),
            navigator: Arc::new(navigator),
            options: Arc::new(options),
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn mode(&self) -> CredentialMode {
        self.options.mode
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        let inner = self.lock();
        AuthSnapshot {
            phase: inner.phase,
            user: inner.cached_user(Instant::now()),
            token: inner.token.clone(),
            loading: inner.phase == AuthPhase::Uninitialized || inner.in_flight > 0,
        }
    }

    pub fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    /// Restore the session from the token store and settle the phase.
    pub async fn init(&self) -> AuthSnapshot {
        let stored = match self.options.mode {
            CredentialMode::ClientToken => self.store.load().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "could not read stored session token");
                None
            }),
            CredentialMode::CookieSession => None,
        };

        let fetch = {
            let mut inner = self.lock();
            if inner.disposed {
                false
            } else {
                inner.token = stored;
                let fetch = self.options.mode == CredentialMode::CookieSession || inner.token.is_some();
                if !fetch {
                    inner.phase = AuthPhase::Unauthenticated;
                }
                fetch
            }
        };

        if fetch {
            self.user().await;
        }
        let snapshot = self.snapshot();
        tracing::debug!(phase = ?snapshot.phase, "auth session initialised");
        snapshot
    }

    /// Current user, served from cache while fresh.
    pub async fn user(&self) -> Option<AuthUser> {
        let (key, epoch, in_flight) = {
            let mut inner = self.lock();
            if inner.disposed {
                return None;
            }
            let key = inner.key();
            if let Lookup::Fresh(user) = inner.cache.lookup(&key, Instant::now()) {
                return user;
            }
            if self.options.mode == CredentialMode::ClientToken && key.token.is_none() {
                inner.phase = AuthPhase::Unauthenticated;
                return None;
            }
            inner.in_flight += 1;
            (key, inner.epoch, InFlight { inner: Arc::clone(&self.inner), armed: true })
        };

        let user = self.fetch_user(key.token.as_deref()).await;

        let mut inner = self.lock();
        in_flight.settle(&mut inner);
        if inner.disposed || inner.epoch != epoch {
            tracing::debug!("discarding user fetch from a superseded session");
            return if inner.disposed { None } else { inner.cached_user(Instant::now()) };
        }
        inner.cache.put(key, user.clone(), Instant::now());
        inner.phase = if user.is_some() { AuthPhase::Authenticated } else { AuthPhase::Unauthenticated };
        user
    }

    async fn fetch_user(&self, token: Option<&str>) -> Option<AuthUser> {
        let mut req = ApiRequest::get(CHECK_AUTH_ENDPOINT);
        if let Some(token) = token {
            req = req.bearer(token);
        }
        match self.api.send(req).await {
            Ok(body) => {
                let user = AuthUser::from_payload(&body);
                if user.is_none() {
                    tracing::debug!("check-auth response carried no user");
                }
                user
            }
            Err(e) => {
                tracing::debug!(error = %e, "user fetch failed");
                None
            }
        }
    }

    /// Sign in. Returns whether the API accepted the credentials and issued
    /// a token; never errors.
    pub async fn login(&self, credentials: &Credentials) -> bool {
        if self.is_disposed() {
            return false;
        }
        let body = match serde_json::to_value(credentials) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "could not encode credentials");
                return false;
            }
        };

        let resp = match self.api.send(ApiRequest::post(LOGIN_ENDPOINT).json(body)).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(status = e.status(), error = %e, "login rejected");
                return false;
            }
        };
        let Some(token) = login_token(&resp) else {
            tracing::warn!("login response carried no token");
            return false;
        };

        let client_token = self.options.mode == CredentialMode::ClientToken;
        if client_token {
            if let Err(e) = self.store.save(&token) {
                tracing::warn!(error = %e, "could not persist session token");
            }
        }

        {
            let mut inner = self.lock();
            if inner.disposed {
                return false;
            }
            inner.epoch += 1;
            inner.token = client_token.then_some(token);
            inner.cache.invalidate(USER_QUERY_TAG);
        }
        tracing::info!("login succeeded");

        self.user().await;
        true
    }

    /// Sign out and navigate to the unauthenticated route.
    ///
    /// Local state is cleared before the server is told, so a failing or
    /// slow logout call cannot leave the client half signed in.
    pub async fn logout(&self) {
        let token = {
            let mut inner = self.lock();
            inner.epoch += 1;
            inner.phase = AuthPhase::Unauthenticated;
            inner.cache.clear();
            inner.token.take()
        };
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "could not clear stored session token");
        }

        let mut req = ApiRequest::post(LOGOUT_ENDPOINT).json(json!({}));
        if let Some(token) = &token {
            req = req.bearer(token);
        }
        if let Err(e) = self.api.send(req).await {
            tracing::debug!(error = %e, "logout call failed; local session already cleared");
        }
        self.api.forget_session_cookie();

        tracing::info!("logged out");
        self.navigator.navigate(&self.options.unauth_route);
    }

    /// Replace the cached user (e.g. after a profile edit). No network.
    pub fn update_user(&self, user: AuthUser) {
        let mut inner = self.lock();
        if inner.disposed {
            return;
        }
        if self.options.mode == CredentialMode::ClientToken && inner.token.is_none() {
            tracing::debug!("ignoring user update without a session token");
            return;
        }
        // A fetch already in flight would overwrite the edit.
        inner.epoch += 1;
        let key = inner.key();
        inner.cache.put(key, Some(user), Instant::now());
        inner.phase = AuthPhase::Authenticated;
    }

    /// End the session's lifecycle. Later resolutions are discarded.
    pub fn dispose(&self) {
        let mut inner = self.lock();
        inner.disposed = true;
        inner.epoch += 1;
    }
}
