//! The process-wide authentication session.
//!
//! One [`SessionStore`] is created at startup and shared (behind an `Arc`)
//! with the navigation guard and the request pipeline. State lives behind a
//! mutex that is never held across an `.await`, so the store can be used
//! from any task.
//!
//! Lifecycle: `Anonymous -> Authenticating -> Authenticated -> Anonymous`.
//! The persisted record is a shadow of the in-memory session: written on
//! login, read once by [`SessionStore::rehydrate`], deleted on logout.
//!
//! Concurrent `login` calls are not fenced: both complete and whichever
//! resolves last owns the session. Callers are expected to serialize
//! submissions.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use biblio_types::auth::{USER_TYPE_ADMIN, USER_TYPE_CLIENT};
use biblio_types::{Credentials, LoginResponse, SessionUser};
use serde_json::{Value, json};

use super::storage::{
    KEY_AUTH_TOKEN, KEY_TOKEN_EXPIRES_IN, KEY_TOKEN_TYPE, KEY_USER_DATA, KEY_USER_ROLES,
    MemorySessionStorage, SESSION_KEYS, SessionStorage,
};
use super::token;
use crate::api::ApiResult;

/// Message stored in `error` when a login fails without a better one.
const LOGIN_FAILED: &str = "Login failed";

/// Exchanges credentials for a signed token.
pub trait Authenticator {
    /// Sends `credentials` to the server.
    ///
    /// # Errors
    /// Returns the normalized failure if the server rejects the credentials
    /// or cannot be reached.
    fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = ApiResult<LoginResponse>> + Send;
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Anonymous,
    Authenticating,
    Authenticated,
}

/// Authentication state.
///
/// `is_authenticated` implies `token` is non-empty and was unexpired when
/// last checked. `roles` is only ever derived from the token's claims.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub is_authenticated: bool,
    /// Raw encoded token; empty when signed out.
    pub token: String,
    pub user: Option<SessionUser>,
    pub roles: BTreeSet<String>,
    /// A login request is in flight.
    pub is_loading: bool,
    /// Last login failure, empty when none.
    pub error: String,
}

impl Session {
    pub fn phase(&self) -> SessionPhase {
        if self.is_loading {
            SessionPhase::Authenticating
        } else if self.is_authenticated {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Anonymous
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|role| self.has_role(role.as_ref()))
    }

    /// The user's type code, or an empty string when signed out.
    pub fn user_type(&self) -> &str {
        self.user.as_ref().map_or("", |u| u.user_type.as_str())
    }

    pub fn has_user_type(&self, user_type: &str) -> bool {
        self.user.as_ref().is_some_and(|u| u.user_type == user_type)
    }

    pub fn is_admin(&self) -> bool {
        self.has_user_type(USER_TYPE_ADMIN)
    }

    pub fn is_client(&self) -> bool {
        self.has_user_type(USER_TYPE_CLIENT)
    }

    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }

    fn clear(&mut self) {
        self.is_authenticated = false;
        self.user = None;
        self.token.clear();
        self.roles.clear();
        self.error.clear();
    }
}

/// Owner of the session state and its persisted record.
pub struct SessionStore {
    state: Mutex<Session>,
    storage: Arc<dyn SessionStorage>,
    initialized: AtomicBool,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("phase", &self.phase())
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            state: Mutex::new(Session::default()),
            storage,
            initialized: AtomicBool::new(false),
        }
    }

    /// A store whose record lives only in memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStorage::new()))
    }

    fn read<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn write<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    // ------------------------------------------------------------------
    // Read-only projections
    // ------------------------------------------------------------------

    /// A copy of the current state.
    pub fn snapshot(&self) -> Session {
        self.read(Clone::clone)
    }

    pub fn phase(&self) -> SessionPhase {
        self.read(Session::phase)
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|s| s.is_authenticated)
    }

    /// Signed in with a token in hand.
    pub fn is_logged_in(&self) -> bool {
        self.read(|s| s.is_authenticated && !s.token.is_empty())
    }

    /// The token to attach to outgoing requests, if any.
    pub fn bearer_token(&self) -> Option<String> {
        self.read(|s| (!s.token.is_empty()).then(|| s.token.clone()))
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.read(|s| s.user.clone())
    }

    pub fn user_roles(&self) -> BTreeSet<String> {
        self.read(|s| s.roles.clone())
    }

    pub fn user_type(&self) -> String {
        self.read(|s| s.user_type().to_string())
    }

    pub fn error(&self) -> String {
        self.read(|s| s.error.clone())
    }

    pub fn has_error(&self) -> bool {
        self.read(Session::has_error)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.read(|s| s.has_role(role))
    }

    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        self.read(|s| s.has_any_role(roles))
    }

    pub fn has_user_type(&self, user_type: &str) -> bool {
        self.read(|s| s.has_user_type(user_type))
    }

    pub fn is_admin(&self) -> bool {
        self.read(Session::is_admin)
    }

    pub fn is_client(&self) -> bool {
        self.read(Session::is_client)
    }

    /// Whether [`rehydrate`](Self::rehydrate) has run (or a login has
    /// committed) in this process.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn clear_error(&self) {
        self.write(|s| s.error.clear());
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Authenticates with `credentials` and commits the session.
    ///
    /// Never fails past this boundary: returns `false` and leaves the
    /// message in [`error`](Self::error) instead.
    pub async fn login<A: Authenticator>(&self, auth: &A, credentials: &Credentials) -> bool {
        self.write(|s| {
            s.is_loading = true;
            s.error.clear();
        });

        let outcome = match auth.authenticate(credentials).await {
            Ok(response) => self.commit_login(response),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(()) => true,
            Err(message) => {
                let message = if message.trim().is_empty() {
                    LOGIN_FAILED.to_string()
                } else {
                    message
                };
                tracing::warn!(username = %credentials.username, error = %message, "login failed");
                self.write(|s| {
                    s.error = message;
                    s.is_loading = false;
                });
                false
            }
        }
    }

    fn commit_login(&self, response: LoginResponse) -> std::result::Result<(), String> {
        if !token::is_valid(&response.token) {
            return Err("Server returned an invalid or expired token".to_string());
        }

        let roles = token::extract_roles(&response.token);
        let username = token::extract_user(&response.token)
            .map(|u| u.sub)
            .unwrap_or_default();
        let user = SessionUser {
            email: response.email.clone(),
            user_type: response.user_type.clone(),
            roles: roles.iter().cloned().collect(),
            username,
        };

        self.write(|s| {
            s.token.clone_from(&response.token);
            s.is_authenticated = true;
            s.roles.clone_from(&roles);
            s.user = Some(user.clone());
            s.is_loading = false;
        });
        self.initialized.store(true, Ordering::SeqCst);

        if let Err(e) = self.persist(&response.token, &user, &roles, Some(&response)) {
            tracing::warn!(error = %e, "failed to persist session");
        }

        tracing::info!(
            username = %user.username,
            user_type = %user.user_type,
            roles = ?roles,
            "login succeeded"
        );
        Ok(())
    }

    fn persist(
        &self,
        token: &str,
        user: &SessionUser,
        roles: &BTreeSet<String>,
        login: Option<&LoginResponse>,
    ) -> Result<()> {
        let user_data = serde_json::to_value(user).context("serialize session user")?;
        let mut entries: Vec<(&str, Value)> = vec![
            (KEY_AUTH_TOKEN, json!(token)),
            (KEY_USER_DATA, user_data),
            (KEY_USER_ROLES, json!(roles)),
        ];
        if let Some(login) = login {
            entries.push((KEY_TOKEN_EXPIRES_IN, json!(login.expires_in)));
            entries.push((KEY_TOKEN_TYPE, json!(login.token_type)));
        }
        self.storage.set_many(entries)
    }

    /// Clears the session and deletes the persisted record.
    ///
    /// Idempotent; safe to call while signed out.
    pub fn logout(&self) {
        self.write(Session::clear);
        if let Err(e) = self.storage.remove_many(&SESSION_KEYS) {
            tracing::warn!(error = %e, "failed to delete persisted session");
        }
        tracing::info!("logged out");
    }

    /// Ends the session after the server rejected its token.
    ///
    /// Returns `true` only for the call that actually tore a session down, so
    /// a burst of rejected requests produces one logout.
    pub fn expire(&self) -> bool {
        let had_session = self.write(|s| {
            let had = s.is_authenticated || !s.token.is_empty();
            if had {
                s.clear();
            }
            had
        });
        if had_session {
            if let Err(e) = self.storage.remove_many(&SESSION_KEYS) {
                tracing::warn!(error = %e, "failed to delete persisted session");
            }
            tracing::warn!("session rejected by server; logged out");
        }
        had_session
    }

    /// Restores the session from the persisted record.
    ///
    /// An expired or malformed token is purged rather than resurrected.
    pub fn rehydrate(&self) {
        self.initialized.store(true, Ordering::SeqCst);

        let token = match self.storage.get(KEY_AUTH_TOKEN) {
            Ok(Some(Value::String(token))) if !token.is_empty() => token,
            Ok(_) => return,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted session");
                return;
            }
        };
        let user = match self.storage.get(KEY_USER_DATA) {
            Ok(Some(value)) => serde_json::from_value::<SessionUser>(value).ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted session");
                return;
            }
        };

        let Some(user) = user.filter(|_| token::is_valid(&token)) else {
            tracing::info!("persisted session is expired or unreadable; discarding");
            self.logout();
            return;
        };

        let roles = token::extract_roles(&token);
        let user = SessionUser {
            roles: roles.iter().cloned().collect(),
            ..user
        };
        self.write(|s| {
            s.token.clone_from(&token);
            s.user = Some(user.clone());
            s.roles.clone_from(&roles);
            s.is_authenticated = true;
        });
        if let Err(e) = self.persist(&token, &user, &roles, None) {
            tracing::warn!(error = %e, "failed to refresh persisted session");
        }
        tracing::debug!(username = %user.username, "session restored");
    }

    /// Rehydrates once per process.
    pub fn ensure_rehydrated(&self) {
        if !self.is_initialized() {
            self.rehydrate();
        }
    }
}
