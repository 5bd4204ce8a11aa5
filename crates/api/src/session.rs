use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::http::ApiClient;
use crate::models::{AuthTokens, Student};
use crate::store::SessionStore;

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    current_user: Option<Student>,
    authenticated: bool,
    loading: bool,
}

/// Owner of the authentication lifecycle: startup rehydration, login,
/// logout, and the read-only snapshot the rest of the application consumes.
///
/// Passed around explicitly as an `Arc`; there is no ambient singleton.
/// Snapshot writes happen only on login/logout and the single startup probe,
/// so the lock is effectively uncontended.
pub struct SessionManager {
    client: Arc<ApiClient>,
    store: Arc<SessionStore>,
    state: RwLock<SessionState>,
}

impl SessionManager {
    pub fn new(client: Arc<ApiClient>, store: Arc<SessionStore>) -> Self {
        Self {
            client,
            store,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Rehydrate the session on startup.
    ///
    /// With no persisted token this marks the session unauthenticated and
    /// returns. With one, it makes a single best-effort probe for the
    /// current user; a failed probe discards the token. Never retried.
    pub async fn initialize(&self) {
        if self.store.access_token().is_none() {
            *self.state.write() = SessionState::default();
            return;
        }

        self.state.write().loading = true;

        match self.client.students().current().await {
            Ok(user) => {
                tracing::debug!(username = %user.username, "session rehydrated");
                *self.state.write() = SessionState {
                    current_user: Some(user),
                    authenticated: true,
                    loading: false,
                };
            }
            Err(err) => {
                tracing::warn!(%err, "session probe failed, discarding stored token");
                self.store.clear();
                *self.state.write() = SessionState::default();
            }
        }
    }

    /// Exchange credentials for a token pair, persist it, and fetch the
    /// current user.
    ///
    /// Either every step succeeds or stored state is left untouched: the
    /// pair is persisted only after a successful exchange, and a failed
    /// user fetch right after discards the just-persisted pair again.
    pub async fn login(&self, username: &str, password: &str) -> Result<Student, ApiError> {
        let tokens: AuthTokens = self
            .client
            .post_public("/token/", &TokenRequest { username, password })
            .await?;
        self.store.set_tokens(tokens.access, tokens.refresh);

        match self.client.students().current().await {
            Ok(user) => {
                tracing::info!(username = %user.username, "login succeeded");
                *self.state.write() = SessionState {
                    current_user: Some(user.clone()),
                    authenticated: true,
                    loading: false,
                };
                Ok(user)
            }
            Err(err) => {
                self.store.clear();
                *self.state.write() = SessionState::default();
                Err(err)
            }
        }
    }

    /// Clear the persisted tokens and the in-memory user. Local only: no
    /// server-side revoke call is made, so this always succeeds.
    pub fn logout(&self) {
        self.store.clear();
        *self.state.write() = SessionState::default();
        tracing::info!("logged out");
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().authenticated
    }

    pub fn current_user(&self) -> Option<Student> {
        self.state.read().current_user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }
}
