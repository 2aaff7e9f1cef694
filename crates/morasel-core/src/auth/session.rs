//! Session state machine.
//!
//! `SessionManager` owns the in-memory session and keeps three things in
//! agreement: the published `Session`, the persisted credential record, and
//! the `AuthBinding` the API client reads its bearer token from.
//!
//! ```text
//! Restoring --restore--> Authenticated | Unauthenticated
//! Unauthenticated --sign_in--> Authenticated
//! Authenticated --sign_out--> Unauthenticated
//! ```
//!
//! Every mutation holds one async mutex, so overlapping sign-in/sign-out
//! calls apply in order instead of racing on the binding.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{watch, Mutex, OnceCell};
use tracing::{debug, info, warn};

use super::credentials::{CredentialStore, StoreError};
use crate::api::{AuthBinding, AuthProvider};
use crate::models::User;

/// Upper bound on the startup restore before it gives up and logs out.
pub const DEFAULT_RESTORE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to persist session: {0}")]
    Storage(#[from] StoreError),

    #[error("Cannot sign in with an empty token")]
    EmptyToken,
}

/// Authentication state as seen by the UI.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Session {
    /// Startup restore has not finished yet.
    #[default]
    Restoring,
    Unauthenticated,
    Authenticated { token: String, user: User },
}

impl Session {
    pub fn token(&self) -> Option<&str> {
        match self {
            Session::Authenticated { token, .. } => Some(token),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Session::Authenticated { user, .. } => Some(user),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Session::Restoring)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            token: self.token().map(str::to_string),
            user: self.user().cloned(),
            is_loading: self.is_loading(),
            is_authenticated: self.is_authenticated(),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Session::Restoring => write!(f, "Restoring"),
            Session::Unauthenticated => write!(f, "Unauthenticated"),
            Session::Authenticated { user, .. } => f
                .debug_struct("Authenticated")
                .field("token", &"<redacted>")
                .field("user", user)
                .finish(),
        }
    }
}

/// Flat, serializable view of a `Session` for UI consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub user: Option<User>,
    pub is_loading: bool,
    pub is_authenticated: bool,
}

/// Why a restore ended logged out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    /// Neither record was stored.
    NoSession,
    /// Only one of token and user was stored.
    Incomplete,
    /// Reading storage failed.
    StorageFailed(String),
    /// Storage did not answer in time.
    TimedOut,
}

/// Result of the one-time startup restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Authenticated(User),
    Unauthenticated(UnauthenticatedReason),
}

impl RestoreOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, RestoreOutcome::Authenticated(_))
    }
}

pub struct SessionManager {
    store: CredentialStore,
    binding: AuthBinding,
    state: watch::Sender<Session>,
    mutation: Mutex<()>,
    restored: OnceCell<RestoreOutcome>,
    restore_timeout: Duration,
}

impl SessionManager {
    pub fn new(store: CredentialStore, binding: AuthBinding) -> Self {
        let (state, _) = watch::channel(Session::Restoring);
        Self {
            store,
            binding,
            state,
            mutation: Mutex::new(()),
            restored: OnceCell::new(),
            restore_timeout: DEFAULT_RESTORE_TIMEOUT,
        }
    }

    pub fn with_restore_timeout(mut self, timeout: Duration) -> Self {
        self.restore_timeout = timeout;
        self
    }

    /// Current session value.
    pub fn current(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver that sees every published session value.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// The token slot this manager drives.
    pub fn binding(&self) -> &AuthBinding {
        &self.binding
    }

    /// The binding as a provider for an `ApiClient`.
    pub fn auth_provider(&self) -> Arc<dyn AuthProvider> {
        Arc::new(self.binding.clone())
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Reconcile with stored credentials. Runs once; later and concurrent
    /// callers get the same outcome. Never fails: any storage problem ends
    /// in `Unauthenticated`.
    pub async fn restore(&self) -> RestoreOutcome {
        self.restored
            .get_or_init(|| self.run_restore())
            .await
            .clone()
    }

    async fn run_restore(&self) -> RestoreOutcome {
        let _guard = self.mutation.lock().await;
        debug!("Restoring session from storage");

        let fetch = futures::future::join(self.store.get_token(), self.store.get_user());
        let outcome = match tokio::time::timeout(self.restore_timeout, fetch).await {
            Err(_) => {
                warn!(timeout_ms = self.restore_timeout.as_millis() as u64, "Session restore timed out");
                RestoreOutcome::Unauthenticated(UnauthenticatedReason::TimedOut)
            }
            Ok((Err(e), _)) | Ok((_, Err(e))) => {
                warn!(error = %e, "Failed to read stored session");
                RestoreOutcome::Unauthenticated(UnauthenticatedReason::StorageFailed(e.to_string()))
            }
            Ok((Ok(token), Ok(user))) => match (token.filter(|t| !t.is_empty()), user) {
                (Some(token), Some(user)) => {
                    self.binding.bind(token.clone());
                    self.publish(Session::Authenticated { token, user: user.clone() });
                    info!(user_id = %user.id, "Restored stored session");
                    return RestoreOutcome::Authenticated(user);
                }
                (None, None) => RestoreOutcome::Unauthenticated(UnauthenticatedReason::NoSession),
                _ => {
                    warn!("Stored session is incomplete, ignoring it");
                    RestoreOutcome::Unauthenticated(UnauthenticatedReason::Incomplete)
                }
            },
        };

        self.publish(Session::Unauthenticated);
        outcome
    }

    /// Persist, bind, then publish. Nothing is bound or published unless
    /// the credentials were stored.
    pub async fn sign_in(&self, token: impl Into<String>, user: User) -> Result<(), SessionError> {
        let token = token.into();
        if token.is_empty() {
            return Err(SessionError::EmptyToken);
        }

        self.restore().await;
        let _guard = self.mutation.lock().await;

        self.store.save_session(&token, &user).await?;
        self.binding.bind(token.clone());
        info!(user_id = %user.id, "Signed in");
        self.publish(Session::Authenticated { token, user });
        Ok(())
    }

    /// Clear storage, unbind, then publish. Safe when already signed out.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        self.restore().await;
        let _guard = self.mutation.lock().await;

        self.store.clear_session().await?;
        self.binding.clear();
        info!("Signed out");
        self.publish(Session::Unauthenticated);
        Ok(())
    }

    fn publish(&self, session: Session) {
        self.state.send_replace(session);
    }
}
