//! Authorization binding between the session and the transport.
//!
//! The transport never owns a token. It asks an `AuthProvider` for the
//! current bearer token each time it builds a request, so whoever owns the
//! provider decides what every subsequent request carries.

use std::sync::{Arc, RwLock};

/// Source of the bearer token attached to outgoing requests.
pub trait AuthProvider: Send + Sync {
    /// Current bearer token, if any.
    fn bearer_token(&self) -> Option<String>;
}

/// Provider for unauthenticated clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl AuthProvider for NoAuth {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

/// Shared, mutable token slot.
///
/// Clones share the same slot. The session manager is the only writer; the
/// API client reads it on every request.
#[derive(Debug, Clone, Default)]
pub struct AuthBinding {
    token: Arc<RwLock<Option<String>>>,
}

impl AuthBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, token: impl Into<String>) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(token.into());
    }

    pub fn clear(&self) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    pub fn is_bound(&self) -> bool {
        self.token
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or_else(|e| e.into_inner().is_some())
    }
}

impl AuthProvider for AuthBinding {
    fn bearer_token(&self) -> Option<String> {
        let slot = self.token.read().unwrap_or_else(|e| e.into_inner());
        slot.clone()
    }
}
