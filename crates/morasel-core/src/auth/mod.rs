//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `SessionManager`: the session state machine and its published `Session`
//! - `CredentialStore`: durable token/user storage over a pluggable backend
//! - `validation`: client-side rules for the login, register and resource forms

pub mod credentials;
pub mod session;
pub mod validation;

pub use credentials::{
    CredentialBackend, CredentialStore, FileBackend, KeyringBackend, MemoryBackend, StoreError,
};
pub use session::{
    RestoreOutcome, Session, SessionError, SessionManager, SessionSnapshot, UnauthenticatedReason,
};
pub use validation::{
    LoginForm, NewCampaignForm, NewChannelForm, NewContactForm, RegisterForm, ValidationErrors,
};
