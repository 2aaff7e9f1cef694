//! Morasel Core Library
//!
//! Client core for the Morasel WhatsApp campaign platform: the persisted
//! session, the REST transport and the per-resource services. Front ends
//! (the `morasel` CLI, a mobile shell) sit on top of this crate.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod models;
pub mod services;

pub use api::{ApiClient, ApiError, AuthBinding, AuthProvider};
pub use app::{App, AppError};
pub use auth::{
    CredentialStore, LoginForm, RegisterForm, RestoreOutcome, Session, SessionManager,
    UnauthenticatedReason, ValidationErrors,
};
pub use config::{Config, CredentialBackendKind};
pub use services::{
    AuthService, CampaignService, ChannelService, ConnectionWatch, ContactService, PointsService,
    SignIn,
};
