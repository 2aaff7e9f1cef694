//! Application wiring.
//!
//! `App` builds the credential store, authorization binding, API client,
//! session and resource services from a `Config`, and runs the login,
//! register and logout flows across them.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::api::{ApiClient, ApiError, AuthBinding};
use crate::auth::{
    CredentialStore, FileBackend, KeyringBackend, LoginForm, MemoryBackend, RegisterForm,
    RestoreOutcome, Session, SessionError, SessionManager, ValidationErrors,
};
use crate::config::{Config, CredentialBackendKind};
use crate::models::User;
use crate::services::{AuthService, CampaignService, ChannelService, ContactService, PointsService};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Session(#[from] SessionError),
}

/// Everything a front end needs, sharing one session and one client.
#[derive(Clone)]
pub struct App {
    session: Arc<SessionManager>,
    client: ApiClient,
    pub auth: AuthService,
    pub channels: ChannelService,
    pub campaigns: CampaignService,
    pub contacts: ContactService,
    pub points: PointsService,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("client", &self.client)
            .field("session", &self.session.current())
            .finish()
    }
}

impl App {
    /// Build from configuration, choosing the credential backend it names.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = match config.credential_backend {
            CredentialBackendKind::Keyring => CredentialStore::new(Arc::new(KeyringBackend::new())),
            CredentialBackendKind::File => {
                CredentialStore::new(Arc::new(FileBackend::in_dir(&config.data_dir()?)))
            }
            CredentialBackendKind::Memory => CredentialStore::new(Arc::new(MemoryBackend::new())),
        };
        Ok(Self::with_store(config, store)?)
    }

    /// Build over an existing store.
    pub fn with_store(config: &Config, store: CredentialStore) -> Result<Self, ApiError> {
        let binding = AuthBinding::new();
        let session = SessionManager::new(store, binding.clone())
            .with_restore_timeout(config.restore_timeout());
        let client = ApiClient::new(
            &config.api_base_url,
            config.request_timeout(),
            session.auth_provider(),
        )?;

        Ok(Self {
            session: Arc::new(session),
            auth: AuthService::new(client.clone()),
            channels: ChannelService::new(client.clone()).with_poll_interval(config.poll_interval()),
            campaigns: CampaignService::new(client.clone()),
            contacts: ContactService::new(client.clone()),
            points: PointsService::new(client.clone()),
            client,
        })
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Current session value.
    pub fn current(&self) -> Session {
        self.session.current()
    }

    pub async fn restore(&self) -> RestoreOutcome {
        self.session.restore().await
    }

    /// Validate, authenticate, then sign in. Nothing is sent when the form
    /// is invalid.
    pub async fn login(&self, form: &LoginForm) -> Result<User, AppError> {
        form.validate()?;
        let sign_in = self.auth.login(form.email.trim(), &form.password).await?;
        self.session.sign_in(sign_in.token, sign_in.user.clone()).await?;
        info!(user_id = %sign_in.user.id, "Login complete");
        Ok(sign_in.user)
    }

    pub async fn register(&self, form: &RegisterForm) -> Result<User, AppError> {
        let form = form.trimmed();
        form.validate()?;
        let sign_in = self
            .auth
            .register(&form.name, &form.email, &form.phone, &form.password)
            .await?;
        self.session.sign_in(sign_in.token, sign_in.user.clone()).await?;
        info!(user_id = %sign_in.user.id, "Registration complete");
        Ok(sign_in.user)
    }

    pub async fn logout(&self) -> Result<(), AppError> {
        self.session.sign_out().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_app() -> App {
        // Nothing listens on port 9; validation failures must never get that far.
        let config = Config {
            api_base_url: "http://127.0.0.1:9".into(),
            ..Default::default()
        };
        App::with_store(&config, CredentialStore::in_memory()).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_login_never_reaches_network() {
        let app = offline_app();
        let err = app.login(&LoginForm::new("bad", "1")).await.unwrap_err();
        match err {
            AppError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(!app.current().is_authenticated());
    }

    #[tokio::test]
    async fn test_invalid_register_never_reaches_network() {
        let app = offline_app();
        let form = RegisterForm { name: "A".into(), ..Default::default() };
        assert!(matches!(app.register(&form).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_memory_backend_from_config() {
        let config = Config {
            credential_backend: CredentialBackendKind::Memory,
            ..Default::default()
        };
        let app = App::from_config(&config).unwrap();
        assert!(!app.restore().await.is_authenticated());
        assert!(app.client().authorization_header().is_none());
    }
}
