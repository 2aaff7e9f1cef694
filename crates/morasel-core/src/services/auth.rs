use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::api::envelope::unwrap_data;
use crate::api::{ApiClient, ApiError};
use crate::models::User;

/// Token and account returned by a successful login or registration.
#[derive(Clone, PartialEq, Eq)]
pub struct SignIn {
    pub token: String,
    pub user: User,
}

impl std::fmt::Debug for SignIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignIn")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    phone: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthResponse {
    access_token: Option<String>,
    token: Option<String>,
    user: Option<User>,
}

/// `/auth` endpoints.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<SignIn, ApiError> {
        info!("Logging in");
        let body = self
            .client
            .post("/auth/login", &LoginRequest { email, password })
            .await?;
        parse_sign_in(body)
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        phone: &str,
        password: &str,
    ) -> Result<SignIn, ApiError> {
        info!("Registering account");
        let body = self
            .client
            .post(
                "/auth/register",
                &RegisterRequest { name, email, phone, password },
            )
            .await?;
        parse_sign_in(body)
    }
}

/// Read `{access_token, user}`, bare or inside `data`. A bare `token` is
/// accepted when `access_token` is absent.
fn parse_sign_in(body: Value) -> Result<SignIn, ApiError> {
    let response: AuthResponse = serde_json::from_value(unwrap_data(body))
        .map_err(|e| ApiError::Decode(format!("Invalid auth response: {}", e)))?;

    let token = match (response.access_token, response.token) {
        (Some(t), _) if !t.is_empty() => t,
        (_, Some(t)) if !t.is_empty() => {
            debug!("Auth response used legacy `token` field");
            t
        }
        _ => return Err(ApiError::Decode("Auth response has no access token".to_string())),
    };
    let user = response
        .user
        .ok_or_else(|| ApiError::Decode("Auth response has no user".to_string()))?;

    Ok(SignIn { token, user })
}
