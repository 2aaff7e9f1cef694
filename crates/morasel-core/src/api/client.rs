//! HTTP transport for the Morasel REST API.
//!
//! `ApiClient` owns the base URL, timeout and default headers, attaches the
//! bearer token from its `AuthProvider` on every request, and turns every
//! failure into an `ApiError`.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, multipart, Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::auth::{AuthProvider, NoAuth};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://api.mersall.me";

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for the Morasel backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling,
/// and clones share the same authorization provider.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    auth: Arc<dyn AuthProvider>,
    initial_backoff: Duration,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authorized", &self.auth.bearer_token().is_some())
            .finish()
    }
}

impl ApiClient {
    /// Create a client that attaches tokens from `auth`.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        auth: Arc<dyn AuthProvider>,
    ) -> Result<Self, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(ApiError::Http)?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            auth,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// First delay after a 429; each further retry doubles it.
    pub fn with_rate_limit_backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff = initial;
        self
    }

    /// Client for the production host with no authorization.
    pub fn unauthenticated() -> Result<Self, ApiError> {
        Self::new(
            DEFAULT_BASE_URL,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            Arc::new(NoAuth),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The `Authorization` header value the next request will carry.
    pub fn authorization_header(&self) -> Option<String> {
        self.auth.bearer_token().map(|t| format!("Bearer {}", t))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(value) = self.authorization_header() {
            let mut value = header::HeaderValue::from_str(&value)?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning a normalized error if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            debug!(status = %status, body = %ApiError::truncate_body(&body), "Request failed");
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send a request, retrying on 429 with exponential backoff.
    /// `build` is called once per attempt so the request can be rebuilt.
    async fn execute<F>(&self, method: Method, path: &str, build: F) -> Result<Response, ApiError>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let request = self
                .client
                .request(method.clone(), &url)
                .headers(self.auth_headers()?);

            debug!(method = %method, url = %url, "Sending request");
            let response = build(request)
                .send()
                .await
                .map_err(ApiError::from_transport)?;

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    let body = response.text().await.unwrap_or_default();
                    warn!(url = %url, body = %ApiError::truncate_body(&body), "Rate limit retries exhausted");
                    return Err(ApiError::rate_limited(&body));
                }
                warn!(
                    url = %url,
                    retry = retries,
                    backoff_ms = backoff.as_millis() as u64,
                    "Rate limited, backing off"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                continue;
            }

            return Self::check_response(response).await;
        }
    }

    /// Read a response body as JSON. An empty body reads as `null`.
    async fn read_json(response: Response) -> Result<Value, ApiError> {
        let text = response.text().await.map_err(ApiError::from_transport)?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            debug!(body = %ApiError::truncate_body(&text), "Response is not JSON");
            ApiError::Decode(e.to_string())
        })
    }

    // ===== Verbs =====

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        let response = self.execute(Method::GET, path, |r| r).await?;
        Self::read_json(response).await
    }

    pub async fn get_with_query(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, ApiError> {
        let response = self.execute(Method::GET, path, |r| r.query(query)).await?;
        Self::read_json(response).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        let response = self.execute(Method::POST, path, |r| r.json(body)).await?;
        Self::read_json(response).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        let response = self.execute(Method::PUT, path, |r| r.json(body)).await?;
        Self::read_json(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(Method::DELETE, path, |r| r).await?;
        Ok(())
    }

    /// POST a multipart form. Streaming bodies cannot be rebuilt, so this
    /// is sent once without the rate-limit retry.
    pub async fn post_multipart(&self, path: &str, form: multipart::Form) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!(url = %url, "Sending multipart request");
        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .multipart(form)
            .send()
            .await
            .map_err(ApiError::from_transport)?;
        let response = Self::check_response(response).await?;
        Self::read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AuthBinding;

    fn client_with(binding: &AuthBinding) -> ApiClient {
        ApiClient::new(
            "https://api.example.test/",
            Duration::from_secs(5),
            Arc::new(binding.clone()),
        )
        .unwrap()
    }

    #[test]
    fn test_url_joining() {
        let client = client_with(&AuthBinding::new());
        assert_eq!(client.base_url(), "https://api.example.test");
        assert_eq!(client.url("/channels"), "https://api.example.test/channels");
        assert_eq!(client.url("channels/1"), "https://api.example.test/channels/1");
    }

    #[test]
    fn test_authorization_header_follows_binding() {
        let binding = AuthBinding::new();
        let client = client_with(&binding);
        assert_eq!(client.authorization_header(), None);
        assert!(client.auth_headers().unwrap().is_empty());

        binding.bind("tok123");
        assert_eq!(client.authorization_header().as_deref(), Some("Bearer tok123"));
        let headers = client.auth_headers().unwrap();
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer tok123");

        binding.clear();
        assert_eq!(client.authorization_header(), None);
    }

    #[test]
    fn test_clones_share_authorization() {
        let binding = AuthBinding::new();
        let client = client_with(&binding);
        let cloned = client.clone();
        binding.bind("abc");
        assert_eq!(cloned.authorization_header().as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn test_invalid_token_is_rejected() {
        let binding = AuthBinding::new();
        let client = client_with(&binding);
        binding.bind("bad\ntoken");
        assert!(matches!(client.auth_headers(), Err(ApiError::InvalidHeader(_))));
    }
}
