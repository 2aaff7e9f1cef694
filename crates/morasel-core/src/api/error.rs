use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Shown when the request never got a response (DNS, connect, timeout).
pub const CONNECTIVITY_MESSAGE: &str =
    "Unable to reach the server. Check your internet connection.";

/// Shown when the server answered with an error but gave no message.
pub const SERVER_FALLBACK_MESSAGE: &str = "Error communicating with the server";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{}", CONNECTIVITY_MESSAGE)]
    Connectivity(#[source] reqwest::Error),

    #[error("{message}")]
    Server { status: StatusCode, message: String },

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Invalid authorization header")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),
}

/// Maximum length for error response bodies in log lines
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..end],
                body.len()
            )
        }
    }

    /// Build the normalized error for a non-success response.
    ///
    /// Prefers the server's `message` field, then `error`, then a fixed
    /// fallback. Validation failures often send `message` as an array of
    /// strings; those are joined.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| server_message(&v))
            .unwrap_or_else(|| SERVER_FALLBACK_MESSAGE.to_string());
        ApiError::Server { status, message }
    }

    /// Error for a 429 that outlived every retry. The server's message is
    /// kept when it sent one.
    pub fn rate_limited(body: &str) -> Self {
        match serde_json::from_str::<Value>(body).ok().and_then(|v| server_message(&v)) {
            Some(message) => ApiError::Server {
                status: StatusCode::TOO_MANY_REQUESTS,
                message,
            },
            None => ApiError::RateLimited,
        }
    }

    /// Classify a transport-level failure. Anything that never produced a
    /// response is a connectivity problem.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            ApiError::Connectivity(err)
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Http(err)
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            ApiError::RateLimited => Some(StatusCode::TOO_MANY_REQUESTS),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, ApiError::Connectivity(_))
    }
}

fn server_message(body: &Value) -> Option<String> {
    for key in ["message", "error"] {
        match body.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Array(items)) => {
                let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                if !parts.is_empty() {
                    return Some(parts.join(", "));
                }
            }
            _ => {}
        }
    }
    None
}
