//! REST transport for the Morasel backend.
//!
//! This module provides the `ApiClient` every resource service sends through,
//! the `AuthProvider` seam that supplies its bearer token, the normalized
//! `ApiError`, and the envelope/pagination decoding shared by the services.

pub mod auth;
pub mod client;
pub mod envelope;
pub mod error;

pub use auth::{AuthBinding, AuthProvider, NoAuth};
pub use client::{ApiClient, DEFAULT_BASE_URL, REQUEST_TIMEOUT_SECS};
pub use error::{ApiError, CONNECTIVITY_MESSAGE, SERVER_FALLBACK_MESSAGE};
