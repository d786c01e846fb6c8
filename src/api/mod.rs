//! Network boundary to the remote authentication service.
//!
//! `Transport` is the seam the session manager depends on; `HttpClient`
//! is the production implementation built on reqwest. Expected failures
//! (rejected credentials, expired tokens, network errors) are all
//! normalized into `ApiError` so callers never handle raw transport
//! exceptions.

pub mod client;
pub mod error;

use serde::Deserialize;

use crate::models::{LoginCredentials, Registration, User};

pub use client::HttpClient;
pub use error::ApiError;

/// Body of a successful login or registration response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub user: User,
    /// Absent when the server creates the account without issuing a session.
    #[serde(default)]
    pub token: Option<String>,
}

/// Operations the authentication service exposes.
///
/// The session manager is generic over this trait so tests can substitute
/// a scripted transport.
// Callers are single-threaded; futures need not be Send.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn login(&self, credentials: &LoginCredentials) -> Result<AuthPayload, ApiError>;

    async fn register(&self, data: &Registration) -> Result<AuthPayload, ApiError>;

    async fn logout(&self) -> Result<(), ApiError>;

    async fn current_user(&self) -> Result<User, ApiError>;
}
