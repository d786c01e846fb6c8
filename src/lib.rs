//! Frothauth - client-side session and authentication lifecycle.
//!
//! This crate manages how a credential token and user profile are acquired,
//! persisted across restarts, attached to outgoing requests, invalidated on
//! expiry, and kept consistent between in-memory state and durable storage.
//!
//! The moving parts:
//! - [`SessionStore`]: durable token/profile persistence
//! - [`SessionManager`]: login, registration, logout, profile refresh, and
//!   teardown when the server rejects the credential
//! - [`HttpClient`]: the reqwest transport; [`Transport`] is the seam for
//!   substituting it in tests
//!
//! ```no_run
//! use frothauth::{Config, LoginCredentials, NoopNavigator, SessionManager};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let mut sessions = SessionManager::from_config(&config, Box::new(NoopNavigator))?;
//! sessions.restore();
//!
//! if !sessions.is_authenticated() {
//!     sessions
//!         .login(&LoginCredentials {
//!             email: "ada@example.com".into(),
//!             password: "secret".into(),
//!         })
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiError, AuthPayload, HttpClient, Transport};
pub use auth::{
    AuthError, Navigator, NoopNavigator, RegisterOutcome, Route, Session, SessionManager,
    SessionState, SessionStore, StoredSession, TokenCell,
};
pub use config::Config;
pub use models::{LoginCredentials, Registration, User};
