//! Session and authentication lifecycle.
//!
//! This module provides:
//! - `SessionStore`: durable token/profile persistence with an in-memory mirror
//! - `SessionManager`: the sole mutator of session state - login, registration,
//!   logout, profile refresh, and automatic teardown on credential expiry
//!
//! The store's `TokenCell` is the synchronous read path the HTTP transport
//! uses to attach the bearer token at request time.

pub mod manager;
pub mod store;

pub use manager::{
    AuthError, Navigator, NoopNavigator, RegisterOutcome, Route, Session, SessionManager,
    SessionState,
};
pub use store::{SessionStore, StoredSession, TokenCell};
