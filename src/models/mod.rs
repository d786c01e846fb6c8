//! Data types shared across the session lifecycle.
//!
//! `User` is the profile the authentication service returns;
//! `LoginCredentials` and `Registration` are the request bodies it accepts.

pub mod user;

pub use user::{LoginCredentials, Registration, User};
