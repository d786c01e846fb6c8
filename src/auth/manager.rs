//! Session lifecycle orchestration.
//!
//! `SessionManager` is the sole mutator of session state. It mediates
//! login, registration, logout and profile refresh, writes through to the
//! `SessionStore` on every change, and tears the session down whenever
//! the server signals that the credential has expired.
//!
//! State machine: Restoring -> (restore) -> Authenticated | Unauthenticated;
//! Unauthenticated -> (login/register success) -> Authenticated
//! -> (logout | credential expired) -> Unauthenticated.

use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{ApiError, AuthPayload, HttpClient, Transport};
use crate::config::Config;
use crate::models::{LoginCredentials, Registration, User};

use super::store::SessionStore;

/// Shown when a failed login carries no server message.
/// Localization is the embedding application's concern.
const LOGIN_FALLBACK: &str = "Login failed";

/// Shown when a failed registration carries no server message.
const REGISTER_FALLBACK: &str = "Registration failed";

/// User-facing failure for login and registration.
/// Carries the server-supplied message, or a generic fallback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct AuthError {
    pub message: String,
}

/// Navigation targets the manager can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Unauthenticated entry point (the login screen).
    Login,
    /// Authenticated landing area.
    Dashboard,
}

/// Post-transition navigation side effect, supplied by the embedding
/// application.
pub trait Navigator {
    fn navigate(&self, route: Route);
}

/// Navigator for non-interactive contexts; goes nowhere.
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, _route: Route) {}
}

/// In-memory session: the current user plus the advisory loading flag.
///
/// `loading` is true only during the initial restore and while a
/// login/registration call is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    pub loading: bool,
}

impl Session {
    fn new() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Startup state, until the one-time store read completes.
    Restoring,
    Authenticated,
    Unauthenticated,
}

/// Result of a registration attempt that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The server issued a session; registration doubled as login.
    SignedIn(User),
    /// The account exists but no session was issued; the user must log in.
    AccountCreated(User),
}

type Listener = Box<dyn Fn(&Session)>;

pub struct SessionManager<T: Transport> {
    transport: T,
    store: SessionStore,
    navigator: Box<dyn Navigator>,
    listeners: Vec<Listener>,
    session: Session,
    restored: bool,
}

impl SessionManager<HttpClient> {
    /// Wire up a manager with the production HTTP transport and the
    /// configured storage location.
    pub fn from_config(config: &Config, navigator: Box<dyn Navigator>) -> anyhow::Result<Self> {
        let store = SessionStore::from_config(config);
        let transport = HttpClient::new(config, store.token_cell())?;
        Ok(Self::new(transport, store, navigator))
    }
}

impl<T: Transport> SessionManager<T> {
    pub fn new(transport: T, store: SessionStore, navigator: Box<dyn Navigator>) -> Self {
        Self {
            transport,
            store,
            navigator,
            listeners: Vec::new(),
            session: Session::new(),
            restored: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn user(&self) -> Option<&User> {
        self.session.user.as_ref()
    }

    /// True iff the store holds a token and a profile is loaded.
    pub fn is_authenticated(&self) -> bool {
        self.session.user.is_some() && self.store.token().is_some()
    }

    pub fn state(&self) -> SessionState {
        if !self.restored {
            SessionState::Restoring
        } else if self.is_authenticated() {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        }
    }

    /// Register a listener invoked on every state transition.
    pub fn subscribe(&mut self, listener: impl Fn(&Session) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&self) {
        for listener in &self.listeners {
            listener(&self.session);
        }
    }

    /// One-time startup read of the durable store. Resolves the Restoring
    /// state; repeated calls are no-ops.
    pub fn restore(&mut self) {
        if self.restored {
            return;
        }
        if let Some(stored) = self.store.load() {
            debug!(user_id = stored.user.id, "restored session from storage");
            self.session.user = Some(stored.user);
        }
        self.session.loading = false;
        self.restored = true;
        self.notify();
    }

    /// Authenticate with the service. On success the session is persisted
    /// and navigation moves to the authenticated landing area.
    pub async fn login(&mut self, credentials: &LoginCredentials) -> Result<(), AuthError> {
        self.begin_mutation();

        match self.transport.login(credentials).await {
            Ok(payload) => {
                let AuthPayload { user, token } = payload;
                let Some(token) = token.filter(|t| !t.is_empty()) else {
                    warn!("login response carried no token");
                    return Err(self.fail(LOGIN_FALLBACK.to_string()));
                };
                self.establish_session(&token, user, LOGIN_FALLBACK)?;
                self.navigator.navigate(Route::Dashboard);
                Ok(())
            }
            Err(err) => {
                let auth_err = self.fail(err.user_message(LOGIN_FALLBACK));
                self.handle_api_error(&err);
                Err(auth_err)
            }
        }
    }

    /// Create an account. If the server issues a session the user is
    /// signed in immediately; otherwise they are handed off to login.
    pub async fn register(&mut self, data: &Registration) -> Result<RegisterOutcome, AuthError> {
        self.begin_mutation();

        match self.transport.register(data).await {
            Ok(payload) => {
                let AuthPayload { user, token } = payload;
                match token.filter(|t| !t.is_empty()) {
                    Some(token) => {
                        self.establish_session(&token, user.clone(), REGISTER_FALLBACK)?;
                        self.navigator.navigate(Route::Dashboard);
                        Ok(RegisterOutcome::SignedIn(user))
                    }
                    None => {
                        debug!("registration succeeded without a session token");
                        self.session.loading = false;
                        self.notify();
                        self.navigator.navigate(Route::Login);
                        Ok(RegisterOutcome::AccountCreated(user))
                    }
                }
            }
            Err(err) => {
                let auth_err = self.fail(err.user_message(REGISTER_FALLBACK));
                self.handle_api_error(&err);
                Err(auth_err)
            }
        }
    }

    /// End the session. The server call is best-effort: its failure is
    /// logged, never propagated, and the local session is always cleared.
    pub async fn logout(&mut self) {
        if let Err(err) = self.transport.logout().await {
            warn!(error = %err, "logout request failed; clearing local session anyway");
        }
        self.clear_session();
        self.navigator.navigate(Route::Login);
    }

    /// Re-fetch the profile from `GET /auth/me` and write it through.
    /// Failures are routed through the global expiry interceptor before
    /// being returned to the caller.
    pub async fn refresh_profile(&mut self) -> Result<User, ApiError> {
        match self.transport.current_user().await {
            Ok(user) => {
                if let Some(token) = self.store.token().map(str::to_string) {
                    if let Err(e) = self.store.save(&token, &user) {
                        warn!(error = %e, "failed to persist refreshed profile");
                    }
                }
                self.session.user = Some(user.clone());
                self.notify();
                Ok(user)
            }
            Err(err) => {
                self.handle_api_error(&err);
                Err(err)
            }
        }
    }

    /// Global failure interceptor. Route every transport error through
    /// here: a 401-class error clears the stored session and redirects to
    /// login. Exactly one redirect per Authenticated -> Unauthenticated
    /// transition; clearing while already signed out is a no-op.
    pub fn handle_api_error(&mut self, err: &ApiError) {
        if !err.is_unauthorized() {
            return;
        }
        if self.session.user.is_none() && self.store.token().is_none() {
            return;
        }
        debug!("session rejected by server; clearing stored credentials");
        self.clear_session();
        self.navigator.navigate(Route::Login);
    }

    fn begin_mutation(&mut self) {
        self.session.loading = true;
        self.notify();
    }

    /// Persist and adopt a fresh session. Loading is cleared and listeners
    /// run before any navigation side effect fires.
    fn establish_session(&mut self, token: &str, user: User, fallback: &str) -> Result<(), AuthError> {
        if let Err(e) = self.store.save(token, &user) {
            warn!(error = %e, "failed to persist session");
            self.session.user = None;
            return Err(self.fail(fallback.to_string()));
        }
        self.session.user = Some(user);
        self.session.loading = false;
        self.notify();
        Ok(())
    }

    /// Clear loading, notify, and hand back the failure.
    fn fail(&mut self, message: String) -> AuthError {
        self.session.loading = false;
        self.notify();
        AuthError { message }
    }

    fn clear_session(&mut self) {
        self.store.clear();
        self.session.user = None;
        self.session.loading = false;
        self.notify();
    }
}
