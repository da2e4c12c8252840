//! # facelogin
//!
//! Login page logic for the face-attendance client.
//!
//! [`LoginPortal`] drives a login form end to end:
//! - validates the form and guards submissions with a timed lockout after
//!   repeated credential rejections
//! - stores the session returned by the server, optionally remembering the
//!   username
//! - resolves the dashboard route for the user's role
//!
//! The lockout counter and deadline are kept in the same [`StateStore`] as the
//! session, so a lockout survives a reload.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use facelogin::{HttpAuthApi, HttpAuthApiConfig, LoginForm, LoginPortal, LoginResult, SqliteStateStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStateStore::connect("sqlite://facelogin.db").await?;
//!     store.migrate().await?;
//!     let api = HttpAuthApi::new(HttpAuthApiConfig::default())?;
//!
//!     let portal = LoginPortal::new(Arc::new(store), Arc::new(api));
//!     match portal.login(LoginForm::new("gv001", "secret")).await? {
//!         LoginResult::Redirect { route, .. } => println!("go to {route}"),
//!         LoginResult::Refused(outcome) => println!("refused: {outcome:?}"),
//!     }
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

use facelogin_core::{
    error::AuthError,
    services::{LoginAttemptGuard, SessionService},
    validation::validate_username,
};

/// Re-export core types from facelogin_core
pub use facelogin_core::{
    AuthApi, AuthApiError, AuthSession, Clock, Error, LockoutCountdown, LockoutStatus,
    LoginGuardConfig, LoginOutcome, LoginRequest, MemoryStateStore, Role, StateStore, SystemClock,
    UserProfile, error, repositories::keys, services::format_remaining,
};

/// Clock for tests, available with the `test-util` feature
#[cfg(feature = "test-util")]
pub use facelogin_core::ManualClock;

/// Re-export storage and transport backends
///
/// These implementations are available when the corresponding feature is enabled.
#[cfg(feature = "sqlite")]
pub use facelogin_storage_sqlite::SqliteStateStore;

#[cfg(feature = "http")]
pub use facelogin_http::{HttpAuthApi, HttpAuthApiConfig};

/// The fields of the login form.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    /// Remember the username for the next visit
    pub remember_me: bool,
}

impl LoginForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            remember_me: false,
        }
    }

    pub fn remember_me(mut self, remember_me: bool) -> Self {
        self.remember_me = remember_me;
        self
    }
}

/// Result of submitting the login form.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginResult {
    /// Logged in; the session is stored and the view should navigate to `route`
    Redirect {
        route: &'static str,
        session: AuthSession,
    },
    /// The guard refused or the server rejected the submission
    Refused(LoginOutcome),
}

impl LoginResult {
    pub fn route(&self) -> Option<&'static str> {
        match self {
            LoginResult::Redirect { route, .. } => Some(*route),
            LoginResult::Refused(_) => None,
        }
    }
}

/// The login page flow.
///
/// Generic over the state store and the Authentication API so the same flow
/// runs against SQLite and HTTP in production and in-memory mocks in tests.
pub struct LoginPortal<S: StateStore, A: AuthApi> {
    store: Arc<S>,
    guard: Arc<LoginAttemptGuard<S, A>>,
    sessions: SessionService<S>,
}

impl<S: StateStore, A: AuthApi> LoginPortal<S, A> {
    /// Create a portal with the default lockout settings.
    pub fn new(store: Arc<S>, api: Arc<A>) -> Self {
        Self::with_config(store, api, LoginGuardConfig::default())
    }

    pub fn with_config(store: Arc<S>, api: Arc<A>, config: LoginGuardConfig) -> Self {
        Self::assemble(store, api, config, Arc::new(SystemClock))
    }

    /// Replace the clock used for lockout deadlines and token expiry.
    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        let api = self.guard.api().clone();
        let config = self.guard.config().clone();
        Self::assemble(self.store, api, config, clock)
    }

    fn assemble(
        store: Arc<S>,
        api: Arc<A>,
        config: LoginGuardConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let guard = LoginAttemptGuard::new(store.clone(), api, config).with_clock(clock.clone());
        let sessions = SessionService::new(store.clone()).with_clock(clock);

        Self {
            store,
            guard: Arc::new(guard),
            sessions,
        }
    }

    pub fn guard(&self) -> &Arc<LoginAttemptGuard<S, A>> {
        &self.guard
    }

    pub fn sessions(&self) -> &SessionService<S> {
        &self.sessions
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Submit the login form.
    ///
    /// On success the session is stored and the dashboard route for the
    /// user's role is returned. A role outside the known mapping is not
    /// logged in: the stored session is removed again and
    /// [`AuthError::UnknownRole`] is returned.
    pub async fn login(&self, form: LoginForm) -> Result<LoginResult, Error> {
        let outcome = self
            .guard
            .attempt_login(&form.username, &form.password)
            .await?;

        let LoginOutcome::Success(session) = outcome else {
            return Ok(LoginResult::Refused(outcome));
        };

        let remember = form.remember_me.then(|| form.username.trim());
        self.sessions.save(&session, remember).await?;

        match self.redirect_route(&session) {
            Ok(route) => Ok(LoginResult::Redirect { route, session }),
            Err(e) => {
                tracing::warn!(role = %session.user.vai_tro, "Login refused for unknown role");
                self.sessions.clear().await?;
                Err(e)
            }
        }
    }

    /// The dashboard route for the session's role.
    pub fn redirect_route(&self, session: &AuthSession) -> Result<&'static str, Error> {
        Ok(session.role()?.dashboard_route())
    }

    /// The current lockout status.
    pub async fn status(&self) -> Result<LockoutStatus, Error> {
        self.guard.check_status().await
    }

    /// Start a countdown that polls the lockout status until it ends.
    pub async fn countdown(&self) -> Result<LockoutCountdown, Error> {
        LockoutCountdown::start(self.guard.clone()).await
    }

    /// Ask the server to send password reset instructions.
    ///
    /// # Errors
    ///
    /// - a validation error if the username is too short
    /// - [`AuthError::ResetRejected`] if the server refused the request
    /// - [`Error::Network`] if the server could not be reached
    pub async fn forgot_password(&self, username: &str) -> Result<(), Error> {
        validate_username(username, self.guard.config().min_field_length())?;
        let username = username.trim();

        match self.guard.api().forgot_password(username).await {
            Ok(()) => {
                tracing::info!(username, "Password reset requested");
                Ok(())
            }
            Err(AuthApiError::Rejected { status, message }) => {
                tracing::warn!(username, status = ?status, "Password reset rejected");
                Err(AuthError::ResetRejected(
                    message.unwrap_or_else(|| "Password reset request was rejected".to_string()),
                )
                .into())
            }
            Err(e) => {
                tracing::warn!(username, error = %e, "Password reset request failed");
                Err(Error::Network(e.to_string()))
            }
        }
    }

    /// The route to skip the login page with, if a valid session is stored.
    ///
    /// An expired session, or one whose role has no dashboard, is cleared.
    pub async fn existing_login_route(&self) -> Result<Option<&'static str>, Error> {
        let Some(session) = self.sessions.existing_login().await? else {
            return Ok(None);
        };

        match session.role() {
            Ok(role) => Ok(Some(role.dashboard_route())),
            Err(e) => {
                tracing::warn!(error = %e, "Stored session has an unknown role");
                self.sessions.clear().await?;
                Ok(None)
            }
        }
    }

    /// The username to prefill the form with.
    pub async fn remembered_username(&self) -> Result<Option<String>, Error> {
        self.sessions.remembered_username().await
    }

    /// Remove the stored session. The remembered username is kept.
    pub async fn logout(&self) -> Result<(), Error> {
        self.sessions.clear().await?;
        tracing::info!("Logged out");
        Ok(())
    }
}
