//! Login attempt guard with timed lockout.
//!
//! The guard sits in front of the Authentication API. It counts consecutive
//! credential rejections, locks the login form once the configured threshold
//! is reached, and lifts the lockout once its deadline passes. Both the
//! counter and the deadline live in the [`StateStore`], so a lockout survives
//! a reload or restart.
//!
//! # States
//!
//! - `UNLOCKED(n)`: `n` failures recorded, no deadline or an expired one
//! - `LOCKED(until)`: submissions are refused locally until `until`
//!
//! The unlock transition is not timer driven. Whoever observes the state
//! after the deadline ([`LoginAttemptGuard::check_status`] or
//! [`LoginAttemptGuard::attempt_login`]) clears it. A caller that wants the
//! form to unlock on its own polls `check_status`, see
//! [`LockoutCountdown`](crate::services::LockoutCountdown).
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use facelogin_core::services::{LoginAttemptGuard, LoginOutcome};
//! use facelogin_core::storage::{LoginGuardConfig, MemoryStateStore};
//!
//! let guard = LoginAttemptGuard::new(
//!     Arc::new(MemoryStateStore::new()),
//!     api,
//!     LoginGuardConfig::default(),
//! );
//!
//! match guard.attempt_login("gv001", "secret").await? {
//!     LoginOutcome::Success(session) => { /* store session, redirect */ }
//!     LoginOutcome::Rejected { message, attempts_remaining } => { /* show message */ }
//!     LoginOutcome::LockedJustNow { lockout_ms } => { /* start countdown */ }
//!     LoginOutcome::Locked { remaining_ms } => { /* show remaining time */ }
//!     LoginOutcome::NetworkError { message } => { /* retry later */ }
//! }
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use chrono::{DateTime, Utc};

use crate::{
    Error,
    clock::{Clock, SystemClock},
    error::AuthError,
    repositories::{AuthApi, AuthApiError, LoginRequest, StateStore, keys},
    storage::{AuthSession, LockoutStatus, LoginAttemptState, LoginGuardConfig},
    validation::validate_login_form,
};

/// Shown when the server rejects credentials without a message.
pub const DEFAULT_REJECTION_MESSAGE: &str = "Invalid username or password";

/// Shown for failures that are not the user's fault.
pub const NETWORK_ERROR_MESSAGE: &str = "Unable to reach the server. Please try again later.";

/// Result of a login submission that reached the guard's decision logic.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    /// The API accepted the credentials.
    Success(AuthSession),
    /// The API rejected the credentials; the failure was counted.
    Rejected {
        message: String,
        attempts_remaining: u32,
    },
    /// This failure reached the threshold and started a lockout.
    LockedJustNow { lockout_ms: u64 },
    /// Refused locally, the API was not contacted.
    Locked { remaining_ms: u64 },
    /// Transport failure or malformed response; nothing was counted.
    NetworkError { message: String },
}

impl LoginOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoginOutcome::Success(_))
    }

    pub fn is_locked(&self) -> bool {
        matches!(
            self,
            LoginOutcome::Locked { .. } | LoginOutcome::LockedJustNow { .. }
        )
    }
}

/// Tracks failed logins and enforces a timed lockout.
///
/// # Thread Safety
///
/// The guard can be shared behind an `Arc`. Submissions are serialized: while
/// one [`attempt_login`](Self::attempt_login) is waiting on the API, another
/// returns [`AuthError::LoginInProgress`] instead of racing on the counter.
/// Atomicity across separate processes sharing one store is not provided.
pub struct LoginAttemptGuard<S: StateStore, A: AuthApi> {
    store: Arc<S>,
    api: Arc<A>,
    clock: Arc<dyn Clock>,
    config: LoginGuardConfig,
    in_flight: AtomicBool,
}

impl<S: StateStore, A: AuthApi> LoginAttemptGuard<S, A> {
    /// Create a guard reading the system clock.
    pub fn new(store: Arc<S>, api: Arc<A>, config: LoginGuardConfig) -> Self {
        Self {
            store,
            api,
            clock: Arc::new(SystemClock),
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Replace the clock, e.g. with a `ManualClock` in tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &LoginGuardConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    /// Whether a submission is currently waiting on the API.
    pub fn is_login_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Report the current lockout status.
    ///
    /// Reads the store and the clock. If a recorded lockout has expired, the
    /// counter and deadline are cleared; otherwise nothing is written, so this
    /// is safe to poll.
    pub async fn check_status(&self) -> Result<LockoutStatus, Error> {
        let now = self.clock.now();
        let state = self.observe(now).await?;
        Ok(self.status_of(&state, now))
    }

    /// Submit credentials through the guard.
    ///
    /// # Errors
    ///
    /// - [`AuthError::LoginInProgress`] if another submission is in flight
    /// - a [`ValidationError`](crate::error::ValidationError) for malformed input,
    ///   before anything is read or sent
    /// - a storage error if the state store fails
    ///
    /// Every other result, including network failures, is a [`LoginOutcome`].
    pub async fn attempt_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, Error> {
        let _in_flight =
            InFlight::acquire(&self.in_flight).ok_or(Error::Auth(AuthError::LoginInProgress))?;

        validate_login_form(username, password, self.config.min_field_length())?;

        let now = self.clock.now();
        let state = self.observe(now).await?;

        if let Some(until) = state.lockout_until {
            let remaining_ms = remaining_ms(until, now);
            tracing::debug!(remaining_ms, "Login refused while locked out");
            return Ok(LoginOutcome::Locked { remaining_ms });
        }

        if state.attempt_count >= self.config.max_attempts() {
            // Threshold reached without a recorded deadline
            let lockout_ms = self.lock(now, state.attempt_count).await?;
            return Ok(LoginOutcome::LockedJustNow { lockout_ms });
        }

        let request = LoginRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
        };

        match self.api.login(&request).await {
            Ok(session) if session.access_token.is_empty() => {
                tracing::warn!(
                    username = %request.username,
                    "Login response carried an empty access token, attempt not counted"
                );
                Ok(network_error())
            }
            Ok(session) => {
                self.clear_state().await?;
                tracing::info!(
                    username = %request.username,
                    role = %session.user.vai_tro,
                    "Login succeeded"
                );
                Ok(LoginOutcome::Success(session))
            }
            Err(AuthApiError::Rejected { status, message }) => {
                tracing::warn!(
                    username = %request.username,
                    status = ?status,
                    "Login rejected by server"
                );
                self.record_failure(&state, now, message).await
            }
            Err(e) => {
                tracing::warn!(
                    username = %request.username,
                    error = %e,
                    "Login request failed, attempt not counted"
                );
                Ok(network_error())
            }
        }
    }

    /// Clear the counter and any lockout.
    pub async fn reset(&self) -> Result<(), Error> {
        self.clear_state().await
    }

    /// Load the persisted state, applying the unlock transition if due.
    async fn observe(&self, now: DateTime<Utc>) -> Result<LoginAttemptState, Error> {
        let state = self.load_state().await?;

        if state.is_expired_at(now) {
            self.clear_state().await?;
            tracing::info!(attempts = state.attempt_count, "Login lockout expired");
            return Ok(LoginAttemptState::default());
        }

        Ok(state)
    }

    async fn load_state(&self) -> Result<LoginAttemptState, Error> {
        let attempt_count = match self.store.get(keys::LOGIN_ATTEMPTS).await? {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(count) => count,
                Err(_) => {
                    tracing::warn!(value = %raw, "Discarding unreadable login attempt counter");
                    self.store.remove(keys::LOGIN_ATTEMPTS).await?;
                    0
                }
            },
            None => 0,
        };

        let lockout_until = match self.store.get(keys::LOCKOUT_TIME).await? {
            Some(raw) => {
                let parsed = raw
                    .trim()
                    .parse::<i64>()
                    .ok()
                    .and_then(DateTime::from_timestamp_millis);
                if parsed.is_none() {
                    tracing::warn!(value = %raw, "Discarding unreadable lockout deadline");
                    self.store.remove(keys::LOCKOUT_TIME).await?;
                }
                parsed
            }
            None => None,
        };

        Ok(LoginAttemptState {
            attempt_count,
            lockout_until,
        })
    }

    async fn clear_state(&self) -> Result<(), Error> {
        self.store.remove(keys::LOGIN_ATTEMPTS).await?;
        self.store.remove(keys::LOCKOUT_TIME).await?;
        Ok(())
    }

    async fn record_failure(
        &self,
        state: &LoginAttemptState,
        now: DateTime<Utc>,
        message: Option<String>,
    ) -> Result<LoginOutcome, Error> {
        let attempts = state.attempt_count.saturating_add(1);
        self.store
            .set(keys::LOGIN_ATTEMPTS, &attempts.to_string())
            .await?;

        if attempts >= self.config.max_attempts() {
            let lockout_ms = self.lock(now, attempts).await?;
            return Ok(LoginOutcome::LockedJustNow { lockout_ms });
        }

        let message = message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_MESSAGE.to_string());

        Ok(LoginOutcome::Rejected {
            message,
            attempts_remaining: self.config.max_attempts() - attempts,
        })
    }

    /// Record a lockout starting at `now`. Returns its length in milliseconds.
    async fn lock(&self, now: DateTime<Utc>, attempts: u32) -> Result<u64, Error> {
        // Saturate instead of overflowing on an oversized lockout
        let until = now
            .checked_add_signed(self.config.lockout_duration())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.store
            .set(keys::LOCKOUT_TIME, &until.timestamp_millis().to_string())
            .await?;

        let lockout_ms = self.config.lockout_ms();
        tracing::info!(
            attempts,
            lockout_ms,
            until = %until,
            "Login locked after too many failed attempts"
        );
        Ok(lockout_ms)
    }

    fn status_of(&self, state: &LoginAttemptState, now: DateTime<Utc>) -> LockoutStatus {
        match state.lockout_until {
            Some(until) if now < until => LockoutStatus {
                locked: true,
                remaining_ms: remaining_ms(until, now),
                attempts_remaining: 0,
            },
            _ => LockoutStatus {
                locked: false,
                remaining_ms: 0,
                attempts_remaining: self.config.max_attempts().saturating_sub(state.attempt_count),
            },
        }
    }
}

fn remaining_ms(until: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (until - now).num_milliseconds().max(0) as u64
}

fn network_error() -> LoginOutcome {
    LoginOutcome::NetworkError {
        message: NETWORK_ERROR_MESSAGE.to_string(),
    }
}

/// Holds the in-flight flag for the duration of one submission.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
