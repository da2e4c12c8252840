//! Data types persisted in, or derived from, the client state store.

mod memory;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::AuthError, role::Role};

pub use memory::MemoryStateStore;

/// Default number of failed attempts before the form locks.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default lockout length in milliseconds (15 minutes).
pub const DEFAULT_LOCKOUT_MS: i64 = 15 * 60 * 1000;

/// Default minimum length for the username and password fields.
pub const DEFAULT_MIN_FIELD_LENGTH: usize = 3;

/// Configuration for login lockout behavior.
///
/// The values are fixed once a guard has been built from them.
///
/// # Example
///
/// ```rust
/// use chrono::Duration;
/// use facelogin_core::storage::LoginGuardConfig;
///
/// let config = LoginGuardConfig::default()
///     .with_max_attempts(5)
///     .with_lockout_duration(Duration::minutes(30));
/// assert_eq!(config.lockout_ms(), 30 * 60 * 1000);
/// ```
#[derive(Debug, Clone)]
pub struct LoginGuardConfig {
    /// Failed attempts that trigger a lockout
    max_attempts: u32,
    /// How long a lockout lasts
    lockout_duration: Duration,
    /// Minimum length of the username and password fields
    min_field_length: usize,
    /// How often a countdown polls the lockout status
    countdown_interval: std::time::Duration,
}

impl Default for LoginGuardConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            lockout_duration: Duration::milliseconds(DEFAULT_LOCKOUT_MS),
            min_field_length: DEFAULT_MIN_FIELD_LENGTH,
            countdown_interval: std::time::Duration::from_secs(1),
        }
    }
}

impl LoginGuardConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the lockout length. A lockout always lasts at least one millisecond.
    pub fn with_lockout_duration(mut self, duration: Duration) -> Self {
        self.lockout_duration = duration.max(Duration::milliseconds(1));
        self
    }

    pub fn with_min_field_length(mut self, min: usize) -> Self {
        self.min_field_length = min;
        self
    }

    pub fn with_countdown_interval(mut self, interval: std::time::Duration) -> Self {
        self.countdown_interval = interval;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn lockout_duration(&self) -> Duration {
        self.lockout_duration
    }

    pub fn min_field_length(&self) -> usize {
        self.min_field_length
    }

    pub fn countdown_interval(&self) -> std::time::Duration {
        self.countdown_interval
    }

    /// The lockout length in whole milliseconds.
    pub fn lockout_ms(&self) -> u64 {
        self.lockout_duration.num_milliseconds().max(0) as u64
    }
}

/// Lockout state as reconstructed from the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoginAttemptState {
    pub attempt_count: u32,
    pub lockout_until: Option<DateTime<Utc>>,
}

impl LoginAttemptState {
    /// Whether a lockout is active at `now`.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.lockout_until.is_some_and(|until| now < until)
    }

    /// Whether a lockout deadline is recorded but has already passed.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.lockout_until.is_some_and(|until| now >= until)
    }
}

/// Snapshot returned by `check_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutStatus {
    pub locked: bool,
    /// Milliseconds until the lockout ends, zero when unlocked
    pub remaining_ms: u64,
    /// Failures left before a lockout, zero when locked
    pub attempts_remaining: u32,
}

impl LockoutStatus {
    /// Seconds until the lockout ends, rounded up. `None` when unlocked.
    pub fn retry_after_seconds(&self) -> Option<u64> {
        self.locked.then(|| self.remaining_ms.div_ceil(1000))
    }
}

/// User profile returned by the Authentication API.
///
/// Fields the client does not interpret are kept in `extra` so the stored
/// profile round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Role name as sent by the server (`ADMIN`, `GIANGVIEN`, `SINHVIEN`)
    pub vai_tro: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    pub fn new(username: impl Into<String>, vai_tro: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            vai_tro: vai_tro.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Parse the role, rejecting names outside the known mapping.
    pub fn role(&self) -> Result<Role, AuthError> {
        self.vai_tro.parse()
    }
}

/// A session obtained from a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub user: UserProfile,
}

impl AuthSession {
    pub fn role(&self) -> Result<Role, AuthError> {
        self.user.role()
    }
}
