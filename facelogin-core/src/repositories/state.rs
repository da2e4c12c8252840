//! Repository trait for the persisted client state store.
//!
//! The store is a flat string key-value map that survives restarts. The
//! lockout counter, the lockout deadline and the session artifacts all live in
//! the same store under the keys in [`keys`].

use async_trait::async_trait;

use crate::Error;

/// Well-known keys shared by every service writing to the store.
pub mod keys {
    /// Consecutive failed login attempts, decimal string.
    pub const LOGIN_ATTEMPTS: &str = "loginAttempts";
    /// Lockout deadline, epoch milliseconds as decimal string.
    pub const LOCKOUT_TIME: &str = "lockoutTime";

    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    /// Serialized user profile (JSON).
    pub const USER: &str = "user";
    /// RFC 3339 timestamp of the last successful login.
    pub const LOGIN_TIME: &str = "loginTime";
    pub const REMEMBER_ME: &str = "rememberMe";
    pub const SAVED_USERNAME: &str = "savedUsername";

    /// Artifacts removed on logout or when a stored session is unusable.
    pub const SESSION_ARTIFACTS: [&str; 4] = [ACCESS_TOKEN, REFRESH_TOKEN, USER, LOGIN_TIME];
}

/// Durable key-value storage for client state.
///
/// # Concurrency
///
/// Implementations only need to make individual operations atomic. Two
/// processes sharing one store may lose a counter update when they race on a
/// read-modify-write; callers accept that.
#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), Error>;
}
