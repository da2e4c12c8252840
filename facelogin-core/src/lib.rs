//! Core functionality for the facelogin client
//!
//! This crate contains the login attempt guard, session persistence and role
//! routing used by the face-attendance login page.
//!
//! It defines the [`StateStore`] and [`AuthApi`] traits that storage backends
//! and transports implement, and the services built on them:
//!
//! - [`LoginAttemptGuard`] counts failed logins and enforces a timed lockout
//! - [`SessionService`] stores the session returned by a successful login
//! - [`LockoutCountdown`] polls the guard so a view can show the remaining time
//!
pub mod clock;
pub mod error;
pub mod repositories;
pub mod role;
pub mod services;
pub mod storage;
pub mod token;
pub mod validation;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-util"))]
pub use clock::ManualClock;
pub use error::Error;
pub use repositories::{AuthApi, AuthApiError, LoginRequest, StateStore};
pub use role::Role;
pub use services::{LockoutCountdown, LoginAttemptGuard, LoginOutcome, SessionService};
pub use storage::{AuthSession, LockoutStatus, LoginGuardConfig, MemoryStateStore, UserProfile};
