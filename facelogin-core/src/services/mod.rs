//! Service layer for business logic
//!
//! This module contains the services that implement the login flow on top of
//! the traits in [`crate::repositories`].

pub mod countdown;
pub mod login_guard;
pub mod session;

pub use countdown::{LockoutCountdown, format_remaining};
pub use login_guard::{LoginAttemptGuard, LoginOutcome};
pub use session::SessionService;
