//! Traits for the collaborators the services depend on
//!
//! - [`StateStore`] is the durable key-value store holding lockout state and
//!   session artifacts.
//! - [`AuthApi`] is the remote Authentication API.
//!
//! Storage backends and transports live in their own crates and implement
//! these traits; the in-memory store in [`crate::storage`] covers tests and
//! single-process use.

pub mod auth_api;
pub mod state;

pub use auth_api::{AuthApi, AuthApiError, LoginRequest};
pub use state::{StateStore, keys};
