//! Trait for the remote Authentication API.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::storage::AuthSession;

/// Credentials sent to `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Failures reported by an [`AuthApi`] implementation.
///
/// Only [`AuthApiError::Rejected`] means the server looked at the credentials
/// and refused them. The other variants describe a broken exchange and must
/// not be held against the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthApiError {
    #[error("Request rejected (status {status:?}): {}", message.as_deref().unwrap_or("no message"))]
    Rejected {
        status: Option<u16>,
        message: Option<String>,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl AuthApiError {
    /// Whether this failure counts toward the lockout threshold.
    pub fn is_credential_rejection(&self) -> bool {
        matches!(self, AuthApiError::Rejected { .. })
    }
}

/// The Authentication API consumed by the login flow.
#[async_trait]
pub trait AuthApi: Send + Sync + 'static {
    /// Exchange credentials for a session.
    ///
    /// A successful return must carry a non-empty access token and a user
    /// profile; implementations report anything else as
    /// [`AuthApiError::MalformedResponse`].
    async fn login(&self, request: &LoginRequest) -> Result<AuthSession, AuthApiError>;

    /// Ask the server to start an out-of-band password reset.
    async fn forgot_password(&self, username: &str) -> Result<(), AuthApiError>;
}
