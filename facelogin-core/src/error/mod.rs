use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Unknown user role: {0}")]
    UnknownRole(String),

    #[error("A login attempt is already in progress")]
    LoginInProgress,

    #[error("Password reset rejected: {0}")]
    ResetRejected(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Field {field} must be at least {min} characters long")]
    TooShort { field: String, min: usize },

    #[error("{}", join_messages(.0))]
    Form(Vec<ValidationError>),
}

impl ValidationError {
    /// The form field this error belongs to, if it names exactly one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingField(field) => Some(field),
            ValidationError::TooShort { field, .. } => Some(field),
            ValidationError::Form(_) => None,
        }
    }

    /// Flatten into per-field errors so each can be shown inline.
    pub fn field_errors(&self) -> Vec<&ValidationError> {
        match self {
            ValidationError::Form(errors) => errors.iter().flat_map(|e| e.field_errors()).collect(),
            other => vec![other],
        }
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_network_error(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}
