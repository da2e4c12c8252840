//! Login form validation
//!
//! These checks run before any network call. Every field is checked so the
//! caller can show each problem next to its input.

use crate::error::ValidationError;

/// Validates a username
///
/// The value is trimmed first; the trimmed value is what gets sent.
///
/// # Examples
///
/// ```rust
/// use facelogin_core::validation::validate_username;
///
/// assert!(validate_username("gv001", 3).is_ok());
/// assert!(validate_username("  ab ", 3).is_err());
/// ```
pub fn validate_username(username: &str, min_len: usize) -> Result<(), ValidationError> {
    validate_field("username", username.trim(), min_len)
}

/// Validates a password
///
/// Passwords are not trimmed; surrounding whitespace is part of the secret.
pub fn validate_password(password: &str, min_len: usize) -> Result<(), ValidationError> {
    validate_field("password", password, min_len)
}

/// Validates both login form fields, collecting every failure.
///
/// # Returns
///
/// `Ok(())` when both fields pass, a single field error when one fails, or
/// [`ValidationError::Form`] holding both errors.
pub fn validate_login_form(
    username: &str,
    password: &str,
    min_len: usize,
) -> Result<(), ValidationError> {
    let mut errors: Vec<ValidationError> = [
        validate_username(username, min_len),
        validate_password(password, min_len),
    ]
    .into_iter()
    .filter_map(Result::err)
    .collect();

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Form(errors)),
    }
}

fn validate_field(field: &str, value: &str, min_len: usize) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::MissingField(field.to_string()));
    }

    if value.chars().count() < min_len {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min: min_len,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("admin", 3).is_ok());
        assert!(validate_username("  abc  ", 3).is_ok());
        assert_eq!(
            validate_username("   ", 3),
            Err(ValidationError::MissingField("username".to_string()))
        );
        assert_eq!(
            validate_username("ab", 3),
            Err(ValidationError::TooShort {
                field: "username".to_string(),
                min: 3
            })
        );
    }

    #[test]
    fn test_validate_password_not_trimmed() {
        assert!(validate_password(" a ", 3).is_ok());
        assert_eq!(
            validate_password("", 3),
            Err(ValidationError::MissingField("password".to_string()))
        );
        assert!(validate_password("pw", 3).is_err());
    }

    #[test]
    fn test_length_counts_characters() {
        // Three Vietnamese characters, more than three bytes
        assert!(validate_username("Lộc", 3).is_ok());
        assert!(validate_username("ộc", 3).is_err());
    }

    #[test]
    fn test_validate_login_form_collects_errors() {
        assert!(validate_login_form("gv001", "secret", 3).is_ok());

        let single = validate_login_form("gv001", "", 3).unwrap_err();
        assert_eq!(single.field(), Some("password"));

        let both = validate_login_form("", "pw", 3).unwrap_err();
        match both {
            ValidationError::Form(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].field(), Some("username"));
                assert_eq!(errors[1].field(), Some("password"));
            }
            other => panic!("expected form error, got {other:?}"),
        }
    }
}
