//! HTTP implementation of the Authentication API.
//!
//! Talks to the face-attendance backend:
//!
//! - `POST {base}/auth/login` with a JSON `{username, password}` body
//! - `POST {base}/auth/forgot-password?username=<u>`
//!
//! Responses are classified for the login guard. Any non-2xx answer from the
//! backend is a rejection and counts as a failed attempt. Transport failures,
//! gateway errors (502, 503, 504) and unusable success bodies never reached
//! the credential check and are reported as failures that must not count
//! against the user.

use std::time::Duration;

use async_trait::async_trait;
use facelogin_core::{
    AuthSession, Error,
    repositories::{AuthApi, AuthApiError, LoginRequest},
};
use reqwest::{StatusCode, header};

/// Configuration for [`HttpAuthApi`].
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use facelogin_http::HttpAuthApiConfig;
///
/// let config = HttpAuthApiConfig::default()
///     .with_base_url("https://attendance.example.edu.vn/api")
///     .with_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct HttpAuthApiConfig {
    /// API root, without the trailing `/auth`
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for HttpAuthApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl HttpAuthApiConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`AuthApi`] over HTTP.
pub struct HttpAuthApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    pub fn new(config: HttpAuthApiConfig) -> Result<Self, Error> {
        let client = reqwest::ClientBuilder::new()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                tracing::error!(error = ?e, "Failed to build HTTP client");
                Error::Network(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, request: &LoginRequest) -> Result<AuthSession, AuthApiError> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .header(header::ACCEPT, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "Login request failed");
                AuthApiError::Transport(e.to_string())
            })?;

        let status = response.status();
        let is_json = is_json_response(&response);
        let body = response.bytes().await.map_err(|e| {
            tracing::error!(error = ?e, status = %status, "Failed to read login response");
            AuthApiError::Transport(e.to_string())
        })?;

        if status.is_success() {
            return parse_session(&body);
        }

        classify_failure(status, &body, is_json)
    }

    async fn forgot_password(&self, username: &str) -> Result<(), AuthApiError> {
        let response = self
            .client
            .post(self.url("/auth/forgot-password"))
            .query(&[("username", username)])
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "Forgot password request failed");
                AuthApiError::Transport(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let is_json = is_json_response(&response);
        let body = response.bytes().await.map_err(|e| {
            tracing::error!(error = ?e, status = %status, "Failed to read forgot password response");
            AuthApiError::Transport(e.to_string())
        })?;

        classify_failure(status, &body, is_json)
    }
}

fn is_json_response(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"))
}

/// Decode a 2xx login body, insisting on a token and a role.
fn parse_session(body: &[u8]) -> Result<AuthSession, AuthApiError> {
    let session: AuthSession = serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(error = %e, "Login succeeded with an unreadable body");
        AuthApiError::MalformedResponse(e.to_string())
    })?;

    if session.access_token.trim().is_empty() {
        return Err(AuthApiError::MalformedResponse(
            "accessToken is empty".to_string(),
        ));
    }
    if session.user.vai_tro.trim().is_empty() {
        return Err(AuthApiError::MalformedResponse(
            "user.vaiTro is empty".to_string(),
        ));
    }

    Ok(session)
}

/// Whether the status comes from a proxy in front of an unreachable backend.
fn is_gateway_failure(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

fn classify_failure<T>(status: StatusCode, body: &[u8], is_json: bool) -> Result<T, AuthApiError> {
    let message = error_message(body, is_json);

    if is_gateway_failure(status) {
        tracing::warn!(status = %status, "Authentication API is unavailable");
        return Err(AuthApiError::Transport(format!(
            "gateway error {}: {}",
            status.as_u16(),
            message.as_deref().unwrap_or("no message")
        )));
    }

    Err(AuthApiError::Rejected {
        status: Some(status.as_u16()),
        message,
    })
}

/// Extract a user-facing message from an error body.
///
/// JSON bodies contribute their `message` field; anything else is used as
/// plain text. Blank messages are dropped.
fn error_message(body: &[u8], is_json: bool) -> Option<String> {
    if is_json {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
            return value
                .get("message")
                .and_then(|m| m.as_str())
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty());
        }
    }

    let text = String::from_utf8_lossy(body).trim().to_string();
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_from_json() {
        let body = br#"{"message":"Sai mat khau","status":401}"#;
        assert_eq!(error_message(body, true).as_deref(), Some("Sai mat khau"));
        assert_eq!(error_message(br#"{"error":"x"}"#, true), None);
    }

    #[test]
    fn test_error_message_from_text() {
        assert_eq!(
            error_message(b"  Account disabled \n", false).as_deref(),
            Some("Account disabled")
        );
        assert_eq!(error_message(b"   ", false), None);
        // Declared JSON that is not JSON falls back to text
        assert_eq!(error_message(b"Bad gateway", true).as_deref(), Some("Bad gateway"));
    }

    #[test]
    fn test_parse_session_requires_token_and_role() {
        let ok = br#"{"accessToken":"a.b.c","user":{"username":"ad","vaiTro":"ADMIN"}}"#;
        assert_eq!(parse_session(ok).unwrap().access_token, "a.b.c");

        let no_token = br#"{"user":{"vaiTro":"ADMIN"}}"#;
        assert!(matches!(
            parse_session(no_token),
            Err(AuthApiError::MalformedResponse(_))
        ));

        let empty_token = br#"{"accessToken":"","user":{"vaiTro":"ADMIN"}}"#;
        assert!(matches!(
            parse_session(empty_token),
            Err(AuthApiError::MalformedResponse(_))
        ));

        let no_role = br#"{"accessToken":"a.b.c","user":{"username":"ad"}}"#;
        assert!(matches!(
            parse_session(no_role),
            Err(AuthApiError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_classify_failure() {
        let rejected: Result<(), _> =
            classify_failure(StatusCode::UNAUTHORIZED, br#"{"message":"nope"}"#, true);
        assert_eq!(
            rejected,
            Err(AuthApiError::Rejected {
                status: Some(401),
                message: Some("nope".to_string()),
            })
        );

        // A backend error still answered the login and counts
        let server: Result<(), _> =
            classify_failure(StatusCode::INTERNAL_SERVER_ERROR, b"boom", false);
        assert_eq!(
            server,
            Err(AuthApiError::Rejected {
                status: Some(500),
                message: Some("boom".to_string()),
            })
        );

        for status in [
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::GATEWAY_TIMEOUT,
        ] {
            let gateway: Result<(), _> = classify_failure(status, b"", false);
            assert!(matches!(gateway, Err(AuthApiError::Transport(_))), "{status}");
        }
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let api = HttpAuthApi::new(
            HttpAuthApiConfig::default().with_base_url("http://localhost:8080/api/"),
        )
        .unwrap();
        assert_eq!(api.base_url(), "http://localhost:8080/api");
        assert_eq!(api.url("/auth/login"), "http://localhost:8080/api/auth/login");
    }
}
