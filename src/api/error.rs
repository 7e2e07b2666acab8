//! Error taxonomy for the API client.
//!
//! Four classes of failure, matching what callers need to distinguish:
//! network errors surface immediately, a 401 drives the refresh protocol,
//! a failed refresh becomes `SessionExpired` (callers must force logout and
//! redirect to sign-in), and every other error status passes the remote
//! payload through verbatim so field-keyed validation messages survive.

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// No response received. Never retried by this client.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend rejected the presented access token and the one-shot
    /// retry has already been spent.
    #[error("Unauthorized - access token rejected")]
    Unauthorized,

    /// Refresh itself failed; the session has been cleared. Callers should
    /// redirect to an unauthenticated entry point.
    #[error("Session expired - sign in again")]
    SessionExpired,

    /// Any other error status. The payload is the remote response body,
    /// unmodified (parsed JSON when possible, raw text otherwise).
    #[error("API error (status {status}): {payload}")]
    Remote { status: u16, payload: Value },

    /// A success status carrying a body this client could not decode.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for non-JSON error bodies carried in error values
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Error for a non-success response on the refresh-protocol path:
    /// 401 maps to `Unauthorized`, everything else passes through.
    pub(crate) fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            ApiError::Unauthorized
        } else {
            Self::remote(status, body)
        }
    }

    /// Error carrying the remote payload verbatim. Used for login/register
    /// failures, where a 401 means rejected credentials rather than an
    /// expired session.
    pub(crate) fn remote(status: reqwest::StatusCode, body: &str) -> Self {
        let payload = serde_json::from_str(body)
            .unwrap_or_else(|_| Value::String(Self::truncate_body(body)));
        ApiError::Remote {
            status: status.as_u16(),
            payload,
        }
    }

    /// Field-keyed validation errors, when the remote payload is an object.
    pub fn field_errors(&self) -> Option<&serde_json::Map<String, Value>> {
        match self {
            ApiError::Remote {
                payload: Value::Object(map),
                ..
            } => Some(map),
            _ => None,
        }
    }

    /// Truncate a response body to avoid carrying excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            // Back off to a char boundary so multibyte bodies never panic
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..end],
                body.len()
            )
        }
    }
}
