//! Client error types

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use shared::error::{ApiResponse, ErrorCode};
use shared::message::TopicError;
use thiserror::Error;

/// Error body returned by the server (`ApiResponse` without data)
#[derive(Debug, Clone, PartialEq)]
pub struct ApiFailure {
    pub code: Option<ErrorCode>,
    pub message: String,
    pub details: Option<HashMap<String, Value>>,
}

impl ApiFailure {
    /// Best-effort parse; a non-JSON body becomes the message as-is
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<ApiResponse<Value>>(body) {
            Ok(resp) => Self {
                code: resp.code.and_then(|c| ErrorCode::try_from(c).ok()),
                message: resp.message,
                details: resp.details,
            },
            Err(_) => Self {
                code: None,
                message: body.to_string(),
                details: None,
            },
        }
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.as_ref()?.get(key)
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "[{}] {}", code.code(), self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication required (401)
    #[error("Authentication required: {0}")]
    Unauthorized(ApiFailure),

    /// Permission denied (403)
    #[error("Permission denied: {0}")]
    Forbidden(ApiFailure),

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(ApiFailure),

    /// Validation error (400 / 422)
    #[error("Validation error: {0}")]
    Validation(ApiFailure),

    /// Conflict (409), e.g. an illegal or lost status transition
    #[error("Conflict: {0}")]
    Conflict(ApiFailure),

    /// Any other non-success status
    #[error("Server error ({status}): {failure}")]
    Server { status: u16, failure: ApiFailure },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Bus connection could not be established
    #[error("Message bus connection failed: {0}")]
    Connection(String),

    /// Invalid subscription pattern
    #[error("Invalid topic pattern: {0}")]
    Topic(#[from] TopicError),
}

impl ClientError {
    /// Map a non-success HTTP status and body to an error
    pub fn from_status(status: u16, body: &str) -> Self {
        let failure = ApiFailure::from_body(body);
        match status {
            401 => ClientError::Unauthorized(failure),
            403 => ClientError::Forbidden(failure),
            404 => ClientError::NotFound(failure),
            400 | 422 => ClientError::Validation(failure),
            409 => ClientError::Conflict(failure),
            _ => ClientError::Server { status, failure },
        }
    }

    /// Server error body, if this error came from one
    pub fn failure(&self) -> Option<&ApiFailure> {
        match self {
            ClientError::Unauthorized(f)
            | ClientError::Forbidden(f)
            | ClientError::NotFound(f)
            | ClientError::Validation(f)
            | ClientError::Conflict(f)
            | ClientError::Server { failure: f, .. } => Some(f),
            _ => None,
        }
    }

    /// Structured error code reported by the server, if any
    pub fn code(&self) -> Option<ErrorCode> {
        self.failure().and_then(|f| f.code)
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_parses_api_body() {
        let code = ErrorCode::PriceMismatch.code();
        let body = format!(
            r#"{{"code":{},"message":"total mismatch","details":{{"declaredCents":100,"computedCents":120}}}}"#,
            code
        );
        let err = ClientError::from_status(400, &body);
        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(err.code(), Some(ErrorCode::PriceMismatch));
        let failure = err.failure().unwrap();
        assert_eq!(failure.detail("computedCents"), Some(&Value::from(120)));
    }

    #[test]
    fn test_from_status_plain_body() {
        let err = ClientError::from_status(502, "bad gateway");
        match err {
            ClientError::Server { status, failure } => {
                assert_eq!(status, 502);
                assert_eq!(failure.code, None);
                assert_eq!(failure.message, "bad gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            ClientError::from_status(409, "{}"),
            ClientError::Conflict(_)
        ));
    }
}
