//! Error type shared by every Google Cloud call in the workspace.
//!
//! Google Cloud REST APIs report failures with a JSON envelope of the form
//! `{"error": {"code": N, "message": "...", "status": "..."}}`. [`GcpError`]
//! carries those fields plus the service and method that produced them, so a
//! failure printed at the top of a binary still says which call broke.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error returned by any Google Cloud request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcpError {
    /// HTTP status code (400, 403, 404, 409, 500, ...).
    pub code: u16,
    /// Human-readable error message.
    pub message: String,
    /// Canonical status string (`INVALID_ARGUMENT`, `ABORTED`, ...).
    pub status: String,
    /// Service that returned the error (`cloudtasks`, `datastore`, ...).
    pub service: String,
    /// API method that failed (`tasks.lease`, `projects.commit`, ...).
    pub method: Option<String>,
    /// Whether the caller may retry (429, 500, 503).
    pub retryable: bool,
}

impl fmt::Display for GcpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error [{}]: {} (HTTP {})",
            self.service, self.status, self.message, self.code
        )?;
        if let Some(ref method) = self.method {
            write!(f, " [method: {}]", method)?;
        }
        Ok(())
    }
}

impl std::error::Error for GcpError {}

fn is_retryable(code: u16) -> bool {
    matches!(code, 429 | 500 | 503)
}

impl GcpError {
    pub fn new(service: &str, code: u16, status: &str, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            status: status.to_string(),
            service: service.to_string(),
            method: None,
            retryable: is_retryable(code),
        }
    }

    /// Local failure that never reached the API (transport, decoding).
    pub fn internal(service: &str, msg: &str) -> Self {
        Self {
            code: 500,
            message: msg.to_string(),
            status: "INTERNAL".to_string(),
            service: service.to_string(),
            method: None,
            retryable: false,
        }
    }

    pub fn auth_error(msg: &str) -> Self {
        Self::new("auth", 401, "UNAUTHENTICATED", msg)
    }

    pub fn not_found(service: &str, msg: &str) -> Self {
        Self::new(service, 404, "NOT_FOUND", msg)
    }

    pub fn invalid_argument(service: &str, msg: &str) -> Self {
        Self::new(service, 400, "INVALID_ARGUMENT", msg)
    }

    pub fn deadline_exceeded(service: &str, msg: &str) -> Self {
        Self::new(service, 408, "DEADLINE_EXCEEDED", msg)
    }

    /// Parse an error envelope from a response body.
    ///
    /// Falls back to the raw body (truncated to 500 chars) when the body is
    /// not the standard envelope.
    pub fn from_api_response(service: &str, status_code: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ApiErrorInner {
            code: Option<u16>,
            message: Option<String>,
            status: Option<String>,
        }
        #[derive(Deserialize)]
        struct ApiErrorWrapper {
            error: Option<ApiErrorInner>,
        }

        if let Ok(ApiErrorWrapper { error: Some(err) }) =
            serde_json::from_str::<ApiErrorWrapper>(body)
        {
            let code = err.code.unwrap_or(status_code);
            return Self {
                code,
                message: err.message.unwrap_or_else(|| "Unknown error".to_string()),
                status: err.status.unwrap_or_else(|| "UNKNOWN".to_string()),
                service: service.to_string(),
                method: None,
                retryable: is_retryable(code),
            };
        }

        Self {
            code: status_code,
            message: if body.is_empty() {
                format!("HTTP {}", status_code)
            } else {
                body.chars().take(500).collect()
            },
            status: "UNKNOWN".to_string(),
            service: service.to_string(),
            method: None,
            retryable: is_retryable(status_code),
        }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }

    /// Concurrent transaction conflict (Datastore/Firestore commit).
    pub fn is_aborted(&self) -> bool {
        self.status == "ABORTED" || (self.code == 409 && self.status == "UNKNOWN")
    }

    pub fn is_not_found(&self) -> bool {
        self.code == 404 || self.status == "NOT_FOUND"
    }
}

pub type GcpResult<T> = Result<T, GcpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_envelope() {
        let body = r#"{"error":{"code":409,"message":"too much contention","status":"ABORTED"}}"#;
        let err =
            GcpError::from_api_response("datastore", 409, body).with_method("projects.commit");
        assert_eq!(err.code, 409);
        assert_eq!(err.status, "ABORTED");
        assert!(err.is_aborted());
        assert!(!err.retryable);
        assert!(err.to_string().contains("projects.commit"));
    }

    #[test]
    fn falls_back_to_raw_body() {
        let err = GcpError::from_api_response("cloudtasks", 503, "upstream connect error");
        assert_eq!(err.status, "UNKNOWN");
        assert_eq!(err.message, "upstream connect error");
        assert!(err.retryable);

        let empty = GcpError::from_api_response("cloudtasks", 404, "");
        assert_eq!(empty.message, "HTTP 404");
        assert!(empty.is_not_found());
    }
}
