//! Provider-specific error types
//!
//! ProviderError는 팀 서버 REST API 관련 세부 에러를 관리합니다.
//! elite_foundation::Error와의 변환을 지원합니다.

use elite_foundation::Error as FoundationError;
use thiserror::Error;

/// Errors that can occur while talking to the team server
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Token is missing or rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Lookup returned nothing (404 or `null` body)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (bad parameters)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Server error (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Network error (connection failed, DNS, TLS, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Client not configured (missing token, bad base URL)
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// Create from HTTP status code and body
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => ProviderError::Authentication(body.to_string()),
            404 => ProviderError::NotFound(body.to_string()),
            400 | 409 | 422 => ProviderError::InvalidRequest(body.to_string()),
            500..=599 => ProviderError::ServerError(body.to_string()),
            _ => ProviderError::Unknown(format!("HTTP {}: {}", status, body)),
        }
    }
}

// ============================================================================
// elite_foundation::Error 변환
// ============================================================================

impl From<ProviderError> for FoundationError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => FoundationError::NotFound(msg),
            ProviderError::Network(msg) => FoundationError::Http(format!("Network: {}", msg)),
            ProviderError::NotConfigured(msg) => FoundationError::Config(msg),
            // body of the server response is surfaced verbatim
            ProviderError::Authentication(msg)
            | ProviderError::InvalidRequest(msg)
            | ProviderError::ServerError(msg)
            | ProviderError::Unknown(msg) => FoundationError::Remote(msg),
            ProviderError::InvalidResponse(msg) => {
                FoundationError::Remote(format!("Invalid response: {}", msg))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            ProviderError::from_http_status(401, "denied"),
            ProviderError::Authentication(_)
        ));
        assert!(matches!(
            ProviderError::from_http_status(404, ""),
            ProviderError::NotFound(_)
        ));
        assert!(matches!(
            ProviderError::from_http_status(503, "down"),
            ProviderError::ServerError(_)
        ));
    }

    #[test]
    fn test_conversion_keeps_server_message() {
        let err: FoundationError = ProviderError::from_http_status(400, "Invalid GruntId").into();
        assert!(matches!(err, FoundationError::Remote(_)));
        assert_eq!(err.to_string(), "Remote operation failed: Invalid GruntId");

        let err: FoundationError = ProviderError::NotFound("grunt x".into()).into();
        assert!(matches!(err, FoundationError::NotFound(_)));
    }
}
