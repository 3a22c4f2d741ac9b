/// Unified error types for the namegate resolution chain
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type shared by the gateway, resolver and registry layers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// Malformed request shape, rejected at the HTTP boundary
    #[error("Invalid request: {0}")]
    InvalidInput(String),

    /// No registry endpoint configured for this process
    #[error("Registry not configured")]
    Unconfigured,

    /// Registry holds no value for the (domain, recordType) pair
    #[error("Record not found")]
    NotFound,

    /// Caller is not allowed to perform a registry mutation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Domain registration period has elapsed
    #[error("Domain expired: {0}")]
    DomainExpired(String),

    /// Domain was never registered
    #[error("Domain not registered: {0}")]
    DomainNotRegistered(String),

    /// Domain is registered and still active
    #[error("Domain already registered: {0}")]
    DomainTaken(String),

    /// Upstream I/O failure or timeout. The detail is for logs only.
    #[error("Resolution failed: {0}")]
    ResolutionFailed(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NameError {
    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            NameError::InvalidInput(_) => "invalid_input",
            NameError::Unconfigured => "unconfigured",
            NameError::NotFound => "not_found",
            NameError::Unauthorized(_) => "unauthorized",
            NameError::DomainExpired(_) => "domain_expired",
            NameError::DomainNotRegistered(_) => "domain_not_registered",
            NameError::DomainTaken(_) => "domain_taken",
            NameError::ResolutionFailed(_) => "resolution_failed",
            NameError::RateLimitExceeded => "rate_limited",
            NameError::Internal(_) => "internal",
        }
    }
}

impl From<std::io::Error> for NameError {
    fn from(e: std::io::Error) -> Self {
        NameError::Internal(format!("IO error: {}", e))
    }
}

/// JSON error body returned by every role
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for NameError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            NameError::InvalidInput(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            NameError::Unauthorized(_) => (
                StatusCode::FORBIDDEN,
                "Unauthorized",
                self.to_string(),
            ),
            NameError::NotFound => (
                StatusCode::NOT_FOUND,
                "NotFound",
                self.to_string(),
            ),
            NameError::DomainNotRegistered(_) => (
                StatusCode::NOT_FOUND,
                "DomainNotRegistered",
                self.to_string(),
            ),
            NameError::DomainTaken(_) => (
                StatusCode::CONFLICT,
                "DomainTaken",
                self.to_string(),
            ),
            NameError::DomainExpired(_) => (
                StatusCode::GONE,
                "DomainExpired",
                self.to_string(),
            ),
            NameError::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "RateLimitExceeded",
                self.to_string(),
            ),
            NameError::ResolutionFailed(_) => (
                StatusCode::BAD_GATEWAY,
                "UpstreamFailure",
                "Resolution failed".to_string(), // Don't leak upstream details
            ),
            NameError::Unconfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "ServiceUnavailable",
                "Registry not configured".to_string(),
            ),
            NameError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for namegate operations
pub type NameResult<T> = Result<T, NameError>;
