//! Error types for request authorization
//!
//! These errors are what a protected endpoint hands back to its caller.
//! Their messages are deliberately generic: matched permissions, decision
//! reasons and fault details stay in logs and audit records.

use thiserror::Error;

/// Authorization guard error types.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The principal is not authorized for this operation
    #[error("Not authorized")]
    Forbidden,

    /// The endpoint has no (resource, action) binding
    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    /// The audit sink rejected a record
    #[error("Audit error: {0}")]
    Audit(String),
}

/// Result type for guard operations.
pub type GuardResult<T> = Result<T, GuardError>;

impl GuardError {
    /// Check if this error should be logged at error level.
    ///
    /// Denials are expected and are not server errors.
    pub fn is_server_error(&self) -> bool {
        matches!(self, GuardError::Audit(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GuardError::Forbidden => 403,
            GuardError::UnknownRoute(_) => 404,
            GuardError::Audit(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            GuardError::Forbidden => "FORBIDDEN",
            GuardError::UnknownRoute(_) => "UNKNOWN_ROUTE",
            GuardError::Audit(_) => "AUDIT_ERROR",
        }
    }
}
