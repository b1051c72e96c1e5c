//! Error types for catalog loading and access decisions
//!
//! Load-time errors (validation, cycles, document parsing) are fatal to the
//! load attempt that raised them. Runtime errors (lookups, decision faults)
//! never escape `decide` as a grant: the decision service converts them into
//! a deny.

use thiserror::Error;

/// RBAC engine error types.
#[derive(Debug, Error)]
pub enum RbacError {
    /// A catalog entry is structurally invalid
    #[error("Invalid catalog: {0}")]
    Validation(String),

    /// The role inheritance graph contains a cycle
    #[error("Cyclic role inheritance: {}", .cycle.join(" -> "))]
    Cycle {
        /// Role ids forming the cycle, in traversal order
        cycle: Vec<String>,
    },

    /// An identifier is absent from the active snapshot
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What was looked up ("role" or "permission")
        kind: &'static str,
        /// The missing identifier
        id: String,
    },

    /// Unexpected failure while evaluating a decision
    #[error("Decision fault: {0}")]
    DecisionFault(String),

    /// The catalog document is not valid JSON for the expected shape
    #[error("Malformed catalog document: {0}")]
    CatalogParse(#[from] serde_json::Error),

    /// The catalog document could not be read
    #[error("Failed to read catalog `{path}`")]
    CatalogIo {
        /// Path that was read
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Engine configuration is invalid
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for RBAC operations.
pub type RbacResult<T> = Result<T, RbacError>;

impl RbacError {
    pub(crate) fn role_not_found(id: impl Into<String>) -> Self {
        RbacError::NotFound {
            kind: "role",
            id: id.into(),
        }
    }

    pub(crate) fn permission_not_found(id: impl Into<String>) -> Self {
        RbacError::NotFound {
            kind: "permission",
            id: id.into(),
        }
    }

    /// Check if this error indicates a fault in the engine or its host
    /// rather than in the supplied configuration.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            RbacError::DecisionFault(_) | RbacError::CatalogIo { .. }
        )
    }

    /// Get a stable error code for logs and admin APIs.
    pub fn error_code(&self) -> &'static str {
        match self {
            RbacError::Validation(_) => "VALIDATION_ERROR",
            RbacError::Cycle { .. } => "CYCLE_ERROR",
            RbacError::NotFound { .. } => "NOT_FOUND",
            RbacError::DecisionFault(_) => "DECISION_FAULT",
            RbacError::CatalogParse(_) => "CATALOG_PARSE_ERROR",
            RbacError::CatalogIo { .. } => "CATALOG_IO_ERROR",
            RbacError::ConfigError(_) => "CONFIG_ERROR",
        }
    }
}
