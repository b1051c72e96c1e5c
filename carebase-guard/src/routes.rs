//! Endpoint to (resource, action) bindings.
//!
//! Each protected endpoint is bound once, at startup, to the resource and
//! action tags it requires. Endpoints are keyed by a free-form string such as
//! `"GET /patients/{id}"`; the guard never guesses a binding.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{GuardError, GuardResult};

/// Resource and action required by an endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RouteBinding {
    /// Resource tag
    pub resource: String,
    /// Action tag
    pub action: String,
}

impl RouteBinding {
    /// Create a binding.
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
        }
    }
}

/// Static mapping from endpoint keys to bindings.
///
/// # Example
///
/// ```
/// use carebase_guard::RouteTable;
///
/// let routes = RouteTable::new()
///     .bind("GET /patients/{id}", "patient", "read")
///     .bind("POST /lab/results/{id}/approve", "lab.result", "approve");
///
/// assert_eq!(routes.lookup("GET /patients/{id}").unwrap().action, "read");
/// assert!(routes.lookup("DELETE /everything").is_err());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteTable {
    routes: HashMap<String, RouteBinding>,
}

impl RouteTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an endpoint. A later binding for the same key replaces the earlier one.
    pub fn bind(
        mut self,
        endpoint: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        self.routes
            .insert(endpoint.into(), RouteBinding::new(resource, action));
        self
    }

    /// Look up the binding for an endpoint.
    pub fn lookup(&self, endpoint: &str) -> GuardResult<&RouteBinding> {
        self.routes
            .get(endpoint)
            .ok_or_else(|| GuardError::UnknownRoute(endpoint.to_string()))
    }

    /// Number of bound endpoints.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
