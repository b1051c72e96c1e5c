//! # Permissions
//!
//! Core permission type and the immutable permission catalog.
//! A permission grants one resource + action pair, optionally narrowed by
//! attribute conditions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::condition::Conditions;
use crate::error::{RbacError, RbacResult};

/// Sentinel standing for "any value" in the resource or action position.
pub const WILDCARD: &str = "*";

/// An atomic grant of one (resource, action) pair.
///
/// # Example
///
/// ```
/// use carebase_rbac::permissions::Permission;
///
/// let perm = Permission::new("lab.result.update", "lab.result", "update")
///     .with_condition("departmentId", "D1");
/// assert_eq!(perm.to_string(), "lab.result:update");
/// assert!(perm.is_conditional());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permission {
    /// Unique permission identifier.
    pub id: String,
    /// Resource tag, or `*`.
    pub resource: String,
    /// Action tag, or `*`.
    pub action: String,
    /// Optional attribute conditions. Absent means unconditional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Conditions>,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

impl Permission {
    /// Create an unconditional permission.
    pub fn new(
        id: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            resource: resource.into(),
            action: action.into(),
            conditions: None,
            description: String::new(),
        }
    }

    /// Add an attribute condition.
    pub fn with_condition(
        mut self,
        key: impl Into<String>,
        value: impl Into<crate::condition::ScalarValue>,
    ) -> Self {
        self.conditions
            .get_or_insert_with(Conditions::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Check if this permission carries any conditions.
    pub fn is_conditional(&self) -> bool {
        self.conditions.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Deduplication identity: (resource, action, conditions).
    ///
    /// An empty condition map is the same grant as no conditions at all.
    pub fn grant_key(&self) -> GrantKey {
        GrantKey {
            resource: self.resource.clone(),
            action: self.action.clone(),
            conditions: self.conditions.clone().filter(|c| !c.is_empty()),
        }
    }

    pub(crate) fn validate(&self) -> RbacResult<()> {
        if self.id.trim().is_empty() {
            return Err(RbacError::Validation(
                "permission id must not be empty".to_string(),
            ));
        }
        if self.resource.trim().is_empty() {
            return Err(RbacError::Validation(format!(
                "permission `{}` has an empty resource",
                self.id
            )));
        }
        if self.action.trim().is_empty() {
            return Err(RbacError::Validation(format!(
                "permission `{}` has an empty action",
                self.id
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

/// Identity of a grant for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GrantKey {
    resource: String,
    action: String,
    conditions: Option<Conditions>,
}

/// Immutable lookup of permission definitions by id.
#[derive(Debug, Clone, Default)]
pub struct PermissionCatalog {
    permissions: Vec<Permission>,
    by_id: HashMap<String, usize>,
}

impl PermissionCatalog {
    /// Build a catalog, validating every entry.
    ///
    /// # Errors
    ///
    /// `RbacError::Validation` if an id is empty or duplicated, or a resource
    /// or action is empty.
    pub fn new(permissions: Vec<Permission>) -> RbacResult<Self> {
        let mut by_id = HashMap::with_capacity(permissions.len());
        for (idx, perm) in permissions.iter().enumerate() {
            perm.validate()?;
            if by_id.insert(perm.id.clone(), idx).is_some() {
                return Err(RbacError::Validation(format!(
                    "duplicate permission id `{}`",
                    perm.id
                )));
            }
        }
        Ok(Self { permissions, by_id })
    }

    /// Look up a permission by id.
    pub fn get(&self, id: &str) -> RbacResult<&Permission> {
        self.by_id
            .get(id)
            .map(|&idx| &self.permissions[idx])
            .ok_or_else(|| RbacError::permission_not_found(id))
    }

    /// All permissions in authoring order.
    pub fn all(&self) -> impl Iterator<Item = &Permission> + '_ {
        self.permissions.iter()
    }

    /// Check if a permission id is defined.
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Number of permissions.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}
