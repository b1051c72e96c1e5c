//! # Roles
//!
//! Role definitions and the immutable role catalog. A role bundles an ordered
//! list of permissions and may inherit the effective permissions of other
//! roles in the same catalog.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{RbacError, RbacResult};
use crate::permissions::Permission;

/// A named, inheritable bundle of permissions.
///
/// # Examples
///
/// ```
/// use carebase_rbac::{Permission, Role};
///
/// let tech = Role::new("lab_technician", "Lab Technician")
///     .with_permission(Permission::new("lab.result.update", "lab.result", "update"));
///
/// let manager = Role::new("lab_manager", "Lab Manager")
///     .inheriting("lab_technician")
///     .with_priority(20);
///
/// assert_eq!(manager.inherits, vec!["lab_technician".to_string()]);
/// assert!(tech.is_active);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    /// Unique role identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Own permissions, in authoring order
    #[serde(default)]
    pub permissions: Vec<Permission>,
    /// Ids of roles this role inherits from
    #[serde(default)]
    pub inherits: Vec<String>,
    /// Informational ranking; not used by decisions
    #[serde(default)]
    pub priority: i32,
    /// Whether the role may be assigned to a principal
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Role {
    /// Create an active role with no permissions.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            permissions: Vec::new(),
            inherits: Vec::new(),
            priority: 0,
            is_active: true,
        }
    }

    /// Add an own permission.
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }

    /// Inherit from another role.
    pub fn inheriting(mut self, role_id: impl Into<String>) -> Self {
        self.inherits.push(role_id.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the informational priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Mark the role inactive (not assignable).
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Immutable lookup of role definitions by id.
///
/// Construction checks that ids are unique and that every `inherits` entry
/// names a role in the same catalog. Cycles are detected by the resolver.
#[derive(Debug, Clone, Default)]
pub struct RoleCatalog {
    roles: Vec<Role>,
    by_id: HashMap<String, usize>,
}

impl RoleCatalog {
    /// Build a catalog, validating ids, embedded permissions and inheritance
    /// references.
    pub fn new(roles: Vec<Role>) -> RbacResult<Self> {
        let mut by_id = HashMap::with_capacity(roles.len());
        for (idx, role) in roles.iter().enumerate() {
            if role.id.trim().is_empty() {
                return Err(RbacError::Validation("role id must not be empty".to_string()));
            }
            if by_id.insert(role.id.clone(), idx).is_some() {
                return Err(RbacError::Validation(format!(
                    "duplicate role id `{}`",
                    role.id
                )));
            }
            for perm in &role.permissions {
                perm.validate().map_err(|e| {
                    RbacError::Validation(format!("role `{}`: {}", role.id, validation_detail(e)))
                })?;
            }
        }

        for role in &roles {
            if let Some(missing) = role.inherits.iter().find(|id| !by_id.contains_key(*id)) {
                return Err(RbacError::Validation(format!(
                    "role `{}` inherits unknown role `{}`",
                    role.id, missing
                )));
            }
        }

        Ok(Self { roles, by_id })
    }

    /// Look up a role by id.
    pub fn get(&self, id: &str) -> RbacResult<&Role> {
        self.by_id
            .get(id)
            .map(|&idx| &self.roles[idx])
            .ok_or_else(|| RbacError::role_not_found(id))
    }

    /// Look up a role that may be assigned to a principal.
    ///
    /// Returns `None` for unknown and inactive roles. Resolution ignores
    /// activity; this is for the layer that assigns roles.
    pub fn assignable(&self, id: &str) -> Option<&Role> {
        self.get(id).ok().filter(|role| role.is_active)
    }

    /// All roles in authoring order.
    pub fn all(&self) -> impl Iterator<Item = &Role> + '_ {
        self.roles.iter()
    }

    /// Check if a role id is defined.
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Number of roles.
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

fn validation_detail(err: RbacError) -> String {
    match err {
        RbacError::Validation(detail) => detail,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(id: &str, resource: &str, action: &str) -> Permission {
        Permission::new(id, resource, action)
    }

    #[test]
    fn test_catalog_lookup_and_order() {
        let catalog = RoleCatalog::new(vec![
            Role::new("nurse", "Nurse").with_permission(perm("p1", "patient", "read")),
            Role::new("doctor", "Doctor").inheriting("nurse"),
        ])
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("doctor").unwrap().inherits, vec!["nurse"]);
        let ids: Vec<&str> = catalog.all().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["nurse", "doctor"]);
        assert!(matches!(
            catalog.get("janitor"),
            Err(RbacError::NotFound { kind: "role", .. })
        ));
    }

    #[test]
    fn test_unknown_inherit_is_validation_error() {
        let err = RoleCatalog::new(vec![Role::new("doctor", "Doctor").inheriting("nurse")])
            .unwrap_err();
        assert!(matches!(err, RbacError::Validation(_)));
        assert!(err.to_string().contains("unknown role `nurse`"));
    }

    #[test]
    fn test_duplicate_role_id() {
        let err = RoleCatalog::new(vec![Role::new("a", "A"), Role::new("a", "A again")])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate role id"));
    }

    #[test]
    fn test_embedded_permission_validated() {
        let err = RoleCatalog::new(vec![
            Role::new("a", "A").with_permission(perm("p", "patient", ""))
        ])
        .unwrap_err();
        assert!(err.to_string().contains("role `a`"));
    }

    #[test]
    fn test_cycles_are_not_rejected_by_catalog() {
        let catalog = RoleCatalog::new(vec![
            Role::new("x", "X").inheriting("y"),
            Role::new("y", "Y").inheriting("x"),
        ]);
        assert!(catalog.is_ok());
    }

    #[test]
    fn test_assignable_skips_inactive() {
        let catalog = RoleCatalog::new(vec![
            Role::new("active", "Active"),
            Role::new("retired", "Retired").deactivated(),
        ])
        .unwrap();
        assert!(catalog.assignable("active").is_some());
        assert!(catalog.assignable("retired").is_none());
        assert!(catalog.assignable("ghost").is_none());
        assert!(catalog.get("retired").is_ok());
    }

    #[test]
    fn test_role_deserialize_defaults() {
        let role: Role = serde_json::from_str(r#"{"id":"r","name":"R"}"#).unwrap();
        assert!(role.is_active);
        assert_eq!(role.priority, 0);
        assert!(role.inherits.is_empty());
    }
}
