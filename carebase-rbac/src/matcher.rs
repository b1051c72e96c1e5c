//! # Permission matching
//!
//! Decides whether a single permission covers a requested (resource, action)
//! pair. Only three shapes grant access:
//!
//! ```text
//! resource  action   matches
//! exact     exact    the same pair only
//! exact     *        any action on that resource
//! *         *        everything
//! ```
//!
//! `*` paired with a concrete action is not a wildcard shape; it only matches
//! a request for that literal pair.

use crate::permissions::{Permission, WILDCARD};

/// Tests whether a permission authorizes a requested resource and action.
pub trait PermissionMatcher: Send + Sync {
    /// Returns `true` if `permission` covers the request.
    fn matches(&self, permission: &Permission, resource: &str, action: &str) -> bool;
}

/// The standard exact / action-wildcard / full-wildcard matcher.
///
/// # Example
///
/// ```
/// use carebase_rbac::{Permission, PermissionMatcher, WildcardMatcher};
///
/// let any_patient = Permission::new("patient.all", "patient", "*");
/// assert!(WildcardMatcher.matches(&any_patient, "patient", "delete"));
/// assert!(!WildcardMatcher.matches(&any_patient, "billing", "delete"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct WildcardMatcher;

impl PermissionMatcher for WildcardMatcher {
    fn matches(&self, permission: &Permission, resource: &str, action: &str) -> bool {
        let resource_exact = permission.resource == resource;

        if resource_exact && permission.action == action {
            return true;
        }
        if resource_exact && permission.action == WILDCARD {
            return true;
        }
        permission.resource == WILDCARD && permission.action == WILDCARD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(resource: &str, action: &str) -> Permission {
        Permission::new(format!("{resource}:{action}"), resource, action)
    }

    #[test]
    fn test_exact_match() {
        let p = perm("billing", "read");
        assert!(WildcardMatcher.matches(&p, "billing", "read"));
        assert!(!WildcardMatcher.matches(&p, "billing", "write"));
        assert!(!WildcardMatcher.matches(&p, "patient", "read"));
    }

    #[test]
    fn test_action_wildcard() {
        let p = perm("patient", "*");
        assert!(WildcardMatcher.matches(&p, "patient", "read"));
        assert!(WildcardMatcher.matches(&p, "patient", "delete"));
        assert!(!WildcardMatcher.matches(&p, "billing", "delete"));
    }

    #[test]
    fn test_full_wildcard() {
        let p = perm("*", "*");
        assert!(WildcardMatcher.matches(&p, "patient", "read"));
        assert!(WildcardMatcher.matches(&p, "lab.order", "cancel"));
        assert!(WildcardMatcher.matches(&p, "*", "emergency_access"));
    }

    #[test]
    fn test_resource_wildcard_with_concrete_action_is_literal() {
        let p = perm("*", "emergency_access");
        assert!(!WildcardMatcher.matches(&p, "patient", "emergency_access"));
        assert!(!WildcardMatcher.matches(&p, "billing", "emergency_access"));
        assert!(WildcardMatcher.matches(&p, "*", "emergency_access"));
    }

    #[test]
    fn test_tags_are_case_sensitive() {
        let p = perm("patient", "read");
        assert!(!WildcardMatcher.matches(&p, "Patient", "read"));
        assert!(!WildcardMatcher.matches(&p, "patient", "READ"));
    }

    #[test]
    fn test_requested_wildcard_does_not_widen_exact_grant() {
        let p = perm("patient", "read");
        assert!(!WildcardMatcher.matches(&p, "patient", "*"));
        assert!(!WildcardMatcher.matches(&p, "*", "*"));
    }
}
