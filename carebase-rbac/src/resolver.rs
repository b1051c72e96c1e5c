//! # Role resolution
//!
//! Flattens role inheritance into effective permission sets.
//!
//! ```text
//! lab_manager ──inherits──▶ lab_technician
//!   own: lab.result:approve   own: lab.result:update
//!
//! resolve(lab_manager) = [lab.result:approve, lab.result:update]
//! ```
//!
//! Resolution is a depth-first walk carrying the current path; meeting a role
//! that is already on the path is a cycle. Completed sets are memoized per
//! role. The cache belongs to one catalog snapshot, so a reload starts from an
//! empty cache.

use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{RbacError, RbacResult};
use crate::permissions::{GrantKey, Permission};
use crate::roles::{Role, RoleCatalog};

/// The resolved, deduplicated permission set of one role.
///
/// Order: the role's own permissions as authored, then each inherited role's
/// effective set in `inherits` order. The first occurrence of a grant wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectivePermissions {
    role_id: String,
    permissions: Vec<Permission>,
}

impl EffectivePermissions {
    /// Role this set was resolved for.
    pub fn role_id(&self) -> &str {
        &self.role_id
    }

    /// Iterate over the effective permissions.
    pub fn iter(&self) -> impl Iterator<Item = &Permission> + '_ {
        self.permissions.iter()
    }

    /// Effective permissions as a slice.
    pub fn as_slice(&self) -> &[Permission] {
        &self.permissions
    }

    /// Number of distinct grants.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Check if an equivalent grant (same resource, action and conditions)
    /// is in the set.
    pub fn contains(&self, permission: &Permission) -> bool {
        let key = permission.grant_key();
        self.permissions.iter().any(|p| p.grant_key() == key)
    }

    /// Check if every grant of `other` is also in this set.
    pub fn is_superset_of(&self, other: &EffectivePermissions) -> bool {
        let ours: HashSet<GrantKey> = self.permissions.iter().map(Permission::grant_key).collect();
        other.permissions.iter().all(|p| ours.contains(&p.grant_key()))
    }
}

/// Accumulates permissions in order, dropping repeated grants.
#[derive(Default)]
struct GrantAccumulator {
    seen: HashSet<GrantKey>,
    permissions: Vec<Permission>,
}

impl GrantAccumulator {
    fn push(&mut self, permission: &Permission) {
        if self.seen.insert(permission.grant_key()) {
            self.permissions.push(permission.clone());
        }
    }

    fn extend(&mut self, inherited: &EffectivePermissions) {
        for perm in inherited.iter() {
            self.push(perm);
        }
    }
}

/// A role whose inherited sets are still being merged.
struct Frame<'a> {
    role: &'a Role,
    next_parent: usize,
    acc: GrantAccumulator,
}

/// Roles on the current traversal path.
#[derive(Default)]
struct TraversalPath {
    order: Vec<String>,
    members: HashSet<String>,
}

impl TraversalPath {
    fn enter(&mut self, role_id: &str) -> RbacResult<()> {
        if self.members.contains(role_id) {
            let start = self
                .order
                .iter()
                .position(|id| id == role_id)
                .unwrap_or_default();
            return Err(RbacError::Cycle {
                cycle: self.order[start..].to_vec(),
            });
        }
        self.members.insert(role_id.to_string());
        self.order.push(role_id.to_string());
        Ok(())
    }

    fn leave(&mut self) {
        if let Some(id) = self.order.pop() {
            self.members.remove(&id);
        }
    }
}

/// Computes and memoizes effective permission sets for one role catalog.
#[derive(Debug)]
pub struct RoleResolver {
    roles: Arc<RoleCatalog>,
    cache: DashMap<String, Arc<EffectivePermissions>>,
}

impl RoleResolver {
    /// Create a resolver with an empty cache.
    pub fn new(roles: Arc<RoleCatalog>) -> Self {
        Self {
            roles,
            cache: DashMap::new(),
        }
    }

    /// The catalog this resolver reads.
    pub fn roles(&self) -> &RoleCatalog {
        &self.roles
    }

    /// Resolve the effective permission set of a role.
    ///
    /// # Errors
    ///
    /// - `RbacError::NotFound` if the role (or an inherited role) is unknown
    /// - `RbacError::Cycle` if inheritance loops back onto the current path
    pub fn resolve(&self, role_id: &str) -> RbacResult<Arc<EffectivePermissions>> {
        if let Some(hit) = self.cache.get(role_id) {
            return Ok(Arc::clone(hit.value()));
        }
        self.resolve_uncached(role_id)
    }

    /// Resolve every role in the catalog, populating the cache.
    ///
    /// Used at load time so that a cycle anywhere in the graph fails the load.
    pub fn resolve_all(&self) -> RbacResult<()> {
        for role in self.roles.all() {
            self.resolve(&role.id)?;
        }
        Ok(())
    }

    /// Number of memoized roles.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Iterative depth-first walk. Each frame is a role whose parents are
    /// still being merged; the explicit stack keeps arbitrarily deep
    /// inheritance chains off the thread stack.
    fn resolve_uncached(&self, role_id: &str) -> RbacResult<Arc<EffectivePermissions>> {
        let mut path = TraversalPath::default();
        path.enter(role_id)?;
        let mut stack = vec![self.open_frame(role_id)?];

        while let Some(mut frame) = stack.pop() {
            let role = frame.role;
            if let Some(parent) = role.inherits.get(frame.next_parent) {
                frame.next_parent += 1;
                path.enter(parent)?;
                match self.cached(parent) {
                    Some(hit) => {
                        path.leave();
                        frame.acc.extend(&hit);
                        stack.push(frame);
                    }
                    None => {
                        let parent_frame = self.open_frame(parent)?;
                        stack.push(frame);
                        stack.push(parent_frame);
                    }
                }
                continue;
            }

            path.leave();
            let resolved = self.memoize(frame);
            match stack.last_mut() {
                Some(heir) => heir.acc.extend(&resolved),
                None => return Ok(resolved),
            }
        }

        // The root frame is always the last one popped.
        Err(RbacError::role_not_found(role_id))
    }

    fn open_frame(&self, role_id: &str) -> RbacResult<Frame<'_>> {
        let role = self.roles.get(role_id)?;
        let mut acc = GrantAccumulator::default();
        for perm in &role.permissions {
            acc.push(perm);
        }
        Ok(Frame {
            role,
            next_parent: 0,
            acc,
        })
    }

    fn cached(&self, role_id: &str) -> Option<Arc<EffectivePermissions>> {
        self.cache.get(role_id).map(|hit| Arc::clone(hit.value()))
    }

    fn memoize(&self, frame: Frame<'_>) -> Arc<EffectivePermissions> {
        let resolved = Arc::new(EffectivePermissions {
            role_id: frame.role.id.clone(),
            permissions: frame.acc.permissions,
        });

        // A concurrent first resolution may have won; both results are equal.
        let entry = self.cache.entry(frame.role.id.clone()).or_insert(resolved);
        Arc::clone(entry.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(id: &str, resource: &str, action: &str) -> Permission {
        Permission::new(id, resource, action)
    }

    fn resolver(roles: Vec<Role>) -> RoleResolver {
        RoleResolver::new(Arc::new(RoleCatalog::new(roles).unwrap()))
    }

    fn actions(set: &EffectivePermissions) -> Vec<&str> {
        set.iter().map(|p| p.action.as_str()).collect()
    }

    #[test]
    fn test_leaf_role_dedups_own_permissions() {
        let r = resolver(vec![Role::new("clerk", "Clerk")
            .with_permission(perm("a", "billing", "read"))
            .with_permission(perm("b", "billing", "read"))
            .with_permission(perm("c", "billing", "create"))]);

        let set = r.resolve("clerk").unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(actions(&set), vec!["read", "create"]);
        assert_eq!(set.as_slice()[0].id, "a");
        assert_eq!(set.role_id(), "clerk");
    }

    #[test]
    fn test_lab_manager_inherits_without_duplication() {
        let r = resolver(vec![
            Role::new("lab_technician", "Lab Technician")
                .with_permission(perm("lab.result.update", "lab.result", "update")),
            Role::new("lab_manager", "Lab Manager")
                .inheriting("lab_technician")
                .with_permission(perm("lab.result.approve", "lab.result", "approve"))
                .with_permission(perm("lab.result.update", "lab.result", "update")),
        ]);

        let set = r.resolve("lab_manager").unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(actions(&set), vec!["approve", "update"]);
    }

    #[test]
    fn test_transitive_supersets() {
        let r = resolver(vec![
            Role::new("c", "C").with_permission(perm("p3", "patient", "read")),
            Role::new("b", "B")
                .inheriting("c")
                .with_permission(perm("p2", "patient", "update")),
            Role::new("a", "A")
                .inheriting("b")
                .with_permission(perm("p1", "patient", "delete")),
        ]);

        let a = r.resolve("a").unwrap();
        let b = r.resolve("b").unwrap();
        let c = r.resolve("c").unwrap();
        assert!(a.is_superset_of(&b));
        assert!(a.is_superset_of(&c));
        assert!(b.is_superset_of(&c));
        assert!(!c.is_superset_of(&a));
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_conditions_keep_grants_distinct() {
        let r = resolver(vec![
            Role::new("base", "Base").with_permission(perm("u", "lab.result", "update")),
            Role::new("scoped", "Scoped").inheriting("base").with_permission(
                perm("u.d1", "lab.result", "update").with_condition("departmentId", "D1"),
            ),
        ]);
        assert_eq!(r.resolve("scoped").unwrap().len(), 2);
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let r = resolver(vec![
            Role::new("d", "D").with_permission(perm("pd", "patient", "read")),
            Role::new("b", "B").inheriting("d"),
            Role::new("c", "C").inheriting("d"),
            Role::new("a", "A").inheriting("b").inheriting("c"),
        ]);
        let a = r.resolve("a").unwrap();
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_two_role_cycle_is_named() {
        let r = resolver(vec![
            Role::new("x", "X").inheriting("y"),
            Role::new("y", "Y").inheriting("x"),
        ]);
        match r.resolve("x") {
            Err(RbacError::Cycle { cycle }) => assert_eq!(cycle, vec!["x", "y"]),
            other => panic!("expected cycle, got {other:?}"),
        }
        assert_eq!(r.cached_len(), 0);
    }

    #[test]
    fn test_cycle_reported_from_reentry_point() {
        let r = resolver(vec![
            Role::new("entry", "Entry").inheriting("a"),
            Role::new("a", "A").inheriting("b"),
            Role::new("b", "B").inheriting("c"),
            Role::new("c", "C").inheriting("a"),
        ]);
        match r.resolve("entry") {
            Err(RbacError::Cycle { cycle }) => assert_eq!(cycle, vec!["a", "b", "c"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_inheritance_is_a_cycle() {
        let r = resolver(vec![Role::new("loop", "Loop").inheriting("loop")]);
        assert!(matches!(
            r.resolve("loop"),
            Err(RbacError::Cycle { cycle }) if cycle == vec!["loop"]
        ));
    }

    #[test]
    fn test_unknown_role_not_found() {
        let r = resolver(vec![]);
        assert!(matches!(
            r.resolve("ghost"),
            Err(RbacError::NotFound { kind: "role", .. })
        ));
    }

    #[test]
    fn test_inactive_roles_still_contribute() {
        let r = resolver(vec![
            Role::new("legacy", "Legacy")
                .deactivated()
                .with_permission(perm("p", "billing", "read")),
            Role::new("current", "Current").inheriting("legacy"),
        ]);
        assert_eq!(r.resolve("current").unwrap().len(), 1);
    }

    #[test]
    fn test_memoizes_intermediate_roles() {
        let r = resolver(vec![
            Role::new("c", "C").with_permission(perm("p", "patient", "read")),
            Role::new("b", "B").inheriting("c"),
            Role::new("a", "A").inheriting("b"),
        ]);
        let first = r.resolve("a").unwrap();
        assert_eq!(r.cached_len(), 3);

        let again = r.resolve("a").unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn test_resolve_all_surfaces_cycles() {
        let r = resolver(vec![
            Role::new("ok", "Ok"),
            Role::new("x", "X").inheriting("y"),
            Role::new("y", "Y").inheriting("x"),
        ]);
        assert!(matches!(r.resolve_all(), Err(RbacError::Cycle { .. })));
    }

    fn chain(depth: usize) -> Vec<Role> {
        let mut roles = vec![Role::new("r0", "R0").with_permission(perm("p", "patient", "read"))];
        for i in 1..depth {
            let parent = format!("r{}", i - 1);
            roles.push(Role::new(format!("r{i}"), format!("R{i}")).inheriting(parent));
        }
        roles
    }

    #[test]
    fn test_deep_chain_resolves_on_small_stack() {
        let r = Arc::new(resolver(chain(10_000)));

        let worker = Arc::clone(&r);
        let set = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || worker.resolve("r9999"))
            .unwrap()
            .join()
            .unwrap()
            .unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.as_slice()[0].id, "p");
        assert_eq!(r.cached_len(), 10_000);
    }

    #[test]
    fn test_deep_cycle_is_named_on_small_stack() {
        let mut roles = chain(10_000);
        roles[0] = Role::new("r0", "R0").inheriting("r9999");
        let r = resolver(roles);

        let result = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || r.resolve("r9999"))
            .unwrap()
            .join()
            .unwrap();

        match result {
            Err(RbacError::Cycle { cycle }) => {
                assert_eq!(cycle.len(), 10_000);
                assert_eq!(cycle[0], "r9999");
                assert_eq!(cycle[9_999], "r0");
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_concurrent_first_resolution() {
        let r = Arc::new(resolver(vec![
            Role::new("base", "Base")
                .with_permission(perm("p1", "patient", "read"))
                .with_permission(perm("p2", "patient", "update")),
            Role::new("top", "Top")
                .inheriting("base")
                .with_permission(perm("p3", "billing", "read")),
        ]));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let r = Arc::clone(&r);
                std::thread::spawn(move || r.resolve("top").unwrap())
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for set in &results {
            assert_eq!(set.len(), 3);
            assert_eq!(**set, *results[0]);
        }
        assert_eq!(r.cached_len(), 2);
    }
}
