//! # Catalog snapshots
//!
//! A snapshot is the unit of configuration: one permission catalog, one role
//! catalog, and the resolution cache computed from them. Snapshots are never
//! mutated. A reload builds and fully validates a new snapshot, then swaps it
//! in atomically; decisions already running keep the snapshot they started
//! with.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{RbacError, RbacResult};
use crate::permissions::{Permission, PermissionCatalog};
use crate::resolver::{EffectivePermissions, RoleResolver};
use crate::roles::{Role, RoleCatalog};

/// An immutable, validated view of all roles and permissions.
#[derive(Debug)]
pub struct CatalogSnapshot {
    id: Uuid,
    version: u64,
    loaded_at: DateTime<Utc>,
    permissions: PermissionCatalog,
    resolver: RoleResolver,
}

impl CatalogSnapshot {
    /// Unique snapshot identity.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Store-assigned version (1 for a standalone snapshot).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// When the snapshot was built.
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// The permission catalog.
    pub fn permissions(&self) -> &PermissionCatalog {
        &self.permissions
    }

    /// The role catalog.
    pub fn roles(&self) -> &RoleCatalog {
        self.resolver.roles()
    }

    /// The resolver bound to this snapshot.
    pub fn resolver(&self) -> &RoleResolver {
        &self.resolver
    }

    /// Resolve the effective permissions of a role in this snapshot.
    pub fn resolve(&self, role_id: &str) -> RbacResult<Arc<EffectivePermissions>> {
        self.resolver.resolve(role_id)
    }

    fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

/// Validate and compile catalogs into a snapshot.
///
/// Checks, in order: permission entries, role ids and embedded permissions,
/// `inherits` references, role grants against the permission catalog, then
/// cycles (by resolving every role). The returned snapshot has a warm
/// resolution cache.
///
/// # Errors
///
/// - `RbacError::Validation` for structurally invalid entries, and for role
///   grants whose id is not in `permissions` or whose (resource, action,
///   conditions) differ from the catalog definition
/// - `RbacError::Cycle` if role inheritance loops
///
/// # Example
///
/// ```
/// use carebase_rbac::{load_catalogs, Permission, Role};
///
/// let update = Permission::new("lab.result.update", "lab.result", "update");
/// let approve = Permission::new("lab.result.approve", "lab.result", "approve");
///
/// let snapshot = load_catalogs(
///     vec![update.clone(), approve.clone()],
///     vec![
///         Role::new("lab_technician", "Lab Technician").with_permission(update),
///         Role::new("lab_manager", "Lab Manager")
///             .inheriting("lab_technician")
///             .with_permission(approve),
///     ],
/// )
/// .unwrap();
///
/// assert_eq!(snapshot.resolve("lab_manager").unwrap().len(), 2);
/// ```
pub fn load_catalogs(
    permissions: Vec<Permission>,
    roles: Vec<Role>,
) -> RbacResult<CatalogSnapshot> {
    let permissions = PermissionCatalog::new(permissions)?;
    let roles = Arc::new(RoleCatalog::new(roles)?);
    check_role_grants(&permissions, &roles)?;
    let resolver = RoleResolver::new(roles);
    resolver.resolve_all()?;

    let snapshot = CatalogSnapshot {
        id: Uuid::now_v7(),
        version: 1,
        loaded_at: Utc::now(),
        permissions,
        resolver,
    };

    tracing::info!(
        snapshot_id = %snapshot.id,
        permissions = snapshot.permissions.len(),
        roles = snapshot.roles().len(),
        "Loaded RBAC catalogs"
    );

    Ok(snapshot)
}

/// Every permission a role grants must be the catalog's definition of that id.
fn check_role_grants(permissions: &PermissionCatalog, roles: &RoleCatalog) -> RbacResult<()> {
    for role in roles.all() {
        for granted in &role.permissions {
            let defined = permissions.get(&granted.id).map_err(|_| {
                RbacError::Validation(format!(
                    "role `{}` grants undefined permission `{}`",
                    role.id, granted.id
                ))
            })?;
            if defined.grant_key() != granted.grant_key() {
                return Err(RbacError::Validation(format!(
                    "role `{}` grants `{}` as {granted}, but the catalog defines it as {defined}",
                    role.id, granted.id
                )));
            }
        }
    }
    Ok(())
}

/// Holds the active snapshot and swaps it atomically on reload.
///
/// # Example
///
/// ```
/// use carebase_rbac::{load_catalogs, Permission, Role, SnapshotStore};
///
/// let initial = load_catalogs(vec![], vec![Role::new("clerk", "Clerk")]).unwrap();
/// let store = SnapshotStore::new(initial);
/// assert_eq!(store.current().version(), 1);
///
/// // A cyclic catalog is rejected and the previous snapshot stays active.
/// let bad = vec![
///     Role::new("x", "X").inheriting("y"),
///     Role::new("y", "Y").inheriting("x"),
/// ];
/// assert!(store.reload(vec![], bad).is_err());
/// assert!(store.current().roles().contains("clerk"));
/// ```
#[derive(Debug)]
pub struct SnapshotStore {
    active: ArcSwap<CatalogSnapshot>,
    next_version: AtomicU64,
}

impl SnapshotStore {
    /// Create a store serving `initial`.
    pub fn new(initial: CatalogSnapshot) -> Self {
        let initial = initial.with_version(1);
        Self {
            active: ArcSwap::from_pointee(initial),
            next_version: AtomicU64::new(2),
        }
    }

    /// The active snapshot.
    ///
    /// Hold the returned `Arc` for the duration of one decision so the whole
    /// evaluation sees a single configuration.
    pub fn current(&self) -> Arc<CatalogSnapshot> {
        self.active.load_full()
    }

    /// Build a new snapshot and make it active.
    ///
    /// On error the previously active snapshot keeps serving and the error is
    /// returned to the caller.
    pub fn reload(
        &self,
        permissions: Vec<Permission>,
        roles: Vec<Role>,
    ) -> RbacResult<Arc<CatalogSnapshot>> {
        match load_catalogs(permissions, roles) {
            Ok(snapshot) => Ok(self.install(snapshot)),
            Err(err) => {
                let active = self.current();
                tracing::error!(
                    error = %err,
                    code = err.error_code(),
                    active_version = active.version(),
                    "RBAC catalog reload rejected, keeping previous snapshot"
                );
                Err(err)
            }
        }
    }

    /// Make an already validated snapshot active.
    pub fn install(&self, snapshot: CatalogSnapshot) -> Arc<CatalogSnapshot> {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst);
        let snapshot = Arc::new(snapshot.with_version(version));
        self.active.store(Arc::clone(&snapshot));

        tracing::info!(
            snapshot_id = %snapshot.id(),
            version,
            "Activated RBAC catalog snapshot"
        );
        snapshot
    }
}
