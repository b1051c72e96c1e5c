//! # Carebase RBAC
//!
//! Hierarchical role-based access control for the Carebase clinic platform.
//! Every protected operation (patient records, billing, lab orders,
//! administration) is gated by [`AccessDecisionService::decide`].
//!
//! ## Overview
//!
//! The carebase-rbac crate handles:
//! - **Permissions**: Resource + action grants, optionally narrowed by conditions
//! - **Roles**: Inheritable bundles of permissions
//! - **Resolution**: Flattening inheritance into effective permission sets
//! - **Decisions**: Allow/deny for a principal's roles and a request
//!
//! ## Architecture
//!
//! ```text
//! CatalogDocument ──load_document──▶ CatalogSnapshot ◀──swap── SnapshotStore
//!                                      ├─ PermissionCatalog
//!                                      ├─ RoleCatalog
//!                                      └─ RoleResolver (cache)
//!
//! AccessDecisionService::decide(roles, resource, action, context)
//!   └─ resolve each role ─▶ PermissionMatcher + ConditionEvaluator ─▶ Decision
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use carebase_rbac::{load_catalogs, AccessDecisionService, Permission, Role, SnapshotStore};
//!
//! let read = Permission::new("patient.read", "patient", "read");
//! let all_patient = Permission::new("patient.all", "patient", "*");
//!
//! let snapshot = load_catalogs(
//!     vec![read.clone(), all_patient.clone()],
//!     vec![
//!         Role::new("nurse", "Nurse").with_permission(read),
//!         Role::new("doctor", "Doctor").inheriting("nurse").with_permission(all_patient),
//!     ],
//! )
//! .unwrap();
//!
//! let service = AccessDecisionService::new(Arc::new(SnapshotStore::new(snapshot)));
//!
//! assert!(service.decide(&["doctor"], "patient", "delete", None).allow);
//! assert!(!service.decide(&["nurse"], "patient", "delete", None).allow);
//! assert!(!service.decide(&["doctor"], "billing", "read", None).allow);
//! ```
//!
//! ## Matching rules
//!
//! - `resource:action` matches only that pair
//! - `resource:*` matches any action on the resource
//! - `*:*` matches everything
//!
//! There is no deny permission; access is the OR of all held roles. Emergency
//! access is an ordinary permission granted to specific roles.
//!
//! ## Failure model
//!
//! Catalog problems (invalid entries, unknown references, inheritance cycles)
//! are rejected at load time and never reach a decision. Faults while deciding
//! are logged and produce a deny.

pub mod condition;
pub mod config;
pub mod decision;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod permissions;
pub mod resolver;
pub mod roles;
pub mod snapshot;

// Re-export main types for convenience
pub use condition::{ConditionEvaluator, Conditions, RequestContext, ScalarValue};
pub use config::RbacConfig;
pub use decision::{AccessDecisionService, Decision};
pub use error::{RbacError, RbacResult};
pub use loader::{load_document, CatalogDocument, RoleDocument};
pub use matcher::{PermissionMatcher, WildcardMatcher};
pub use permissions::{Permission, PermissionCatalog, WILDCARD};
pub use resolver::{EffectivePermissions, RoleResolver};
pub use roles::{Role, RoleCatalog};
pub use snapshot::{load_catalogs, CatalogSnapshot, SnapshotStore};
