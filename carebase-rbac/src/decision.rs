//! # Access decisions
//!
//! The facade consumed by the authorization middleware. A decision reads the
//! active snapshot once, resolves every held role, and allows the request on
//! the first effective permission that both matches the (resource, action)
//! pair and has its conditions satisfied.
//!
//! The service is fail-closed: any error or panic during evaluation is logged
//! and turned into a deny.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::condition::{ConditionEvaluator, RequestContext};
use crate::error::{RbacError, RbacResult};
use crate::matcher::{PermissionMatcher, WildcardMatcher};
use crate::snapshot::{CatalogSnapshot, SnapshotStore};

/// Reason recorded on decisions converted from an internal fault.
pub const FAULT_REASON: &str = "internal fault";

/// Outcome of an access decision.
///
/// `matched_permission_id` and `reason` are for logs and audit only; they
/// must not be returned to the requesting principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the request is authorized.
    pub allow: bool,
    /// Permission that granted the request, if allowed.
    pub matched_permission_id: Option<String>,
    /// Explanation suitable for logs.
    pub reason: String,
}

impl Decision {
    fn granted(permission_id: &str, role_id: &str) -> Self {
        Self {
            allow: true,
            matched_permission_id: Some(permission_id.to_string()),
            reason: format!("granted by permission `{permission_id}` via role `{role_id}`"),
        }
    }

    fn denied(reason: impl Into<String>) -> Self {
        Self {
            allow: false,
            matched_permission_id: None,
            reason: reason.into(),
        }
    }

    /// Check if the request was allowed.
    pub fn is_allowed(&self) -> bool {
        self.allow
    }
}

/// Decides whether a set of roles authorizes a request.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use carebase_rbac::{
///     load_catalogs, AccessDecisionService, Permission, RequestContext, Role, SnapshotStore,
/// };
///
/// let scoped = Permission::new("lab.result.update.d1", "lab.result", "update")
///     .with_condition("departmentId", "D1");
/// let snapshot = load_catalogs(
///     vec![scoped.clone()],
///     vec![Role::new("lab_technician", "Lab Technician").with_permission(scoped)],
/// )
/// .unwrap();
/// let service = AccessDecisionService::new(Arc::new(SnapshotStore::new(snapshot)));
///
/// let d1 = RequestContext::new().with("departmentId", "D1");
/// let d2 = RequestContext::new().with("departmentId", "D2");
/// assert!(service.decide(&["lab_technician"], "lab.result", "update", Some(&d1)).allow);
/// assert!(!service.decide(&["lab_technician"], "lab.result", "update", Some(&d2)).allow);
/// ```
pub struct AccessDecisionService<M = WildcardMatcher> {
    store: Arc<SnapshotStore>,
    matcher: M,
    log_decisions: bool,
}

impl AccessDecisionService<WildcardMatcher> {
    /// Create a service using the standard wildcard matcher.
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self::with_matcher(store, WildcardMatcher)
    }
}

impl<M: PermissionMatcher> AccessDecisionService<M> {
    /// Create a service with a custom matcher.
    pub fn with_matcher(store: Arc<SnapshotStore>, matcher: M) -> Self {
        Self {
            store,
            matcher,
            log_decisions: true,
        }
    }

    /// Enable or disable per-decision debug events.
    pub fn with_decision_logging(mut self, enabled: bool) -> Self {
        self.log_decisions = enabled;
        self
    }

    /// The snapshot store this service reads.
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Decide whether any of `role_ids` authorizes `action` on `resource`.
    ///
    /// Never fails: faults become a deny with reason [`FAULT_REASON`].
    pub fn decide<S: AsRef<str>>(
        &self,
        role_ids: &[S],
        resource: &str,
        action: &str,
        context: Option<&RequestContext>,
    ) -> Decision {
        let snapshot = self.store.current();
        self.decide_with_snapshot(&snapshot, role_ids, resource, action, context)
    }

    /// Like [`decide`](Self::decide), against a snapshot the caller already
    /// holds.
    ///
    /// Callers that read other catalog state for the same request pass the
    /// snapshot they read, so the whole request sees one configuration.
    pub fn decide_with_snapshot<S: AsRef<str>>(
        &self,
        snapshot: &CatalogSnapshot,
        role_ids: &[S],
        resource: &str,
        action: &str,
        context: Option<&RequestContext>,
    ) -> Decision {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.evaluate(snapshot, role_ids, resource, action, context)
        }));

        let decision = match outcome {
            Ok(Ok(decision)) => decision,
            Ok(Err(err)) => self.fail_closed(snapshot, resource, action, &err.to_string()),
            Err(payload) => {
                let detail = format!("panic during evaluation: {}", panic_message(&*payload));
                self.fail_closed(snapshot, resource, action, &detail)
            }
        };

        if self.log_decisions {
            tracing::debug!(
                resource,
                action,
                allow = decision.allow,
                matched_permission_id = decision.matched_permission_id.as_deref(),
                reason = %decision.reason,
                snapshot_version = snapshot.version(),
                "Access decision"
            );
        }
        decision
    }

    /// Like [`decide`](Self::decide), but takes the context as raw JSON.
    ///
    /// A malformed context (not an object, or a non-scalar attribute) is a
    /// decision fault and yields a deny.
    pub fn decide_json<S: AsRef<str>>(
        &self,
        role_ids: &[S],
        resource: &str,
        action: &str,
        context: Option<&serde_json::Value>,
    ) -> Decision {
        let snapshot = self.store.current();
        self.decide_json_with_snapshot(&snapshot, role_ids, resource, action, context)
    }

    /// Like [`decide_json`](Self::decide_json), against a snapshot the
    /// caller already holds.
    pub fn decide_json_with_snapshot<S: AsRef<str>>(
        &self,
        snapshot: &CatalogSnapshot,
        role_ids: &[S],
        resource: &str,
        action: &str,
        context: Option<&serde_json::Value>,
    ) -> Decision {
        match context.map(RequestContext::from_json).transpose() {
            Ok(ctx) => {
                self.decide_with_snapshot(snapshot, role_ids, resource, action, ctx.as_ref())
            }
            Err(err) => self.fail_closed(snapshot, resource, action, &err.to_string()),
        }
    }

    fn evaluate<S: AsRef<str>>(
        &self,
        snapshot: &CatalogSnapshot,
        role_ids: &[S],
        resource: &str,
        action: &str,
        context: Option<&RequestContext>,
    ) -> RbacResult<Decision> {
        if role_ids.is_empty() {
            return Ok(Decision::denied("principal holds no roles"));
        }

        let mut resolved = Vec::with_capacity(role_ids.len());
        for role_id in role_ids {
            let role_id = role_id.as_ref();
            match snapshot.resolve(role_id) {
                Ok(set) => resolved.push(set),
                Err(RbacError::NotFound { .. }) => {
                    tracing::warn!(
                        role_id,
                        snapshot_version = snapshot.version(),
                        "Principal holds a role unknown to the active catalog"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        for set in &resolved {
            for permission in set.iter() {
                if self.matcher.matches(permission, resource, action)
                    && ConditionEvaluator::satisfies(permission.conditions.as_ref(), context)
                {
                    return Ok(Decision::granted(&permission.id, set.role_id()));
                }
            }
        }

        Ok(Decision::denied(format!(
            "no held role grants {resource}:{action}"
        )))
    }

    fn fail_closed(
        &self,
        snapshot: &CatalogSnapshot,
        resource: &str,
        action: &str,
        detail: &str,
    ) -> Decision {
        tracing::error!(
            resource,
            action,
            detail,
            snapshot_version = snapshot.version(),
            "Access decision fault, denying"
        );
        Decision::denied(FAULT_REASON)
    }
}

impl<M> std::fmt::Debug for AccessDecisionService<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessDecisionService")
            .field("snapshot_version", &self.store.current().version())
            .field("log_decisions", &self.log_decisions)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}
