//! Request authorization guard
//!
//! Sits in front of every protected operation:
//!
//! ```text
//! endpoint ──RouteTable──▶ (resource, action)
//! principal ─assignable roles─┐
//! context ────────────────────┼─▶ AccessDecisionService::decide ─▶ AuditSink
//!                             └─▶ Ok(decision) | Err(Forbidden)
//! ```
//!
//! The role filter and the decision read the same catalog snapshot, loaded
//! once per request.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use carebase_rbac::{
    AccessDecisionService, CatalogSnapshot, Decision, PermissionMatcher, RequestContext,
    WildcardMatcher,
};

use crate::audit::{AuditRecord, AuditSink};
use crate::error::{GuardError, GuardResult};
use crate::routes::RouteTable;

/// An authenticated principal and the roles it currently holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    /// Principal ID
    pub id: Uuid,
    /// Role ids from the session or token store
    pub role_ids: Vec<String>,
}

impl Principal {
    /// Create a principal.
    pub fn new<I, S>(id: Uuid, role_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            role_ids: role_ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// Enforces access decisions for bound endpoints and audits every attempt.
pub struct AccessGuard<M = WildcardMatcher> {
    service: Arc<AccessDecisionService<M>>,
    routes: RouteTable,
    audit: Arc<dyn AuditSink>,
}

impl<M: PermissionMatcher> AccessGuard<M> {
    /// Create a guard.
    pub fn new(
        service: Arc<AccessDecisionService<M>>,
        routes: RouteTable,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            service,
            routes,
            audit,
        }
    }

    /// The route table.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// The decision service.
    pub fn service(&self) -> &Arc<AccessDecisionService<M>> {
        &self.service
    }

    /// Authorize a principal for an endpoint.
    ///
    /// Returns the decision on allow and `GuardError::Forbidden` on deny.
    /// An audit record is emitted in both cases.
    ///
    /// # Errors
    ///
    /// - `GuardError::UnknownRoute` if the endpoint is not bound
    /// - `GuardError::Forbidden` if no held role grants the request
    pub async fn authorize(
        &self,
        principal: &Principal,
        endpoint: &str,
        context: Option<&RequestContext>,
    ) -> GuardResult<Decision> {
        let binding = self.binding_for(principal, endpoint)?;
        let snapshot = self.service.store().current();
        let roles = self.assignable_roles_in(&snapshot, principal);
        let decision = self.service.decide_with_snapshot(
            &snapshot,
            &roles,
            &binding.resource,
            &binding.action,
            context,
        );
        self.finish(principal, endpoint, &binding.resource, &binding.action, decision)
            .await
    }

    /// Like [`authorize`](Self::authorize), with the context as raw JSON.
    ///
    /// A malformed context is denied.
    pub async fn authorize_json(
        &self,
        principal: &Principal,
        endpoint: &str,
        context: Option<&serde_json::Value>,
    ) -> GuardResult<Decision> {
        let binding = self.binding_for(principal, endpoint)?;
        let snapshot = self.service.store().current();
        let roles = self.assignable_roles_in(&snapshot, principal);
        let decision = self.service.decide_json_with_snapshot(
            &snapshot,
            &roles,
            &binding.resource,
            &binding.action,
            context,
        );
        self.finish(principal, endpoint, &binding.resource, &binding.action, decision)
            .await
    }

    /// Roles the principal may exercise: held roles that are active in the
    /// current catalog. Unknown ids are passed through; the decision service
    /// ignores them.
    pub fn assignable_roles(&self, principal: &Principal) -> Vec<String> {
        let snapshot = self.service.store().current();
        self.assignable_roles_in(&snapshot, principal)
    }

    /// Like [`assignable_roles`](Self::assignable_roles), against a snapshot
    /// the caller already holds.
    pub fn assignable_roles_in(
        &self,
        snapshot: &CatalogSnapshot,
        principal: &Principal,
    ) -> Vec<String> {
        let roles = snapshot.roles();

        principal
            .role_ids
            .iter()
            .filter(|id| {
                let inactive = roles.contains(id) && roles.assignable(id).is_none();
                if inactive {
                    tracing::warn!(
                        principal_id = %principal.id,
                        role_id = %id,
                        "Ignoring inactive role held by principal"
                    );
                }
                !inactive
            })
            .cloned()
            .collect()
    }

    fn binding_for(
        &self,
        principal: &Principal,
        endpoint: &str,
    ) -> GuardResult<crate::routes::RouteBinding> {
        self.routes.lookup(endpoint).cloned().map_err(|err| {
            tracing::warn!(
                principal_id = %principal.id,
                endpoint,
                "Authorization requested for unbound endpoint"
            );
            err
        })
    }

    async fn finish(
        &self,
        principal: &Principal,
        endpoint: &str,
        resource: &str,
        action: &str,
        decision: Decision,
    ) -> GuardResult<Decision> {
        let record = AuditRecord::from_decision(principal.id, resource, action, &decision);
        let record_id = record.id;
        if let Err(err) = self.audit.record(record).await {
            tracing::error!(
                error = %err,
                record_id = %record_id,
                principal_id = %principal.id,
                "Failed to write audit record"
            );
        }

        if decision.allow {
            Ok(decision)
        } else {
            tracing::info!(
                principal_id = %principal.id,
                endpoint,
                resource,
                action,
                reason = %decision.reason,
                "Access denied"
            );
            Err(GuardError::Forbidden)
        }
    }
}

impl<M> std::fmt::Debug for AccessGuard<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGuard")
            .field("routes", &self.routes.len())
            .finish()
    }
}
