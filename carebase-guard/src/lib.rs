//! # Carebase Guard
//!
//! Authorization middleware support for Carebase services, built on
//! `carebase-rbac`.
//!
//! ## Overview
//!
//! The carebase-guard crate handles:
//! - **Routes**: Static endpoint → (resource, action) bindings
//! - **Principals**: Authenticated identities and their held roles
//! - **Audit**: One record per authorization attempt
//! - **Guard**: Enforcing decisions with generic, non-leaking errors
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use carebase_guard::{AccessGuard, MemoryAuditSink, Principal, RouteTable};
//! use carebase_rbac::RbacConfig;
//! use uuid::Uuid;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = Arc::new(RbacConfig::from_env().build_service()?);
//! let routes = RouteTable::new().bind("GET /patients/{id}", "patient", "read");
//! let guard = AccessGuard::new(service, routes, Arc::new(MemoryAuditSink::new()));
//!
//! let nurse = Principal::new(Uuid::now_v7(), ["nurse"]);
//! match guard.authorize(&nurse, "GET /patients/{id}", None).await {
//!     Ok(_) => { /* run the handler */ }
//!     Err(err) => { /* respond with err.status_code() and err.error_code() */ }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Denials surface as `GuardError::Forbidden`, whose message carries no
//! permission ids, reasons or fault details; those go to the audit sink and
//! logs only.

pub mod audit;
pub mod error;
pub mod guard;
pub mod routes;

// Re-export main types
pub use audit::{AuditRecord, AuditSink, MemoryAuditSink};
pub use error::{GuardError, GuardResult};
pub use guard::{AccessGuard, Principal};
pub use routes::{RouteBinding, RouteTable};
