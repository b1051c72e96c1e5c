//! Engine configuration.
//!
//! Configuration is loaded from environment variables with defaults suitable
//! for local development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::decision::AccessDecisionService;
use crate::error::{RbacError, RbacResult};
use crate::loader::{load_document, CatalogDocument};
use crate::snapshot::SnapshotStore;

/// Environment variable naming the catalog document path.
pub const CATALOG_PATH_VAR: &str = "CAREBASE_RBAC_CATALOG_PATH";

/// Environment variable toggling per-decision debug events.
pub const LOG_DECISIONS_VAR: &str = "CAREBASE_RBAC_LOG_DECISIONS";

/// RBAC engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RbacConfig {
    /// Path of the JSON catalog document.
    pub catalog_path: PathBuf,

    /// Emit a debug event for every decision.
    pub log_decisions: bool,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("config/catalog.json"),
            log_decisions: true,
        }
    }
}

impl RbacConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CAREBASE_RBAC_CATALOG_PATH`: catalog document (default: config/catalog.json)
    /// - `CAREBASE_RBAC_LOG_DECISIONS`: per-decision debug events (default: true)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            catalog_path: std::env::var(CATALOG_PATH_VAR)
                .map(PathBuf::from)
                .unwrap_or(default.catalog_path),
            log_decisions: std::env::var(LOG_DECISIONS_VAR)
                .map(|s| s != "false" && s != "0")
                .unwrap_or(default.log_decisions),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> RbacResult<()> {
        if self.catalog_path.as_os_str().is_empty() {
            return Err(RbacError::ConfigError(format!(
                "{CATALOG_PATH_VAR} must not be empty"
            )));
        }
        Ok(())
    }

    /// Read the catalog document and build a snapshot store.
    ///
    /// Any validation or cycle error is returned; the caller should refuse
    /// to start rather than serve without a valid snapshot.
    pub fn load_store(&self) -> RbacResult<Arc<SnapshotStore>> {
        self.validate()?;
        let document = CatalogDocument::from_path(&self.catalog_path)?;
        let snapshot = load_document(document)?;
        Ok(Arc::new(SnapshotStore::new(snapshot)))
    }

    /// Load the catalog and build a decision service.
    pub fn build_service(&self) -> RbacResult<AccessDecisionService> {
        let store = self.load_store()?;
        Ok(AccessDecisionService::new(store).with_decision_logging(self.log_decisions))
    }
}
