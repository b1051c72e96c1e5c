//! # Catalog documents
//!
//! JSON form of a catalog as supplied by a configuration file, database
//! export, or admin API. Roles reference permissions by id; the document is
//! turned into catalog entries and then through [`load_catalogs`].
//!
//! ```json
//! {
//!   "permissions": [
//!     {"id": "lab.result.update", "resource": "lab.result", "action": "update"}
//!   ],
//!   "roles": [
//!     {"id": "lab_technician", "name": "Lab Technician", "permissions": ["lab.result.update"]},
//!     {"id": "lab_manager", "name": "Lab Manager", "inherits": ["lab_technician"], "priority": 20}
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{RbacError, RbacResult};
use crate::permissions::{Permission, PermissionCatalog};
use crate::roles::Role;
use crate::snapshot::{load_catalogs, CatalogSnapshot};

/// A role as written in a catalog document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleDocument {
    /// Unique role identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Ids of permissions granted directly
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Ids of inherited roles
    #[serde(default)]
    pub inherits: Vec<String>,
    /// Informational ranking
    #[serde(default)]
    pub priority: i32,
    /// Whether the role may be assigned
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// A complete catalog document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogDocument {
    /// Permission definitions
    #[serde(default)]
    pub permissions: Vec<Permission>,
    /// Role definitions
    #[serde(default)]
    pub roles: Vec<RoleDocument>,
}

impl CatalogDocument {
    /// Parse a document from a JSON string.
    pub fn from_json_str(json: &str) -> RbacResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a document from a file.
    pub fn from_path(path: impl AsRef<Path>) -> RbacResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| RbacError::CatalogIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Expand role permission references into catalog entries.
    ///
    /// # Errors
    ///
    /// `RbacError::Validation` if the permission list is itself invalid or a
    /// role references a permission id that is not defined.
    pub fn into_parts(self) -> RbacResult<(Vec<Permission>, Vec<Role>)> {
        let catalog = PermissionCatalog::new(self.permissions)?;

        let mut roles = Vec::with_capacity(self.roles.len());
        for doc in self.roles {
            let mut permissions = Vec::with_capacity(doc.permissions.len());
            for perm_id in &doc.permissions {
                let perm = catalog.get(perm_id).map_err(|_| {
                    RbacError::Validation(format!(
                        "role `{}` references unknown permission `{}`",
                        doc.id, perm_id
                    ))
                })?;
                permissions.push(perm.clone());
            }
            roles.push(Role {
                id: doc.id,
                name: doc.name,
                description: doc.description,
                permissions,
                inherits: doc.inherits,
                priority: doc.priority,
                is_active: doc.is_active,
            });
        }

        Ok((catalog.all().cloned().collect(), roles))
    }
}

/// Validate a document and compile it into a snapshot.
pub fn load_document(document: CatalogDocument) -> RbacResult<CatalogSnapshot> {
    let (permissions, roles) = document.into_parts()?;
    load_catalogs(permissions, roles)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAB: &str = r#"{
        "permissions": [
            {"id": "lab.result.update", "resource": "lab.result", "action": "update"},
            {"id": "lab.result.approve", "resource": "lab.result", "action": "approve",
             "description": "Sign off on results"}
        ],
        "roles": [
            {"id": "lab_technician", "name": "Lab Technician", "permissions": ["lab.result.update"]},
            {"id": "lab_manager", "name": "Lab Manager", "permissions": ["lab.result.approve"],
             "inherits": ["lab_technician"], "priority": 20, "is_active": true}
        ]
    }"#;

    #[test]
    fn test_parse_and_load() {
        let doc = CatalogDocument::from_json_str(LAB).unwrap();
        assert_eq!(doc.roles[1].priority, 20);

        let snapshot = load_document(doc).unwrap();
        let manager = snapshot.resolve("lab_manager").unwrap();
        assert_eq!(manager.len(), 2);
        assert_eq!(
            snapshot.permissions().get("lab.result.approve").unwrap().description,
            "Sign off on results"
        );
    }

    #[test]
    fn test_unknown_permission_reference() {
        let doc = CatalogDocument::from_json_str(
            r#"{"roles": [{"id": "r", "name": "R", "permissions": ["missing"]}]}"#,
        )
        .unwrap();
        let err = doc.into_parts().unwrap_err();
        assert!(err.to_string().contains("unknown permission `missing`"));
    }

    #[test]
    fn test_malformed_json() {
        let err = CatalogDocument::from_json_str("{not json").unwrap_err();
        assert_eq!(err.error_code(), "CATALOG_PARSE_ERROR");

        let err = CatalogDocument::from_json_str(r#"{"permissions": [{"id": "p"}]}"#).unwrap_err();
        assert!(matches!(err, RbacError::CatalogParse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = CatalogDocument::from_path("/nonexistent/carebase/catalog.json").unwrap_err();
        assert!(matches!(err, RbacError::CatalogIo { .. }));
        assert!(err.is_server_error());
    }

    #[test]
    fn test_scalar_conditions_in_document() {
        let doc = CatalogDocument::from_json_str(
            r#"{"permissions": [{"id": "p", "resource": "lab.result", "action": "update",
                "conditions": {"departmentId": "D1", "onCall": true, "floor": 3}}]}"#,
        )
        .unwrap();
        let conditions = doc.permissions[0].conditions.as_ref().unwrap();
        assert_eq!(conditions.len(), 3);

        let err = CatalogDocument::from_json_str(
            r#"{"permissions": [{"id": "p", "resource": "r", "action": "a",
                "conditions": {"tags": ["x"]}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RbacError::CatalogParse(_)));
    }
}
