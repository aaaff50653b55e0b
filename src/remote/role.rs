//! Organization, user and project roles.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::{get_path, Client};
use crate::error::SdkError;

const ROLES_QUERY: &str = "query GetAvailableUserRolesPyApi { roles { id name } }";

/// Canonical role key: upper case, spaces replaced by underscores.
pub fn normalize_role_name(name: &str) -> String {
    name.replace(' ', "_").to_uppercase()
}

/// A named permission level.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    #[serde(rename = "id")]
    pub uid: String,
    /// Always normalized once read through [`Roles`].
    pub name: String,
}

/// A role held within an organization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrgRole(pub Role);

/// A role assigned to a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRole(pub Role);

macro_rules! role_kind {
    ($name:ident) => {
        impl From<Role> for $name {
            fn from(role: Role) -> Self {
                Self(role)
            }
        }

        impl Deref for $name {
            type Target = Role;

            fn deref(&self) -> &Role {
                &self.0
            }
        }
    };
}

role_kind!(OrgRole);
role_kind!(UserRole);

/// A role scoped to one project.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectRole {
    pub project_id: String,
    pub role: Role,
}

impl ProjectRole {
    pub fn new(project_id: impl Into<String>, role: Role) -> Self {
        Self {
            project_id: project_id.into(),
            role,
        }
    }
}

/// Every role the service offers, keyed by normalized name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Roles {
    by_name: BTreeMap<String, Role>,
}

impl Roles {
    /// Builds the set from a `{ "roles": [{ "id", "name" }, ...] }` payload.
    pub fn from_response(response: &Value) -> Result<Self, SdkError> {
        let list: Vec<Role> = serde_json::from_value(get_path(response, &["roles"])?.clone())
            .map_err(|err| SdkError::UnexpectedResponse {
                path: "roles".to_string(),
                message: err.to_string(),
            })?;

        let by_name = list
            .into_iter()
            .map(|mut role| {
                role.name = normalize_role_name(&role.name);
                (role.name.clone(), role)
            })
            .collect();
        Ok(Self { by_name })
    }

    pub fn fetch(client: &dyn Client) -> Result<Self, SdkError> {
        let response = client.execute(ROLES_QUERY, &Value::Null)?;
        let roles = Self::from_response(&response)?;
        log::debug!("fetched {} role(s)", roles.len());
        Ok(roles)
    }

    /// Looks a role up by name, ignoring case and space/underscore
    /// differences.
    pub fn get(&self, name: &str) -> Result<&Role, SdkError> {
        let key = normalize_role_name(name);
        self.by_name.get(&key).ok_or_else(|| SdkError::UnknownRole {
            name: key,
            valid: self.valid_names().map(str::to_string).collect(),
        })
    }

    /// Normalized names, sorted.
    pub fn valid_names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// Roles in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl<'a> IntoIterator for &'a Roles {
    type Item = &'a Role;
    type IntoIter = std::collections::btree_map::Values<'a, String, Role>;

    fn into_iter(self) -> Self::IntoIter {
        self.by_name.values()
    }
}

/// Fetch-once cache of [`Roles`].
///
/// The first successful [`get_or_fetch`](RoleCache::get_or_fetch) stores
/// the result; later calls return it without contacting the service until
/// [`clear`](RoleCache::clear). The lock is held across the fetch, so
/// concurrent first callers trigger a single request.
#[derive(Debug, Default)]
pub struct RoleCache {
    roles: Mutex<Option<Arc<Roles>>>,
}

impl RoleCache {
    pub const fn new() -> Self {
        Self {
            roles: Mutex::new(None),
        }
    }

    /// The process-wide cache.
    pub fn global() -> &'static RoleCache {
        static GLOBAL: RoleCache = RoleCache::new();
        &GLOBAL
    }

    pub fn get_or_fetch(&self, client: &dyn Client) -> Result<Arc<Roles>, SdkError> {
        let mut slot = self.roles.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(roles) = slot.as_ref() {
            return Ok(Arc::clone(roles));
        }
        let roles = Arc::new(Roles::fetch(client)?);
        *slot = Some(Arc::clone(&roles));
        Ok(roles)
    }

    pub fn clear(&self) {
        *self.roles.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roles() -> Roles {
        Roles::from_response(&json!({
            "roles": [
                {"id": "r3", "name": "Team Manager"},
                {"id": "r1", "name": "Admin"},
                {"id": "r2", "name": "labeler"},
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_normalize_role_name() {
        assert_eq!(normalize_role_name("project lead"), "PROJECT_LEAD");
        assert_eq!(normalize_role_name("PROJECT_LEAD"), "PROJECT_LEAD");
    }

    #[test]
    fn test_lookup_is_normalized() {
        let roles = roles();
        assert_eq!(roles.get("team manager").unwrap().uid, "r3");
        assert_eq!(roles.get("TEAM_MANAGER").unwrap().name, "TEAM_MANAGER");
        assert_eq!(roles.get("Labeler").unwrap().uid, "r2");
    }

    #[test]
    fn test_unknown_role_lists_valid_names() {
        match roles().get("owner").unwrap_err() {
            SdkError::UnknownRole { name, valid } => {
                assert_eq!(name, "OWNER");
                assert_eq!(valid, vec!["ADMIN", "LABELER", "TEAM_MANAGER"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_iteration_in_name_order() {
        let roles = roles();
        let ids: Vec<&str> = roles.iter().map(|r| r.uid.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2", "r3"]);
        assert_eq!((&roles).into_iter().count(), 3);
    }

    #[test]
    fn test_role_kinds() {
        let admin = roles().get("admin").unwrap().clone();
        let org = OrgRole::from(admin.clone());
        assert_eq!(org.name, "ADMIN");
        let user = UserRole::from(admin.clone());
        assert_eq!(*user, admin);
        let project = ProjectRole::new("proj-1", admin);
        assert_eq!(project.role.uid, "r1");
    }

    #[test]
    fn test_malformed_response() {
        assert!(Roles::from_response(&json!({})).is_err());
        assert!(Roles::from_response(&json!({"roles": [{"id": 1}]})).is_err());
    }
}
