use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::authz::Permission;

/// Authenticated user snapshot as returned by `/auth/login` and `/auth/me`.
///
/// Replaced wholesale on refresh; nothing patches individual fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Role names in the order the gateway sent them. The first one is the
    /// primary role shown in the title bar.
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
    #[serde(default)]
    pub location_id: Option<i64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl UserRecord {
    pub fn new(id: i64, first_name: &str, last_name: &str, email: &str) -> Self {
        Self {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            roles: Vec::new(),
            permissions: BTreeSet::new(),
            location_id: None,
            is_active: true,
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for role in roles {
            let role = role.into();
            if !self.roles.contains(&role) {
                self.roles.push(role);
            }
        }
        self
    }

    pub fn with_permissions<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        self.permissions.extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn primary_role(&self) -> Option<&str> {
        self.roles.first().map(String::as_str)
    }

    pub fn holds_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_wildcard(&self) -> bool {
        self.permissions.contains(&Permission::All)
    }
}

/// Body returned by `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: UserRecord,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gateway_user() -> serde_json::Value {
        json!({
            "id": 7,
            "email": "ana@lab.pe",
            "first_name": "Ana",
            "last_name": "Quispe",
            "roles": ["Recepcionista", "Contador"],
            "permissions": ["orders:write", "patients:read"],
            "location_id": 2,
            "is_active": true
        })
    }

    #[test]
    fn test_deserialize_keeps_role_order() {
        let user: UserRecord = serde_json::from_value(gateway_user()).unwrap();
        assert_eq!(user.primary_role(), Some("Recepcionista"));
        assert!(user.holds_role("Contador"));
        assert!(user.permissions.contains(&Permission::named("orders:write")));
        assert_eq!(user.location_id, Some(2));
    }

    #[test]
    fn test_missing_roles_and_permissions_default_empty() {
        let user: UserRecord = serde_json::from_value(json!({
            "id": 1,
            "email": "x@lab.pe",
            "first_name": "X",
            "last_name": "Y"
        }))
        .unwrap();
        assert!(user.roles.is_empty());
        assert!(user.permissions.is_empty());
        assert!(user.is_active);
        assert_eq!(user.primary_role(), None);
    }

    #[test]
    fn test_with_roles_deduplicates() {
        let user = UserRecord::new(1, "A", "B", "a@b.c").with_roles(["Contador", "Contador"]);
        assert_eq!(user.roles, vec!["Contador".to_string()]);
    }

    #[test]
    fn test_wildcard_detected() {
        let user = UserRecord::new(1, "A", "B", "a@b.c").with_permissions(["all"]);
        assert!(user.has_wildcard());
    }

    #[test]
    fn test_full_name() {
        let user = UserRecord::new(1, "Ana", "Quispe", "a@b.c");
        assert_eq!(user.full_name(), "Ana Quispe");
    }

    #[test]
    fn test_login_response_defaults_token_type() {
        let body = json!({ "access_token": "abc", "user": gateway_user() });
        let parsed: LoginResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.token_type, "bearer");
        assert_eq!(parsed.user.id, 7);
    }
}
