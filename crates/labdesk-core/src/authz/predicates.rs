//! Authorization predicates over a session snapshot.
//!
//! Every check answers `false` for a session that is not authenticated.
//! Empty query lists never match.

use crate::auth::Session;
use crate::models::UserRecord;

use super::Permission;

impl Session {
    /// Signed-in user, or `None` whenever the session is not authenticated.
    fn authorized_user(&self) -> Option<&UserRecord> {
        if self.is_authenticated() {
            self.user()
        } else {
            None
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.authorized_user()
            .map(|user| user.holds_role(role))
            .unwrap_or(false)
    }

    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        match self.authorized_user() {
            Some(user) => roles.iter().any(|role| user.holds_role(role.as_ref())),
            None => false,
        }
    }

    /// The wildcard grants every permission.
    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.authorized_user()
            .map(|user| user.has_wildcard() || user.permissions.contains(permission))
            .unwrap_or(false)
    }

    /// The wildcard matches any non-empty query.
    pub fn has_any_permission(&self, permissions: &[Permission]) -> bool {
        if permissions.is_empty() {
            return false;
        }
        match self.authorized_user() {
            Some(user) => {
                user.has_wildcard() || permissions.iter().any(|p| user.permissions.contains(p))
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(roles: &[&str], permissions: &[&str]) -> UserRecord {
        UserRecord::new(1, "Ana", "Quispe", "ana@lab.pe")
            .with_roles(roles.iter().copied())
            .with_permissions(permissions.iter().copied())
    }

    fn perms(tokens: &[&str]) -> Vec<Permission> {
        tokens.iter().map(|t| Permission::parse(t)).collect()
    }

    #[test]
    fn test_unauthenticated_denies_everything() {
        let sessions = [Session::new(), Session::anonymous(), Session::anonymous().with_loading(true)];
        for session in &sessions {
            assert!(!session.has_role("Administrador General"));
            assert!(!session.has_any_role(&["Administrador General", "Contador"]));
            assert!(!session.has_permission(&Permission::All));
            assert!(!session.has_permission(&Permission::named("orders:read")));
            assert!(!session.has_any_permission(&perms(&["orders:read", "all"])));
        }
    }

    #[test]
    fn test_has_role() {
        let session = Session::authenticated("tok", user(&["Recepcionista"], &[]));
        assert!(session.has_role("Recepcionista"));
        assert!(!session.has_role("recepcionista"));
        assert!(!session.has_role("Contador"));
    }

    #[test]
    fn test_has_any_role_intersection() {
        let session = Session::authenticated("tok", user(&["Contador"], &[]));
        assert!(session.has_any_role(&["Administrador General", "Contador"]));
        assert!(!session.has_any_role(&["Administrador General"]));
    }

    #[test]
    fn test_empty_queries_never_match() {
        let session = Session::authenticated("tok", user(&["Contador"], &["all"]));
        let no_roles: [&str; 0] = [];
        assert!(!session.has_any_role(&no_roles));
        assert!(!session.has_any_permission(&[]));
    }

    #[test]
    fn test_has_permission_named() {
        let session = Session::authenticated("tok", user(&[], &["orders:write"]));
        assert!(session.has_permission(&Permission::named("orders:write")));
        assert!(!session.has_permission(&Permission::named("orders:read")));
    }

    #[test]
    fn test_wildcard_grants_any_non_empty_query() {
        let session = Session::authenticated("tok", user(&[], &["all"]));
        assert!(session.has_permission(&Permission::named("billing:read")));
        assert!(session.has_any_permission(&perms(&["billing:read"])));
        assert!(session.has_any_permission(&perms(&["made:up", "never:granted"])));
    }

    #[test]
    fn test_query_for_wildcard_needs_wildcard_grant() {
        let session = Session::authenticated("tok", user(&[], &["orders:read"]));
        assert!(!session.has_permission(&Permission::All));
        assert!(!session.has_any_permission(&[Permission::All]));
    }

    #[test]
    fn test_loading_does_not_change_answers_for_signed_in_user() {
        let session = Session::authenticated("tok", user(&["Contador"], &[])).with_loading(true);
        assert!(session.has_role("Contador"));
    }
}
