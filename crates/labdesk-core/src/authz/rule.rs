use crate::auth::Session;

use super::Permission;

/// Declarative requirement attached to a route or menu entry.
///
/// Inside each list any match is enough. When both lists are present both
/// must pass. A list that is present but empty never passes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessRule {
    pub required_roles: Option<Vec<String>>,
    pub required_permissions: Option<Vec<Permission>>,
}

impl AccessRule {
    /// No requirement beyond being signed in.
    pub fn any_user() -> Self {
        Self::default()
    }

    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().and_roles(roles)
    }

    pub fn permissions<I, P>(permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        Self::default().and_permissions(permissions)
    }

    pub fn and_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn and_permissions<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        self.required_permissions = Some(permissions.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_unrestricted(&self) -> bool {
        self.required_roles.is_none() && self.required_permissions.is_none()
    }

    pub fn roles_pass(&self, session: &Session) -> bool {
        match self.required_roles {
            Some(ref roles) => session.has_any_role(roles.as_slice()),
            None => true,
        }
    }

    pub fn permissions_pass(&self, session: &Session) -> bool {
        match self.required_permissions {
            Some(ref permissions) => session.has_any_permission(permissions.as_slice()),
            None => true,
        }
    }

    /// Role and permission checks only; authentication is the caller's job.
    pub fn allows(&self, session: &Session) -> bool {
        self.roles_pass(session) && self.permissions_pass(session)
    }
}
