use tracing::debug;

use crate::auth::Session;
use crate::authz::AccessRule;

use super::routes::{Route, HOME_ROUTE, LOGIN_ROUTE};

/// What a guarded route shows for the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<V> {
    /// Session still hydrating
    Loading,
    /// Navigate elsewhere instead of rendering
    Redirect(Route),
    /// Signed in, but lacking the required role or permission
    AccessDenied,
    View(V),
}

impl<V> Guarded<V> {
    pub fn is_view(&self) -> bool {
        matches!(self, Guarded::View(_))
    }

    pub fn map<W, F: FnOnce(V) -> W>(self, f: F) -> Guarded<W> {
        match self {
            Guarded::Loading => Guarded::Loading,
            Guarded::Redirect(route) => Guarded::Redirect(route),
            Guarded::AccessDenied => Guarded::AccessDenied,
            Guarded::View(v) => Guarded::View(f(v)),
        }
    }
}

/// Decides whether a protected view may render.
///
/// Checks run in a fixed order: loading, authentication, roles,
/// permissions. Loading suppresses every other check so nothing flashes
/// "access denied" while the session is still hydrating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteGuard {
    rule: AccessRule,
}

impl RouteGuard {
    pub fn new(rule: AccessRule) -> Self {
        Self { rule }
    }

    /// The view is only built when the guard lets it through.
    pub fn render<V, F: FnOnce() -> V>(&self, session: &Session, view: F) -> Guarded<V> {
        if session.is_loading() {
            return Guarded::Loading;
        }
        if !session.is_authenticated() {
            return Guarded::Redirect(LOGIN_ROUTE);
        }
        if !self.rule.roles_pass(session) {
            debug!(roles = ?self.rule.required_roles, "Access denied: role");
            return Guarded::AccessDenied;
        }
        if !self.rule.permissions_pass(session) {
            debug!(permissions = ?self.rule.required_permissions, "Access denied: permission");
            return Guarded::AccessDenied;
        }
        Guarded::View(view())
    }

    pub fn check(&self, session: &Session) -> Guarded<()> {
        self.render(session, || ())
    }
}

/// Resolve any route for the session, public ones included.
///
/// Public routes send a signed-in user to the dashboard; protected routes
/// go through their [`RouteGuard`].
pub fn resolve(route: &Route, session: &Session) -> Guarded<Route> {
    match route.access_rule() {
        None => {
            if session.is_authenticated() {
                Guarded::Redirect(HOME_ROUTE)
            } else {
                Guarded::View(route.clone())
            }
        }
        Some(rule) => RouteGuard::new(rule).render(session, || route.clone()),
    }
}
