use std::fmt;

use crate::auth::Session;
use crate::authz::AccessRule;

use super::routes::{Route, ROLE_ACCOUNTANT, ROLE_ADMIN};

type ShowPredicate = Box<dyn Fn(&Session) -> bool + Send + Sync>;

/// One navigation entry with its visibility requirements.
pub struct MenuEntry {
    pub label: String,
    pub route: Route,
    pub rule: AccessRule,
    show: Option<ShowPredicate>,
}

impl MenuEntry {
    pub fn new(label: &str, route: Route) -> Self {
        Self {
            label: label.to_string(),
            route,
            rule: AccessRule::default(),
            show: None,
        }
    }

    pub fn requires_permissions<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<crate::authz::Permission>,
    {
        self.rule = self.rule.and_permissions(permissions);
        self
    }

    pub fn requires_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule = self.rule.and_roles(roles);
        self
    }

    /// Extra visibility condition, checked before any role or permission.
    pub fn show_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Session) -> bool + Send + Sync + 'static,
    {
        self.show = Some(Box::new(predicate));
        self
    }

    pub fn is_visible(&self, session: &Session) -> bool {
        if let Some(ref show) = self.show {
            if !show(session) {
                return false;
            }
        }
        self.rule.permissions_pass(session) && self.rule.roles_pass(session)
    }
}

impl fmt::Debug for MenuEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuEntry")
            .field("label", &self.label)
            .field("route", &self.route)
            .field("rule", &self.rule)
            .field("show", &self.show.is_some())
            .finish()
    }
}

/// Entries visible to the session, in their original order.
///
/// Cheap enough to call on every frame; nothing is cached because roles and
/// permissions change at login and logout.
pub fn filter_menu<'a>(entries: &'a [MenuEntry], session: &Session) -> Vec<&'a MenuEntry> {
    entries.iter().filter(|e| e.is_visible(session)).collect()
}

/// The back office sidebar.
pub fn sidebar() -> Vec<MenuEntry> {
    vec![
        MenuEntry::new("Dashboard", Route::Dashboard),
        MenuEntry::new("Catalogo", Route::Catalog),
        MenuEntry::new("Pacientes", Route::Patients).requires_permissions(["patients:read"]),
        MenuEntry::new("Ordenes", Route::Orders).requires_permissions(["orders:read"]),
        MenuEntry::new("Facturacion", Route::Billing).requires_permissions(["billing:read"]),
        MenuEntry::new("Reportes", Route::Reports).requires_permissions(["reports:read"]),
        MenuEntry::new("Conciliacion", Route::Reconciliation)
            .requires_roles([ROLE_ACCOUNTANT, ROLE_ADMIN]),
        MenuEntry::new("Usuarios", Route::Users).requires_roles([ROLE_ADMIN]),
        MenuEntry::new("Perfil", Route::Profile).show_when(Session::is_authenticated),
    ]
}
