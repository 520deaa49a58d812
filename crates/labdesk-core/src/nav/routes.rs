//! Route table of the back office.
//!
//! Every screen has a `Route`; each protected route carries the
//! `AccessRule` its guard enforces.

use std::fmt;

use crate::auth::Session;
use crate::authz::AccessRule;

/// Role allowed to manage users and roles
pub const ROLE_ADMIN: &str = "Administrador General";

/// Role allowed into cash reconciliation next to the administrator
pub const ROLE_ACCOUNTANT: &str = "Contador";

/// Role whose order list only shows their own orders
pub const ROLE_PATIENT: &str = "Paciente";

/// Where unauthenticated visitors are sent. Also the target after logout.
pub const LOGIN_ROUTE: Route = Route::Login;

/// Landing route for a signed-in user.
pub const HOME_ROUTE: Route = Route::Dashboard;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    // Public
    Home,
    Login,

    // Dashboard
    Dashboard,
    Profile,

    // Users and roles
    Users,
    UserNew,
    UserEdit(i64),
    Roles,
    RoleEdit(i64),

    // Service catalog
    Catalog,
    CatalogNew,
    CatalogCategories,
    CatalogDetail(i64),
    CatalogEdit(i64),
    CatalogPriceHistory(i64),

    // Patients
    Patients,
    PatientNew,
    PatientEdit(i64),

    // Orders
    Orders,
    OrderNew,
    OrderDetail(i64),
    OrderEdit(i64),
    OrderGenerateInvoice(i64),

    // Billing
    Billing,
    InvoiceNew,
    InvoiceDetail(i64),

    Reports,
    Reconciliation,

    /// Any path under the dashboard that names no screen
    NotFound(String),
}

/// Which order list a user sees at `/dashboard/orders`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrdersListing {
    /// Only the signed-in patient's own orders
    Own,
    /// Every order
    All,
}

impl Route {
    /// Resolve a path such as `/dashboard/orders/12/edit`.
    pub fn parse(path: &str) -> Self {
        let trimmed = path.trim().trim_end_matches('/');
        let segments: Vec<&str> = trimmed
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        match segments.as_slice() {
            [] => Route::Home,
            ["login"] => Route::Login,
            ["dashboard", rest @ ..] => Self::parse_dashboard(rest)
                .unwrap_or_else(|| Route::NotFound(trimmed.to_string())),
            _ => Route::NotFound(trimmed.to_string()),
        }
    }

    fn parse_dashboard(segments: &[&str]) -> Option<Self> {
        let route = match segments {
            [] => Route::Dashboard,
            ["profile"] => Route::Profile,

            ["usuarios"] => Route::Users,
            ["usuarios", "new"] => Route::UserNew,
            ["usuarios", user, "edit"] => Route::UserEdit(parse_id(user)?),
            ["roles"] => Route::Roles,
            ["roles", role, "edit"] => Route::RoleEdit(parse_id(role)?),

            ["catalog"] => Route::Catalog,
            ["catalog", "new"] => Route::CatalogNew,
            ["catalog", "categories"] => Route::CatalogCategories,
            ["catalog", service] => Route::CatalogDetail(parse_id(service)?),
            ["catalog", service, "edit"] => Route::CatalogEdit(parse_id(service)?),
            ["catalog", service, "price-history"] => Route::CatalogPriceHistory(parse_id(service)?),

            ["patients"] => Route::Patients,
            ["patients", "new"] => Route::PatientNew,
            ["patients", patient, "edit"] => Route::PatientEdit(parse_id(patient)?),

            ["orders"] => Route::Orders,
            ["orders", "new"] => Route::OrderNew,
            ["orders", order] => Route::OrderDetail(parse_id(order)?),
            ["orders", order, "edit"] => Route::OrderEdit(parse_id(order)?),
            ["orders", order, "generate-invoice"] => Route::OrderGenerateInvoice(parse_id(order)?),

            ["billing"] => Route::Billing,
            ["billing", "new"] => Route::InvoiceNew,
            ["billing", invoice] => Route::InvoiceDetail(parse_id(invoice)?),

            ["reports"] => Route::Reports,
            ["reconciliation"] => Route::Reconciliation,
            _ => return None,
        };
        Some(route)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Profile => "/dashboard/profile".to_string(),
            Route::Users => "/dashboard/usuarios".to_string(),
            Route::UserNew => "/dashboard/usuarios/new".to_string(),
            Route::UserEdit(id) => format!("/dashboard/usuarios/{}/edit", id),
            Route::Roles => "/dashboard/roles".to_string(),
            Route::RoleEdit(id) => format!("/dashboard/roles/{}/edit", id),
            Route::Catalog => "/dashboard/catalog".to_string(),
            Route::CatalogNew => "/dashboard/catalog/new".to_string(),
            Route::CatalogCategories => "/dashboard/catalog/categories".to_string(),
            Route::CatalogDetail(id) => format!("/dashboard/catalog/{}", id),
            Route::CatalogEdit(id) => format!("/dashboard/catalog/{}/edit", id),
            Route::CatalogPriceHistory(id) => format!("/dashboard/catalog/{}/price-history", id),
            Route::Patients => "/dashboard/patients".to_string(),
            Route::PatientNew => "/dashboard/patients/new".to_string(),
            Route::PatientEdit(id) => format!("/dashboard/patients/{}/edit", id),
            Route::Orders => "/dashboard/orders".to_string(),
            Route::OrderNew => "/dashboard/orders/new".to_string(),
            Route::OrderDetail(id) => format!("/dashboard/orders/{}", id),
            Route::OrderEdit(id) => format!("/dashboard/orders/{}/edit", id),
            Route::OrderGenerateInvoice(id) => format!("/dashboard/orders/{}/generate-invoice", id),
            Route::Billing => "/dashboard/billing".to_string(),
            Route::InvoiceNew => "/dashboard/billing/new".to_string(),
            Route::InvoiceDetail(id) => format!("/dashboard/billing/{}", id),
            Route::Reports => "/dashboard/reports".to_string(),
            Route::Reconciliation => "/dashboard/reconciliation".to_string(),
            Route::NotFound(path) => path.clone(),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Home => "Inicio",
            Route::Login => "Iniciar sesion",
            Route::Dashboard => "Dashboard",
            Route::Profile => "Perfil",
            Route::Users | Route::UserNew | Route::UserEdit(_) => "Usuarios",
            Route::Roles | Route::RoleEdit(_) => "Roles",
            Route::Catalog
            | Route::CatalogNew
            | Route::CatalogDetail(_)
            | Route::CatalogEdit(_)
            | Route::CatalogPriceHistory(_) => "Catalogo",
            Route::CatalogCategories => "Categorias",
            Route::Patients | Route::PatientNew | Route::PatientEdit(_) => "Pacientes",
            Route::Orders
            | Route::OrderNew
            | Route::OrderDetail(_)
            | Route::OrderEdit(_)
            | Route::OrderGenerateInvoice(_) => "Ordenes",
            Route::Billing | Route::InvoiceNew | Route::InvoiceDetail(_) => "Facturacion",
            Route::Reports => "Reportes",
            Route::Reconciliation => "Conciliacion",
            Route::NotFound(_) => "No encontrado",
        }
    }

    /// Public routes render without a session.
    pub fn is_public(&self) -> bool {
        matches!(self, Route::Home | Route::Login)
    }

    /// Requirement enforced by this route's guard. `None` for public routes.
    pub fn access_rule(&self) -> Option<AccessRule> {
        let rule = match self {
            Route::Home | Route::Login => return None,

            Route::Users
            | Route::UserNew
            | Route::UserEdit(_)
            | Route::Roles
            | Route::RoleEdit(_) => AccessRule::roles([ROLE_ADMIN]),

            Route::CatalogNew | Route::CatalogEdit(_) | Route::CatalogCategories => {
                AccessRule::permissions(["catalog:write"])
            }

            Route::Patients => AccessRule::permissions(["patients:read"]),
            Route::PatientNew | Route::PatientEdit(_) => AccessRule::permissions(["patients:write"]),

            Route::Orders | Route::OrderDetail(_) => AccessRule::permissions(["orders:read"]),
            Route::OrderNew | Route::OrderEdit(_) => AccessRule::permissions(["orders:write"]),
            Route::OrderGenerateInvoice(_) => AccessRule::permissions(["billing:write"]),

            Route::Billing | Route::InvoiceDetail(_) => AccessRule::permissions(["billing:read"]),
            Route::InvoiceNew => AccessRule::permissions(["billing:write"]),

            Route::Reports => AccessRule::permissions(["reports:read"]),
            Route::Reconciliation => AccessRule::roles([ROLE_ACCOUNTANT, ROLE_ADMIN]),

            Route::Dashboard
            | Route::Profile
            | Route::Catalog
            | Route::CatalogDetail(_)
            | Route::CatalogPriceHistory(_)
            | Route::NotFound(_) => AccessRule::any_user(),
        };
        Some(rule)
    }

    /// Pick the order list variant for the session.
    pub fn orders_listing(session: &Session) -> OrdersListing {
        if session.has_role(ROLE_PATIENT) {
            OrdersListing::Own
        } else {
            OrdersListing::All
        }
    }
}

fn parse_id(segment: &str) -> Option<i64> {
    segment.parse().ok()
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::Permission;
    use crate::models::UserRecord;

    #[test]
    fn test_parse_public_routes() {
        assert_eq!(Route::parse("/"), Route::Home);
        assert_eq!(Route::parse(""), Route::Home);
        assert_eq!(Route::parse("/login"), Route::Login);
        assert_eq!(Route::parse("/login/"), Route::Login);
        assert!(Route::Login.is_public());
        assert!(Route::Home.is_public());
        assert!(!Route::Dashboard.is_public());
        assert!(!Route::NotFound("/x".to_string()).is_public());
    }

    #[test]
    fn test_parse_dashboard_routes_with_ids() {
        assert_eq!(Route::parse("/dashboard"), Route::Dashboard);
        assert_eq!(Route::parse("/dashboard/orders/12/edit"), Route::OrderEdit(12));
        assert_eq!(
            Route::parse("/dashboard/orders/3/generate-invoice"),
            Route::OrderGenerateInvoice(3)
        );
        assert_eq!(Route::parse("/dashboard/catalog/5/price-history"), Route::CatalogPriceHistory(5));
        assert_eq!(Route::parse("/dashboard/usuarios/9/edit"), Route::UserEdit(9));
    }

    #[test]
    fn test_categories_is_not_a_catalog_id() {
        assert_eq!(Route::parse("/dashboard/catalog/categories"), Route::CatalogCategories);
    }

    #[test]
    fn test_unknown_paths_are_not_found() {
        assert_eq!(
            Route::parse("/dashboard/orders/abc"),
            Route::NotFound("/dashboard/orders/abc".to_string())
        );
        assert!(matches!(Route::parse("/nowhere"), Route::NotFound(_)));
    }

    #[test]
    fn test_path_parse_agree() {
        let routes = [
            Route::Profile,
            Route::RoleEdit(4),
            Route::CatalogDetail(8),
            Route::PatientEdit(2),
            Route::InvoiceDetail(77),
            Route::Reconciliation,
        ];
        for route in routes {
            assert_eq!(Route::parse(&route.path()), route);
        }
    }

    #[test]
    fn test_access_rules_follow_route_table() {
        assert_eq!(Route::Login.access_rule(), None);
        assert_eq!(Route::Users.access_rule(), Some(AccessRule::roles([ROLE_ADMIN])));
        assert_eq!(
            Route::Reconciliation.access_rule(),
            Some(AccessRule::roles([ROLE_ACCOUNTANT, ROLE_ADMIN]))
        );
        assert_eq!(
            Route::OrderNew.access_rule().and_then(|r| r.required_permissions),
            Some(vec![Permission::named("orders:write")])
        );
        assert_eq!(Route::Catalog.access_rule(), Some(AccessRule::any_user()));
    }

    #[test]
    fn test_orders_listing_for_patient() {
        let patient = UserRecord::new(3, "Luis", "Rojas", "luis@mail.pe").with_roles([ROLE_PATIENT]);
        let staff = UserRecord::new(4, "Ana", "Quispe", "ana@lab.pe").with_roles(["Recepcionista"]);
        assert_eq!(
            Route::orders_listing(&Session::authenticated("tok", patient)),
            OrdersListing::Own
        );
        assert_eq!(
            Route::orders_listing(&Session::authenticated("tok", staff)),
            OrdersListing::All
        );
    }
}
