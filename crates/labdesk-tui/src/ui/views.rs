//! Route content, drawn only after the guard produced a `View`.
//!
//! The back office screens themselves (patients, orders, billing...) are
//! served by the gateway's own modules; here each one shows its location,
//! the requirement that let the user in and what the session allows.

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use labdesk_core::authz::AccessRule;
use labdesk_core::nav::{OrdersListing, Route};
use labdesk_core::Session;

use crate::app::App;

use super::render::render_loading;
use super::styles;

pub fn render(frame: &mut Frame, app: &App, route: &Route, area: Rect) {
    let session = app.session();
    let lines = match route {
        Route::Dashboard => dashboard_lines(app, session),
        Route::Profile => profile_lines(session),
        Route::Orders => orders_lines(session),
        Route::NotFound(path) => vec![
            Line::from(Span::styled("Pagina no encontrada", styles::error_style())),
            Line::from(""),
            Line::from(Span::styled(path.clone(), styles::muted_style())),
        ],
        other => section_lines(other),
    };

    // A view can only be reached with a user, but the snapshot may be gone
    // for a frame after a forced logout.
    if session.user().is_none() {
        render_loading(frame, area);
        return;
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", route.title()))
        .title_style(styles::title_style())
        .border_style(styles::border_style(true));

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn field(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<14}", label), styles::label_style()),
        Span::raw(value),
    ])
}

fn dashboard_lines(app: &App, session: &Session) -> Vec<Line<'static>> {
    let Some(user) = session.user() else {
        return Vec::new();
    };
    let minutes = session.minutes_signed_in().unwrap_or(0);

    let mut lines = vec![
        Line::from(Span::styled(
            format!("  Bienvenido, {}", user.full_name()),
            styles::highlight_style(),
        )),
        Line::from(""),
        field("Rol", user.primary_role().unwrap_or("Sin rol").to_string()),
        field("Conectado", format!("hace {} min", minutes)),
        field("Gateway", app.config.api_base_url.clone()),
        Line::from(""),
        Line::from(Span::styled("  Secciones disponibles", styles::label_style())),
    ];

    for (i, entry) in app.visible_menu().iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("   [{}] ", i + 1), styles::help_key_style()),
            Span::raw(entry.label.clone()),
            Span::styled(format!("  {}", entry.route.path()), styles::muted_style()),
        ]));
    }
    lines
}

fn profile_lines(session: &Session) -> Vec<Line<'static>> {
    let Some(user) = session.user() else {
        return Vec::new();
    };

    let roles = if user.roles.is_empty() {
        "-".to_string()
    } else {
        user.roles.join(", ")
    };
    let permissions = if user.has_wildcard() {
        "Todos los permisos".to_string()
    } else if user.permissions.is_empty() {
        "-".to_string()
    } else {
        user.permissions
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut lines = vec![
        field("Nombre", user.full_name()),
        field("Email", user.email.clone()),
        field("Roles", roles),
        field("Permisos", permissions),
    ];
    if let Some(location) = user.location_id {
        lines.push(field("Sede", format!("#{}", location)));
    }
    lines.push(field(
        "Estado",
        if user.is_active { "Activo" } else { "Inactivo" }.to_string(),
    ));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("  [r]", styles::help_key_style()),
        Span::styled(" recargar   ", styles::muted_style()),
        Span::styled("[c]", styles::help_key_style()),
        Span::styled(" cambiar contrasena", styles::muted_style()),
    ]));
    lines
}

fn orders_lines(session: &Session) -> Vec<Line<'static>> {
    let listing = match Route::orders_listing(session) {
        OrdersListing::Own => "Mis ordenes: solo las del paciente conectado",
        OrdersListing::All => "Todas las ordenes del laboratorio",
    };
    let mut lines = section_lines(&Route::Orders);
    lines.push(field("Listado", listing.to_string()));
    lines
}

fn section_lines(route: &Route) -> Vec<Line<'static>> {
    let requirement = route
        .access_rule()
        .map(|rule| describe_rule(&rule))
        .unwrap_or_else(|| "publica".to_string());
    vec![
        field("Ruta", route.path()),
        field("Requisito", requirement),
    ]
}

/// Human readable summary of a rule.
pub fn describe_rule(rule: &AccessRule) -> String {
    let mut parts = Vec::new();
    if let Some(ref roles) = rule.required_roles {
        parts.push(format!("rol {}", roles.join(" o ")));
    }
    if let Some(ref permissions) = rule.required_permissions {
        let names: Vec<&str> = permissions.iter().map(|p| p.as_str()).collect();
        parts.push(format!("permiso {}", names.join(" o ")));
    }
    if parts.is_empty() {
        "sesion iniciada".to_string()
    } else {
        parts.join(" y ")
    }
}
