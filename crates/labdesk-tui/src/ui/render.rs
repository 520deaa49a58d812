use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use labdesk_core::nav::Guarded;

use crate::app::{App, AppState, LoginFocus, PasswordFocus};

use super::styles;
use super::views;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Tabs
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    render_main_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::EnteringPath => render_path_overlay(frame, app),
        AppState::ChangingPassword => render_password_overlay(frame, app),
        AppState::ConfirmingLogout => render_confirm_overlay(
            frame,
            "Cerrar sesion?",
            "Tendras que volver a iniciar sesion.",
        ),
        AppState::ConfirmingQuit => {
            render_confirm_overlay(frame, "Salir de LabDesk?", "La sesion queda guardada.")
        }
        AppState::Normal | AppState::Quitting => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  LabDesk";
    let identity = match app.session().user() {
        Some(user) => match user.primary_role() {
            Some(role) => format!("{} · {}  [?] Ayuda", user.full_name(), role),
            None => format!("{}  [?] Ayuda", user.full_name()),
        },
        None => "[?] Ayuda".to_string(),
    };

    let padding = (area.width as usize)
        .saturating_sub(title.chars().count() + identity.chars().count() + 2);

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(identity, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];

    if app.session().is_authenticated() {
        for (i, entry) in app.visible_menu().iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" | ", styles::muted_style()));
            }
            let label = format!("[{}] {}", i + 1, entry.label);
            let style = if entry.route == app.route {
                styles::tab_style(true)
            } else {
                styles::muted_style()
            };
            spans.push(Span::styled(label, style));
        }
    } else {
        spans.push(Span::styled(app.route.title(), styles::tab_style(true)));
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

/// The guarded area: only a `View` outcome reaches the route's own content.
fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.current_view() {
        Guarded::Loading => render_loading(frame, area),
        Guarded::Redirect(target) => render_message(
            frame,
            area,
            "Redirigiendo...",
            &target.path(),
        ),
        Guarded::AccessDenied => render_message(
            frame,
            area,
            "Acceso Denegado",
            "No tienes permisos para acceder a esta página.",
        ),
        Guarded::View(route) if route.is_public() => render_login_form(frame, app, area),
        Guarded::View(route) => views::render(frame, app, &route, area),
    }
}

pub fn render_loading(frame: &mut Frame, area: Rect) {
    let paragraph = Paragraph::new(Line::from(Span::styled(
        "Cargando...",
        styles::muted_style(),
    )))
    .centered();
    let inner = centered_rect_fixed(area.width, 1, area);
    frame.render_widget(paragraph, inner);
}

fn render_message(frame: &mut Frame, area: Rect, heading: &str, detail: &str) {
    let lines = vec![
        Line::from(Span::styled(heading.to_string(), styles::error_style())),
        Line::from(""),
        Line::from(Span::styled(detail.to_string(), styles::muted_style())),
    ];
    let inner = centered_rect_fixed(area.width, 3, area);
    frame.render_widget(Paragraph::new(lines).centered(), inner);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = if app.session().is_authenticated() {
        "[g]o | [l]ogout | [q]uit"
    } else {
        "[q]uit"
    };

    let left_text = match app.status_message {
        Some(ref msg) => format!(" {} ", msg),
        None => format!(" {} ", app.route.path()),
    };
    let right_text = format!(" {} ", shortcuts);

    let padding_len = (area.width as usize)
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());

    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    frame.render_widget(
        Paragraph::new(status_line).style(styles::status_bar_style()),
        area,
    );
}

fn render_login_form(frame: &mut Frame, app: &App, area: Rect) {
    let height = if app.login_error.is_some() { 11 } else { 9 };
    let area = centered_rect_fixed(50, height, area);

    let mut lines = vec![
        Line::from(Span::styled("  Laboratorio Clinico", styles::title_style())),
        Line::from(""),
    ];

    lines.push(input_line(
        "Email:    ",
        &app.login_email,
        app.login_focus == LoginFocus::Email,
    ));
    lines.push(input_line(
        "Password: ",
        &"*".repeat(app.login_password.chars().count()),
        app.login_focus == LoginFocus::Password,
    ));

    lines.push(Line::from(""));
    let button = if app.login_focus == LoginFocus::Button {
        " ▶ Ingresar ◀ "
    } else {
        "   Ingresar   "
    };
    lines.push(Line::from(vec![
        Span::raw("             ["),
        Span::styled(button, styles::field_style(app.login_focus == LoginFocus::Button)),
        Span::raw("]"),
    ]));

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("  {}", error), styles::error_style())));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Iniciar sesion ")
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// A labelled text field, showing the tail when the value overflows.
fn input_line(label: &str, value: &str, focused: bool) -> Line<'static> {
    const FIELD_WIDTH: usize = 28;
    let count = value.chars().count();
    let visible: String = value.chars().skip(count.saturating_sub(FIELD_WIDTH)).collect();
    let cursor = if focused { "▌" } else { "" };
    Line::from(vec![
        Span::raw("  "),
        Span::styled(label.to_string(), styles::muted_style()),
        Span::styled("[", styles::muted_style()),
        Span::styled(
            format!("{:<width$}{}", visible, cursor, width = FIELD_WIDTH),
            styles::field_style(focused),
        ),
        Span::styled("]", styles::muted_style()),
    ])
}

fn render_path_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(60, 5, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        input_line("Ruta: ", &app.path_input, true),
        Line::from(""),
        Line::from(Span::styled(
            "  Enter para ir, Esc para cancelar",
            styles::muted_style(),
        )),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Ir a ")
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_password_overlay(frame: &mut Frame, app: &App) {
    let height = if app.password_error.is_some() { 10 } else { 8 };
    let area = centered_rect_fixed(56, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(""),
        input_line(
            "Actual: ",
            &"*".repeat(app.current_password.chars().count()),
            app.password_focus == PasswordFocus::Current,
        ),
        input_line(
            "Nueva:  ",
            &"*".repeat(app.new_password.chars().count()),
            app.password_focus == PasswordFocus::New,
        ),
        Line::from(""),
        Line::from(Span::styled(
            "  Min. 8 caracteres, un numero y una mayuscula",
            styles::muted_style(),
        )),
    ];
    if let Some(ref error) = app.password_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("  {}", error), styles::error_style())));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Cambiar contrasena ")
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 20, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");
    let key = |k: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<10}", k), styles::help_key_style()),
            Span::styled(desc, styles::help_desc_style()),
        ])
    };

    let help_text = vec![
        Line::from(Span::styled("  LabDesk", styles::title_style())),
        Line::from(Span::styled(format!("  version {}", version), styles::muted_style())),
        Line::from(""),
        Line::from(Span::styled(" Navegacion", styles::highlight_style())),
        key("1-9", "Ir a la seccion"),
        key("←/→", "Seccion anterior/siguiente"),
        key("g", "Ir a una ruta"),
        Line::from(""),
        Line::from(Span::styled(" Sesion", styles::highlight_style())),
        key("r", "Recargar perfil"),
        key("c", "Cambiar contrasena"),
        key("l", "Cerrar sesion"),
        key("q", "Salir"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Presiona ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" o ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" para cerrar", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn render_confirm_overlay(frame: &mut Frame, question: &str, detail: &str) {
    let area = centered_rect_fixed(46, 8, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!("   {}", question), styles::highlight_style())),
        Line::from(Span::styled(format!("   {}", detail), styles::muted_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Presiona ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" para confirmar, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" para cancelar", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
pub fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
