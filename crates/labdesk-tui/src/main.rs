//! LabDesk - terminal back office for the clinical laboratory.
//!
//! Signs in against the laboratory API gateway, keeps the session across
//! restarts and only offers the sections the user's roles and permissions
//! allow.

mod app;
mod ui;

use std::io::{self, Write};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, fmt::writer::BoxMakeWriter, prelude::*, EnvFilter};

use labdesk_core::config::Config;
use labdesk_core::SessionStore;

use app::{build_store, App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const LOG_FILE_PREFIX: &str = "labdesk.log";

/// Command line mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Tui,
    WhoAmI,
    Login,
    Logout,
}

fn parse_args(args: &[String]) -> Result<(Command, bool)> {
    let mut command = Command::Tui;
    let mut ephemeral = false;
    for arg in args {
        let next = match arg.as_str() {
            "--whoami" => Command::WhoAmI,
            "--login" => Command::Login,
            "--logout" => Command::Logout,
            "--ephemeral" => {
                ephemeral = true;
                continue;
            }
            other => bail!("Unknown argument: {}", other),
        };
        if command != Command::Tui {
            bail!("Only one of --whoami, --login, --logout may be given");
        }
        command = next;
    }
    Ok((command, ephemeral))
}

/// Initialize the tracing subscriber for logging.
///
/// The terminal belongs to the UI, so logs go to a daily file under the
/// cache directory. Use RUST_LOG to control the level (e.g. RUST_LOG=debug).
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (writer, guard) = match config.log_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        Err(_) => (BoxMakeWriter::new(io::stderr), None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, ephemeral) = parse_args(&args)?;

    let config = Config::load().context("Failed to load config")?;
    let _log_guard = init_tracing(&config);
    info!(api = %config.api_base_url, ?command, "LabDesk starting");

    let store = build_store(&config, ephemeral)?;

    match command {
        Command::WhoAmI => return whoami(store).await,
        Command::Login => return login(config, store).await,
        Command::Logout => return logout(store),
        Command::Tui => {}
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, store);

    // First frame shows the loading placeholder while the token is checked
    terminal.draw(|f| render(f, &app))?;
    app.initialize().await;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("LabDesk shutting down");
    Ok(())
}

/// Print the stored user after validating the token with the gateway.
async fn whoami(mut store: SessionStore) -> Result<()> {
    let session = store.initialize().await;
    let Some(user) = session.user() else {
        println!("Not signed in");
        return Ok(());
    };

    if let Some(at) = session.authenticated_at() {
        eprintln!(
            "Session validated at {}",
            at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
        );
    }
    println!("{}", serde_json::to_string_pretty(user)?);
    Ok(())
}

/// Sign in from the command line, prompting for what the environment lacks.
async fn login(mut config: Config, mut store: SessionStore) -> Result<()> {
    store.initialize().await;

    let email = match std::env::var("LABDESK_EMAIL") {
        Ok(email) if !email.trim().is_empty() => email,
        _ => prompt_email(config.last_email.as_deref())?,
    };
    let password = match std::env::var("LABDESK_PASSWORD") {
        Ok(password) if !password.is_empty() => password,
        _ => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };

    let user = store.login(&email, &password).await?;
    config.last_email = Some(email.trim().to_string());
    config.save()?;

    match user.primary_role() {
        Some(role) => println!("Signed in as {} ({})", user.full_name(), role),
        None => println!("Signed in as {}", user.full_name()),
    }
    Ok(())
}

fn prompt_email(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();
    if input.is_empty() {
        return Ok(last.unwrap_or_default().to_string());
    }
    Ok(input.to_string())
}

/// Clear the stored session without contacting the gateway.
fn logout(mut store: SessionStore) -> Result<()> {
    store.logout();
    println!("Signed out");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| render(f, app))?;

        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args_defaults_to_tui() {
        assert_eq!(parse_args(&[]).unwrap(), (Command::Tui, false));
    }

    #[test]
    fn test_parse_args_commands() {
        assert_eq!(parse_args(&args(&["--whoami"])).unwrap(), (Command::WhoAmI, false));
        assert_eq!(
            parse_args(&args(&["--ephemeral", "--login"])).unwrap(),
            (Command::Login, true)
        );
    }

    #[test]
    fn test_parse_args_rejects_unknown_and_conflicts() {
        assert!(parse_args(&args(&["--verbose"])).is_err());
        assert!(parse_args(&args(&["--login", "--logout"])).is_err());
    }
}
