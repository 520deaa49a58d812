//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use labdesk_core::nav::Route;

use crate::app::{
    can_add_email_char, can_add_password_char, can_add_path_char, App, AppState, LoginFocus,
    PasswordFocus,
};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::ConfirmingLogout => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.logout(),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::EnteringPath => return handle_path_input(app, key),
        AppState::ChangingPassword => return handle_password_input(app, key).await,
        AppState::Quitting => return Ok(true),
        AppState::Normal => {}
    }

    if app.session().is_loading() {
        if matches!(key.code, KeyCode::Char('q')) {
            app.state = AppState::ConfirmingQuit;
        }
        return Ok(false);
    }

    if app.route.is_public() && !app.session().is_authenticated() {
        return handle_login_input(app, key).await;
    }

    app.status_message = None;
    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char('l') => app.state = AppState::ConfirmingLogout,
        KeyCode::Char('g') => app.start_path_entry(),
        KeyCode::Char('r') => app.refresh_user().await,
        KeyCode::Char('c') if app.route == Route::Profile => app.start_password_change(),
        KeyCode::Char(c @ '1'..='9') => {
            if let Some(index) = c.to_digit(10) {
                app.select_tab(index as usize - 1);
            }
        }
        KeyCode::Right | KeyCode::Tab => app.next_tab(),
        KeyCode::Left | KeyCode::BackTab => app.prev_tab(),
        KeyCode::Esc => app.navigate(Route::Dashboard),
        _ => {}
    }
    Ok(false)
}

fn handle_path_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Normal;
            app.path_input.clear();
        }
        KeyCode::Enter => app.submit_path(),
        KeyCode::Backspace => {
            app.path_input.pop();
        }
        KeyCode::Char(c) => {
            if can_add_path_char(app.path_input.chars().count(), c) {
                app.path_input.push(c);
            }
        }
        _ => {}
    }
    Ok(false)
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::ConfirmingQuit;
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = app.login_focus.next();
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = app.login_focus.prev();
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Email => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => {
                app.login_focus = LoginFocus::Button;
                app.attempt_login().await;
            }
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Email => {
                app.login_email.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Email => {
                if can_add_email_char(app.login_email.chars().count(), c) {
                    app.login_email.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}

async fn handle_password_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.current_password.clear();
            app.new_password.clear();
            app.state = AppState::Normal;
        }
        KeyCode::Tab | KeyCode::Down | KeyCode::Up | KeyCode::BackTab => {
            app.password_focus = match app.password_focus {
                PasswordFocus::Current => PasswordFocus::New,
                PasswordFocus::New => PasswordFocus::Current,
            };
        }
        KeyCode::Enter => match app.password_focus {
            PasswordFocus::Current => app.password_focus = PasswordFocus::New,
            PasswordFocus::New => app.submit_password_change().await,
        },
        KeyCode::Backspace => {
            match app.password_focus {
                PasswordFocus::Current => app.current_password.pop(),
                PasswordFocus::New => app.new_password.pop(),
            };
        }
        KeyCode::Char(c) => {
            let field = match app.password_focus {
                PasswordFocus::Current => &mut app.current_password,
                PasswordFocus::New => &mut app.new_password,
            };
            if can_add_password_char(field.chars().count(), c) {
                field.push(c);
            }
        }
        _ => {}
    }
    Ok(false)
}
