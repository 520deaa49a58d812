//! Application state management for LabDesk.
//!
//! This module contains the `App` struct that owns the session store and
//! all UI state: the current route, the login and password forms, and the
//! overlays. Every navigation goes through the route guard.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use labdesk_core::api::ApiClient;
use labdesk_core::auth::{
    DurableStorage, FileStorage, KeyringStorage, MemoryStorage, Session, SessionStore,
};
use labdesk_core::config::{Config, StorageBackend};
use labdesk_core::nav::{filter_menu, resolve, sidebar, Guarded, MenuEntry, Route, LOGIN_ROUTE};

// ============================================================================
// Constants
// ============================================================================

/// Maximum length for email input.
const MAX_EMAIL_LENGTH: usize = 80;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum length of a typed route path.
const MAX_PATH_LENGTH: usize = 120;

/// Redirect chains longer than this indicate a routing loop.
const MAX_REDIRECTS: usize = 4;

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    EnteringPath,
    ChangingPassword,
    ConfirmingLogout,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Email,
    Password,
    Button,
}

impl LoginFocus {
    pub fn next(&self) -> Self {
        match self {
            LoginFocus::Email => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::Button,
            LoginFocus::Button => LoginFocus::Email,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            LoginFocus::Email => LoginFocus::Button,
            LoginFocus::Password => LoginFocus::Email,
            LoginFocus::Button => LoginFocus::Password,
        }
    }
}

/// Change-password form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordFocus {
    Current,
    New,
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    pub config: Config,
    /// Where `last_email` is saved; `None` disables saving.
    pub config_path: Option<PathBuf>,
    pub store: SessionStore,
    pub menu: Vec<MenuEntry>,

    pub state: AppState,
    pub route: Route,

    // Login form state
    pub login_email: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // Change password form state
    pub current_password: String,
    pub new_password: String,
    pub password_focus: PasswordFocus,
    pub password_error: Option<String>,

    // Go-to-path prompt
    pub path_input: String,

    pub status_message: Option<String>,
}

/// Open the durable storage backend the config selects.
pub fn open_storage(config: &Config, ephemeral: bool) -> Result<Box<dyn DurableStorage>> {
    if ephemeral {
        return Ok(Box::new(MemoryStorage::new()));
    }
    let storage: Box<dyn DurableStorage> = match config.storage_backend {
        StorageBackend::File => Box::new(FileStorage::new(&config.data_dir()?)),
        StorageBackend::Keyring => Box::new(KeyringStorage::new()),
    };
    Ok(storage)
}

/// Build a session store against the configured gateway.
pub fn build_store(config: &Config, ephemeral: bool) -> Result<SessionStore> {
    let storage = open_storage(config, ephemeral)?;
    let api = ApiClient::from_config(config).context("Failed to build API client")?;
    Ok(SessionStore::new(storage, Arc::new(api)))
}

impl App {
    pub fn new(config: Config, store: SessionStore) -> Self {
        let login_email = std::env::var("LABDESK_EMAIL")
            .ok()
            .or_else(|| config.last_email.clone())
            .unwrap_or_default();
        let login_password = std::env::var("LABDESK_PASSWORD").unwrap_or_default();
        let login_focus = if login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };

        let config_path = match Config::config_path() {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "No config directory, last email will not be saved");
                None
            }
        };

        Self {
            config,
            config_path,
            store,
            menu: sidebar(),
            state: AppState::Normal,
            route: Route::Dashboard,
            login_email,
            login_password,
            login_focus,
            login_error: None,
            current_password: String::new(),
            new_password: String::new(),
            password_focus: PasswordFocus::Current,
            password_error: None,
            path_input: String::new(),
            status_message: None,
        }
    }

    pub fn session(&self) -> &Session {
        self.store.session()
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Menu entries the current session may see, in sidebar order.
    pub fn visible_menu(&self) -> Vec<&MenuEntry> {
        filter_menu(&self.menu, self.session())
    }

    /// What the current route shows right now.
    pub fn current_view(&self) -> Guarded<Route> {
        resolve(&self.route, self.session())
    }

    /// Move to a route, following redirects.
    pub fn navigate(&mut self, route: Route) {
        debug!(route = %route, "Navigate");
        self.route = route;
        self.follow_redirects();
    }

    /// Re-resolve the current route after the session changed.
    pub fn follow_redirects(&mut self) {
        for _ in 0..MAX_REDIRECTS {
            match self.current_view() {
                Guarded::Redirect(target) => {
                    debug!(from = %self.route, to = %target, "Redirect");
                    self.route = target;
                }
                _ => return,
            }
        }
        warn!(route = %self.route, "Redirect loop, falling back to login");
        self.route = LOGIN_ROUTE;
    }

    /// Index of the current route in the visible menu, if it has a tab.
    pub fn selected_tab(&self) -> Option<usize> {
        self.visible_menu()
            .iter()
            .position(|entry| entry.route == self.route)
    }

    pub fn select_tab(&mut self, index: usize) {
        let target = self.visible_menu().get(index).map(|e| e.route.clone());
        if let Some(route) = target {
            self.navigate(route);
        }
    }

    pub fn next_tab(&mut self) {
        let count = self.visible_menu().len();
        if count == 0 {
            return;
        }
        let next = self.selected_tab().map(|i| (i + 1) % count).unwrap_or(0);
        self.select_tab(next);
    }

    pub fn prev_tab(&mut self) {
        let count = self.visible_menu().len();
        if count == 0 {
            return;
        }
        let prev = self
            .selected_tab()
            .map(|i| (i + count - 1) % count)
            .unwrap_or(0);
        self.select_tab(prev);
    }

    pub fn start_path_entry(&mut self) {
        self.path_input = self.route.path();
        self.state = AppState::EnteringPath;
    }

    pub fn submit_path(&mut self) {
        let route = Route::parse(&self.path_input);
        self.state = AppState::Normal;
        self.navigate(route);
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Hydrate the session and land on the right screen.
    pub async fn initialize(&mut self) {
        self.store.initialize().await;
        self.follow_redirects();
        if self.route == LOGIN_ROUTE {
            self.reset_login_focus();
        }
    }

    fn reset_login_focus(&mut self) {
        self.login_focus = if self.login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) {
        let email = self.login_email.trim().to_string();
        let password = self.login_password.clone();

        match self.store.login(&email, &password).await {
            Ok(user) => {
                self.login_error = None;
                self.login_password.clear();

                self.config.last_email = Some(email);
                if let Some(ref path) = self.config_path {
                    if let Err(e) = self.config.save_to(path) {
                        warn!(error = %e, "Failed to save config");
                    }
                }

                self.status_message = Some(format!("Bienvenido, {}", user.first_name));
                self.follow_redirects();
            }
            Err(e) => {
                self.login_error = Some(e.to_string());
            }
        }
    }

    pub fn logout(&mut self) {
        self.store.logout();
        self.state = AppState::Normal;
        self.status_message = Some("Sesion cerrada".to_string());
        self.navigate(LOGIN_ROUTE);
        self.reset_login_focus();
    }

    /// Re-fetch the user after a profile change.
    pub async fn refresh_user(&mut self) {
        match self.store.update_user().await {
            Ok(_) => {
                self.status_message = Some("Perfil actualizado".to_string());
            }
            Err(e) => {
                if e.is_authentication_failure() {
                    info!("Session expired during refresh");
                    self.status_message = Some("Sesion expirada. Inicia sesion nuevamente.".to_string());
                    self.follow_redirects();
                    self.reset_login_focus();
                } else {
                    self.status_message = Some(format!("Error: {}", e));
                }
            }
        }
    }

    pub fn start_password_change(&mut self) {
        self.current_password.clear();
        self.new_password.clear();
        self.password_focus = PasswordFocus::Current;
        self.password_error = None;
        self.state = AppState::ChangingPassword;
    }

    pub async fn submit_password_change(&mut self) {
        let current = std::mem::take(&mut self.current_password);
        let new = std::mem::take(&mut self.new_password);

        match self.store.change_password(&current, &new).await {
            Ok(()) => {
                self.state = AppState::Normal;
                self.status_message = Some("Contrasena actualizada".to_string());
            }
            Err(e) if e.is_authentication_failure() => {
                self.state = AppState::Normal;
                self.status_message = Some("Sesion expirada. Inicia sesion nuevamente.".to_string());
                self.follow_redirects();
                self.reset_login_focus();
            }
            Err(e) => {
                self.password_focus = PasswordFocus::Current;
                self.password_error = Some(e.to_string());
            }
        }
    }
}

// ============================================================================
// Input validation
// ============================================================================

fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    current_len < MAX_EMAIL_LENGTH && is_valid_input_char(c) && !c.is_whitespace()
}

pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

pub fn can_add_path_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PATH_LENGTH && is_valid_input_char(c) && !c.is_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use labdesk_core::api::{ApiError, AuthGateway};
    use labdesk_core::models::{LoginResponse, UserRecord};

    /// Gateway that accepts one password and rejects every token lookup.
    struct ScriptedGateway {
        user: UserRecord,
    }

    #[async_trait]
    impl AuthGateway for ScriptedGateway {
        async fn login(&self, _email: &str, password: &str) -> Result<LoginResponse, ApiError> {
            if password != "Secret123" {
                return Err(ApiError::Unauthorized("Credenciales incorrectas".to_string()));
            }
            Ok(LoginResponse {
                access_token: "tok".to_string(),
                token_type: "bearer".to_string(),
                user: self.user.clone(),
            })
        }

        async fn current_user(&self, _token: &str) -> Result<UserRecord, ApiError> {
            Err(ApiError::Unauthorized("expired".to_string()))
        }

        async fn verify_token(&self, _token: &str) -> Result<(), ApiError> {
            Ok(())
        }

        async fn change_password(&self, _t: &str, _c: &str, _n: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn app_for(user: UserRecord) -> App {
        let store = SessionStore::new(
            Box::new(MemoryStorage::new()),
            Arc::new(ScriptedGateway { user }),
        );
        let mut app = App::new(Config::default(), store);
        app.config_path = None;
        app.login_email = "ana@lab.pe".to_string();
        app
    }

    fn receptionist() -> UserRecord {
        UserRecord::new(7, "Ana", "Quispe", "ana@lab.pe")
            .with_roles(["Recepcionista"])
            .with_permissions(["orders:read", "orders:write", "patients:read"])
    }

    #[test]
    fn test_loading_route_is_not_redirected() {
        let mut app = app_for(receptionist());
        app.follow_redirects();
        assert_eq!(app.route, Route::Dashboard);
        assert_eq!(app.current_view(), Guarded::Loading);
    }

    #[tokio::test]
    async fn test_initialize_without_session_lands_on_login() {
        let mut app = app_for(receptionist());
        app.initialize().await;
        assert_eq!(app.route, Route::Login);
        assert_eq!(app.login_focus, LoginFocus::Password);
    }

    #[tokio::test]
    async fn test_login_moves_to_dashboard() {
        let mut app = app_for(receptionist());
        app.initialize().await;

        app.login_password = "wrong".to_string();
        app.attempt_login().await;
        assert_eq!(app.login_error.as_deref(), Some("Credenciales incorrectas"));
        assert_eq!(app.route, Route::Login);

        app.login_password = "Secret123".to_string();
        app.attempt_login().await;
        assert!(app.login_error.is_none());
        assert!(app.login_password.is_empty());
        assert_eq!(app.route, Route::Dashboard);
    }

    #[tokio::test]
    async fn test_login_saves_last_email_to_config_path() {
        let dir = std::env::temp_dir().join(format!("labdesk-app-{}", std::process::id()));
        let path = dir.join("config.json");

        let mut app = app_for(receptionist());
        app.config_path = Some(path.clone());
        app.initialize().await;
        app.login_password = "Secret123".to_string();
        app.attempt_login().await;

        let saved: Config = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.last_email.as_deref(), Some("ana@lab.pe"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_tabs_follow_filtered_menu() {
        let mut app = app_for(receptionist());
        app.initialize().await;
        app.login_password = "Secret123".to_string();
        app.attempt_login().await;

        let labels: Vec<String> = app.visible_menu().iter().map(|e| e.label.clone()).collect();
        assert_eq!(labels, vec!["Dashboard", "Catalogo", "Pacientes", "Ordenes", "Perfil"]);

        app.select_tab(3);
        assert_eq!(app.route, Route::Orders);
        app.next_tab();
        assert_eq!(app.route, Route::Profile);
        app.next_tab();
        assert_eq!(app.route, Route::Dashboard);
        app.prev_tab();
        assert_eq!(app.route, Route::Profile);
    }

    #[tokio::test]
    async fn test_typed_path_goes_through_guard() {
        let mut app = app_for(receptionist());
        app.initialize().await;
        app.login_password = "Secret123".to_string();
        app.attempt_login().await;

        app.path_input = "/dashboard/usuarios/new".to_string();
        app.submit_path();
        assert_eq!(app.route, Route::UserNew);
        assert_eq!(app.current_view(), Guarded::AccessDenied);

        app.path_input = "/login".to_string();
        app.submit_path();
        assert_eq!(app.route, Route::Dashboard);
    }

    #[tokio::test]
    async fn test_expired_token_on_refresh_returns_to_login() {
        let mut app = app_for(receptionist());
        app.initialize().await;
        app.login_password = "Secret123".to_string();
        app.attempt_login().await;
        app.navigate(Route::Profile);

        app.refresh_user().await;
        assert!(!app.session().is_authenticated());
        assert_eq!(app.route, Route::Login);
    }

    #[tokio::test]
    async fn test_logout_returns_to_login() {
        let mut app = app_for(receptionist());
        app.initialize().await;
        app.login_password = "Secret123".to_string();
        app.attempt_login().await;

        app.logout();
        assert_eq!(app.route, Route::Login);
        assert!(app.visible_menu().iter().all(|e| e.rule.is_unrestricted()));
    }

    #[test]
    fn test_login_focus_cycle() {
        assert_eq!(LoginFocus::Email.next(), LoginFocus::Password);
        assert_eq!(LoginFocus::Button.next(), LoginFocus::Email);
        assert_eq!(LoginFocus::Email.prev(), LoginFocus::Button);
    }

    #[test]
    fn test_can_add_email_char() {
        assert!(can_add_email_char(0, 'a'));
        assert!(can_add_email_char(0, '@'));
        assert!(!can_add_email_char(0, ' '));
        assert!(!can_add_email_char(MAX_EMAIL_LENGTH, 'a'));
    }

    #[test]
    fn test_can_add_password_char() {
        assert!(can_add_password_char(0, ' '));
        assert!(!can_add_password_char(0, '\n'));
        assert!(!can_add_password_char(MAX_PASSWORD_LENGTH, 'a'));
    }
}
