use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, AuthGateway};
use crate::models::UserRecord;

use super::storage::DurableStorage;

/// Storage key holding the bearer token
pub const TOKEN_KEY: &str = "access_token";

/// Storage key holding the JSON user snapshot
pub const USER_KEY: &str = "user";

/// Minimum length the gateway accepts for a new password
const MIN_PASSWORD_LENGTH: usize = 8;

// ============================================================================
// Session snapshot
// ============================================================================

/// Token and user of a signed-in session. They only ever exist together.
#[derive(Debug, Clone, PartialEq)]
struct Identity {
    token: String,
    user: UserRecord,
    authenticated_at: DateTime<Utc>,
}

/// Who is logged in, as seen by guards, menus and views.
///
/// A session is authenticated exactly when it holds an identity, and an
/// identity cannot be built from an empty token, so an authenticated session
/// always has both a user and a non-empty token.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    loading: bool,
    identity: Option<Identity>,
}

impl Session {
    /// Initial state: nothing known yet, hydration pending.
    pub fn new() -> Self {
        Self {
            loading: true,
            identity: None,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            loading: false,
            identity: None,
        }
    }

    /// A settled, signed-in session. An empty token yields an anonymous one.
    pub fn authenticated(token: impl Into<String>, user: UserRecord) -> Self {
        let token = token.into();
        if token.is_empty() {
            return Self::anonymous();
        }
        Self {
            loading: false,
            identity: Some(Identity {
                token,
                user,
                authenticated_at: Utc::now(),
            }),
        }
    }

    pub fn with_loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn user(&self) -> Option<&UserRecord> {
        self.identity.as_ref().map(|i| &i.user)
    }

    pub fn token(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.token.as_str())
    }

    pub fn authenticated_at(&self) -> Option<DateTime<Utc>> {
        self.identity.as_ref().map(|i| i.authenticated_at)
    }

    /// Minutes since login or hydration (for display)
    pub fn minutes_signed_in(&self) -> Option<i64> {
        self.authenticated_at()
            .map(|at| (Utc::now() - at).num_minutes().max(0))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failure of a session operation. `Display` is the message shown to users.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("Session storage failed: {0:#}")]
    Storage(anyhow::Error),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Email and password required")]
    MissingCredentials,

    #[error("{0}")]
    WeakPassword(&'static str),
}

impl SessionError {
    /// Whether the error came from the gateway rejecting the token.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, SessionError::Api(e) if e.is_authentication_failure())
    }
}

/// Client-side strength rule the gateway enforces for new passwords.
pub fn check_password_strength(password: &str) -> Result<(), SessionError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(SessionError::WeakPassword(
            "Password must be at least 8 characters",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(SessionError::WeakPassword(
            "Password must contain at least one number",
        ));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(SessionError::WeakPassword(
            "Password must contain at least one uppercase letter",
        ));
    }
    Ok(())
}

// ============================================================================
// Session store
// ============================================================================

/// Single owner and writer of the [`Session`].
///
/// Everything else reads the snapshot returned by [`SessionStore::session`].
pub struct SessionStore {
    storage: Box<dyn DurableStorage>,
    gateway: Arc<dyn AuthGateway>,
    session: Session,
}

impl SessionStore {
    pub fn new(storage: Box<dyn DurableStorage>, gateway: Arc<dyn AuthGateway>) -> Self {
        Self {
            storage,
            gateway,
            session: Session::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Hydrate from durable storage and validate the stored token.
    ///
    /// Ends with `loading == false` whatever happens. A stored session that
    /// cannot be read or that the gateway rejects is wiped from storage.
    pub async fn initialize(&mut self) -> &Session {
        if !self.session.loading {
            debug!("Session already initialized");
            return &self.session;
        }

        match self.hydrate().await {
            Ok(Some(session)) => {
                info!(user_id = session.user().map(|u| u.id), "Session restored");
                self.session = session;
            }
            Ok(None) => debug!("No stored session"),
            Err(e) => {
                warn!(error = %e, "Stored session rejected, clearing storage");
                self.clear_storage();
            }
        }

        self.session.loading = false;
        &self.session
    }

    async fn hydrate(&self) -> Result<Option<Session>, SessionError> {
        let token = self
            .storage
            .get(TOKEN_KEY)
            .map_err(SessionError::Storage)?
            .filter(|t| !t.is_empty());
        let user = self.storage.get(USER_KEY).map_err(SessionError::Storage)?;

        let (token, user) = match (token, user) {
            (Some(token), Some(user)) => (token, user),
            (None, None) => return Ok(None),
            _ => {
                debug!("Incomplete stored session, clearing storage");
                self.clear_storage();
                return Ok(None);
            }
        };

        let user: UserRecord = serde_json::from_str(&user).map_err(|e| {
            SessionError::Storage(anyhow::Error::new(e).context("Stored user is not valid JSON"))
        })?;

        self.gateway.verify_token(&token).await?;

        Ok(Some(Session::authenticated(token, user)))
    }

    /// Sign in with the gateway.
    ///
    /// Storage is written before the in-memory session changes. On any
    /// failure the in-memory session is left as it was.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<UserRecord, SessionError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(SessionError::MissingCredentials);
        }

        let response = self.gateway.login(email, password).await.map_err(|e| {
            error!(error = %e, "Login failed");
            SessionError::from(e)
        })?;

        if response.access_token.is_empty() {
            return Err(ApiError::InvalidResponse("empty access token".to_string()).into());
        }

        if let Err(e) = self.persist(&response.access_token, &response.user) {
            error!(error = %e, "Failed to persist session");
            self.restore_storage();
            return Err(e);
        }

        let loading = self.session.loading;
        self.session = Session::authenticated(response.access_token, response.user.clone())
            .with_loading(loading);
        info!(user_id = response.user.id, "Login successful");
        Ok(response.user)
    }

    /// Sign out locally. Never fails and needs no network.
    pub fn logout(&mut self) {
        if self.session.is_authenticated() {
            info!("Logging out");
        }
        self.clear_storage();
        self.session.identity = None;
    }

    /// Re-fetch the current user and replace the snapshot wholesale.
    ///
    /// A rejected token ends the session; any other failure keeps the
    /// previous snapshot.
    pub async fn update_user(&mut self) -> Result<UserRecord, SessionError> {
        let token = self
            .session
            .token()
            .ok_or(SessionError::NotAuthenticated)?
            .to_string();

        let user = match self.gateway.current_user(&token).await {
            Ok(user) => user,
            Err(e) => {
                self.handle_api_error(&e);
                return Err(e.into());
            }
        };

        let snapshot = serde_json::to_string(&user)
            .map_err(|e| SessionError::Storage(e.into()))?;
        self.storage
            .set(USER_KEY, &snapshot)
            .map_err(SessionError::Storage)?;

        if let Some(identity) = self.session.identity.as_mut() {
            identity.user = user.clone();
        }
        debug!(user_id = user.id, "User snapshot refreshed");
        Ok(user)
    }

    pub async fn change_password(
        &mut self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), SessionError> {
        let token = self
            .session
            .token()
            .ok_or(SessionError::NotAuthenticated)?
            .to_string();
        if current_password.is_empty() {
            return Err(SessionError::MissingCredentials);
        }
        check_password_strength(new_password)?;

        if let Err(e) = self
            .gateway
            .change_password(&token, current_password, new_password)
            .await
        {
            self.handle_api_error(&e);
            return Err(e.into());
        }
        info!("Password changed");
        Ok(())
    }

    /// Apply the session policy for a failed gateway call.
    ///
    /// A rejected token forces a logout and returns `true`, meaning the
    /// caller should redirect to the login route. Anything else leaves the
    /// session alone.
    pub fn handle_api_error(&mut self, err: &ApiError) -> bool {
        if err.is_authentication_failure() && self.session.is_authenticated() {
            warn!("Session expired, forcing logout");
            self.logout();
            return true;
        }
        false
    }

    fn persist(&self, token: &str, user: &UserRecord) -> Result<(), SessionError> {
        let snapshot = serde_json::to_string(user).map_err(|e| SessionError::Storage(e.into()))?;
        self.storage
            .set(TOKEN_KEY, token)
            .map_err(SessionError::Storage)?;
        self.storage
            .set(USER_KEY, &snapshot)
            .map_err(SessionError::Storage)?;
        Ok(())
    }

    /// Bring storage back in line with memory after a failed write.
    fn restore_storage(&self) {
        let restored = match self.session.identity {
            Some(ref identity) => self.persist(&identity.token, &identity.user),
            None => {
                self.clear_storage();
                Ok(())
            }
        };
        if let Err(e) = restored {
            warn!(error = %e, "Failed to restore stored session");
        }
    }

    fn clear_storage(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "Failed to clear storage entry");
            }
        }
    }
}
