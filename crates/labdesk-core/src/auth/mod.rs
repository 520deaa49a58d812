//! Authentication module: the session store and its durable storage.
//!
//! This module provides:
//! - `Session`: snapshot of who is signed in, read by guards and menus
//! - `SessionStore`: the only writer of the session (initialize, login,
//!   logout, update_user, change_password)
//! - `DurableStorage`: file, keychain and in-memory backends
//!
//! The token and user snapshot are persisted under the `access_token` and
//! `user` keys and re-validated against the gateway on startup.

pub mod session;
pub mod storage;

pub use session::{check_password_strength, Session, SessionError, SessionStore, TOKEN_KEY, USER_KEY};
pub use storage::{DurableStorage, FileStorage, KeyringStorage, MemoryStorage};
