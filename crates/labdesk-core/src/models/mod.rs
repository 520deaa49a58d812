//! Data models exchanged with the API gateway.
//!
//! - `UserRecord`: the authenticated user snapshot with roles and permissions
//! - `LoginResponse`: body returned by the login endpoint

pub mod user;

pub use user::{LoginResponse, UserRecord};
