//! Core library for the LabDesk back office client.
//!
//! - `api`: HTTP client for the laboratory API gateway
//! - `auth`: session store and durable storage backends
//! - `authz`: permission tokens and authorization predicates
//! - `nav`: route table, route guard and navigation menu filter
//! - `models`: wire types shared across modules
//! - `config`: application configuration

pub mod api;
pub mod auth;
pub mod authz;
pub mod config;
pub mod models;
pub mod nav;

pub use api::{ApiClient, ApiError, AuthGateway};
pub use auth::{Session, SessionError, SessionStore};
pub use authz::Permission;
pub use config::Config;
pub use models::UserRecord;
