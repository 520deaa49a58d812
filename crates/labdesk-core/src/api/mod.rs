//! REST client module for the laboratory API gateway.
//!
//! This module provides the `ApiClient` for the gateway's authentication
//! endpoints and the `ApiError` shape every failure is normalised into.
//!
//! The gateway uses JWT bearer tokens obtained from `/api/v1/auth/login`.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthGateway};
pub use error::ApiError;
