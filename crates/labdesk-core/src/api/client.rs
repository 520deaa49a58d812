//! API client for the laboratory API gateway.
//!
//! This module provides the `ApiClient` struct for calling the gateway's
//! authentication endpoints, and the `AuthGateway` trait the session store
//! is written against.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{LoginResponse, UserRecord};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Path prefix shared by every gateway route
const API_PREFIX: &str = "/api/v1";

const LOGIN_PATH: &str = "/auth/login";
const ME_PATH: &str = "/auth/me";
const VERIFY_TOKEN_PATH: &str = "/auth/verify-token";
const CHANGE_PASSWORD_PATH: &str = "/auth/change-password";

/// The authentication endpoints the session store depends on.
///
/// `ApiClient` is the production implementation; tests script their own.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchange credentials for an access token and user snapshot.
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError>;

    /// Fetch the user the token belongs to.
    async fn current_user(&self, token: &str) -> Result<UserRecord, ApiError>;

    /// Succeeds iff the gateway still accepts the token.
    async fn verify_token(&self, token: &str) -> Result<(), ApiError>;

    async fn change_password(
        &self,
        token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError>;
}

/// HTTP client for the gateway.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::from_transport)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: &str) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token.to_string()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::Request(e.to_string()))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning a normalised error if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status, &body);
        match status.as_u16() {
            401 => warn!(error = %err, "Session rejected by gateway"),
            403 => warn!("Gateway denied the request"),
            _ => debug!(status = status.as_u16(), error = %err, "Gateway request failed"),
        }
        Err(err)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request
            .headers(self.auth_headers()?)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "No response from gateway");
                ApiError::from_transport(e)
            })?;
        Self::check_response(response).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        let response = self.send(self.client.get(&url)).await?;
        response.json().await.map_err(ApiError::from_transport)
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(url = %url, "POST");
        let response = self.send(self.client.post(&url).json(body)).await?;
        response.json().await.map_err(ApiError::from_transport)
    }

    /// POST whose response body is irrelevant beyond its status.
    pub async fn post_empty<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let url = self.url(path);
        debug!(url = %url, "POST");
        self.send(self.client.post(&url).json(body)).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthGateway for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let anonymous = Self {
            token: None,
            ..self.clone()
        };
        anonymous
            .post(LOGIN_PATH, &json!({ "email": email, "password": password }))
            .await
    }

    async fn current_user(&self, token: &str) -> Result<UserRecord, ApiError> {
        self.with_token(token).get(ME_PATH).await
    }

    async fn verify_token(&self, token: &str) -> Result<(), ApiError> {
        self.with_token(token)
            .post_empty(VERIFY_TOKEN_PATH, &json!({}))
            .await
    }

    async fn change_password(
        &self,
        token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        self.with_token(token)
            .post_empty(
                CHANGE_PASSWORD_PATH,
                &json!({
                    "current_password": current_password,
                    "new_password": new_password,
                }),
            )
            .await
    }
}
