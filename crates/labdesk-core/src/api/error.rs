use serde::Deserialize;
use thiserror::Error;

/// Normalised failure of a gateway call.
///
/// Every error leaving `ApiClient` has one of these shapes, so callers never
/// look at raw HTTP responses.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No response from server")]
    NoResponse(#[source] reqwest::Error),

    #[error("Request could not be built: {0}")]
    Request(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Request failed ({status}): {message}")]
    Unexpected { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body shape produced by the gateway services.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Extract the human-readable `detail` from an error body.
    ///
    /// `detail` is either a string or, for 422 responses, a list of
    /// `{ "msg": ... }` objects which are joined with `, `.
    fn detail_message(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        match parsed.detail? {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Array(items) => {
                let messages: Vec<String> = items
                    .iter()
                    .map(|item| match item.get("msg").and_then(|m| m.as_str()) {
                        Some(msg) => msg.to_string(),
                        None => item.to_string(),
                    })
                    .collect();
                Some(messages.join(", "))
            }
            other => Some(other.to_string()),
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::detail_message(body).unwrap_or_else(|| {
            if body.trim().is_empty() {
                "Request failed".to_string()
            } else {
                Self::truncate_body(body)
            }
        });
        match status.as_u16() {
            401 => ApiError::Unauthorized(message),
            403 => ApiError::Forbidden(message),
            404 => ApiError::NotFound(message),
            422 => ApiError::Validation(message),
            500..=599 => ApiError::ServerError(message),
            code => ApiError::Unexpected {
                status: code,
                message,
            },
        }
    }

    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ApiError::Request(err.to_string())
        } else if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::NoResponse(err)
        }
    }

    /// Status code in the gateway's normalised shape: the HTTP status,
    /// `0` when no response arrived, `-1` when the request never left.
    pub fn status_code(&self) -> i32 {
        match self {
            ApiError::NoResponse(_) => 0,
            ApiError::Request(_) => -1,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Validation(_) => 422,
            ApiError::ServerError(_) => 500,
            ApiError::Unexpected { status, .. } => i32::from(*status),
            ApiError::InvalidResponse(_) => 200,
        }
    }

    /// True for a rejected or expired token, which must end the session.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_uses_string_detail() {
        let err = ApiError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"detail": "Token expirado"}"#,
        );
        assert!(err.is_authentication_failure());
        assert_eq!(err.to_string(), "Token expirado");
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn test_from_status_joins_validation_list() {
        let body = r#"{"detail": [{"msg": "field required"}, {"msg": "invalid email"}]}"#;
        let err = ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert!(matches!(err, ApiError::Validation(ref m) if m == "field required, invalid email"));
    }

    #[test]
    fn test_from_status_forbidden_is_not_auth_failure() {
        let err = ApiError::from_status(StatusCode::FORBIDDEN, "");
        assert!(!err.is_authentication_failure());
        assert_eq!(err.to_string(), "Request failed");
    }

    #[test]
    fn test_from_status_server_error_and_unexpected() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(err, ApiError::ServerError(ref m) if m == "upstream down"));

        let err = ApiError::from_status(StatusCode::CONFLICT, r#"{"detail": "Duplicado"}"#);
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.to_string(), "Request failed (409): Duplicado");
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.contains("truncated"));
    }

    #[test]
    fn test_truncate_body_respects_char_boundary() {
        let long = "ñ".repeat(MAX_ERROR_BODY_LENGTH);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated"));
    }
}
