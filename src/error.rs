use std::fmt::Display;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::auth::services::AuthError;

/// Success envelope: `{success: true, message?, data?}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Failure envelope `{success: false, message, error?}` with its status code.
/// `error` carries internal detail and is only filled in debug mode.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<String>,
}

#[derive(Serialize)]
struct FailureBody<'a> {
    success: bool,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
        }
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    pub fn with_detail(mut self, debug: bool, detail: impl Display) -> Self {
        if debug {
            self.detail = Some(detail.to_string());
        }
        self
    }

    pub fn from_auth(err: AuthError, debug: bool) -> Self {
        match err {
            AuthError::Validation(msg) | AuthError::Conflict(msg) => {
                Self::new(StatusCode::BAD_REQUEST, msg)
            }
            AuthError::Unauthorized(msg) => Self::new(StatusCode::UNAUTHORIZED, msg),
            AuthError::Token(e) => Self::new(StatusCode::UNAUTHORIZED, AuthError::Token(e).to_string())
                .with_detail(debug, e),
            AuthError::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, msg),
            AuthError::Internal(e) => {
                error!(error = %format!("{e:#}"), "internal error");
                Self::internal().with_detail(debug, format!("{e:#}"))
            }
        }
    }

    pub fn invalid_body(debug: bool, detail: impl Display) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid request body").with_detail(debug, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = FailureBody {
            success: false,
            message: &self.message,
            error: self.detail.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenError;

    #[test]
    fn status_mapping() {
        let cases = [
            (AuthError::Validation("v".into()), StatusCode::BAD_REQUEST),
            (AuthError::Conflict("c".into()), StatusCode::BAD_REQUEST),
            (AuthError::Unauthorized("u".into()), StatusCode::UNAUTHORIZED),
            (AuthError::Token(TokenError::Expired), StatusCode::UNAUTHORIZED),
            (AuthError::NotFound("n".into()), StatusCode::NOT_FOUND),
            (AuthError::Internal(anyhow::anyhow!("db down")), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from_auth(err, false).status, status);
        }
    }

    #[test]
    fn detail_only_in_debug() {
        let quiet = ApiError::from_auth(AuthError::Internal(anyhow::anyhow!("db down")), false);
        assert_eq!(quiet.message, "Internal server error");
        assert!(quiet.detail.is_none());

        let loud = ApiError::from_auth(AuthError::Internal(anyhow::anyhow!("db down")), true);
        assert_eq!(loud.detail.as_deref(), Some("db down"));

        let token = ApiError::from_auth(AuthError::Token(TokenError::Signature), true);
        assert_eq!(token.message, "Invalid token");
        assert_eq!(token.detail.as_deref(), Some("Invalid signature"));
    }

    #[test]
    fn envelopes_skip_empty_fields() {
        let json = serde_json::to_value(Envelope::message("Logged out successfully")).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "message": "Logged out successfully" }));

        let json = serde_json::to_value(Envelope::data(5)).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "data": 5 }));
    }
}
