// src/error.rs

use auth_session_api::ErrorResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::db::error::RepositoryError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    // === Erreurs d'Authentification ===
    /// Bad credentials, missing/invalid/expired access token, vanished user.
    #[error("{0}")]
    Authentication(String),
    /// Malformed credential transport (e.g. a non-Bearer Authorization header).
    #[error("{0}")]
    Token(String),
    /// Missing, unknown, expired or already-revoked refresh token.
    #[error("{0}")]
    RefreshToken(String),

    // === Erreurs de Validation ===
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    // === Erreurs métier ===
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    NotFound(String),
    #[allow(dead_code, reason = "Part of the error taxonomy; no workflow raises it yet")]
    #[error("{message}")]
    BusinessRule {
        message: String,
        details: Option<Value>,
    },
    #[allow(dead_code, reason = "Base domain error; no workflow raises it yet")]
    #[error("{message}")]
    Domain {
        message: String,
        details: Option<Value>,
    },

    // === Erreurs internes ===
    #[error("Internal server error: {0}")]
    Internal(String),
}

struct ErrorInfo {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<Value>,
    /// Logged, never sent to the client.
    internal_detail: Option<String>,
}

impl ErrorInfo {
    fn public(
        status: StatusCode,
        code: &'static str,
        message: &str,
        details: Option<&Value>,
    ) -> Self {
        Self {
            status,
            code,
            message: message.to_string(),
            details: details.cloned(),
            internal_detail: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let info = self.error_info();

        if let Some(ref detail) = info.internal_detail {
            tracing::error!(error_code = info.code, status = %info.status, detail, "Internal server error");
        } else {
            tracing::debug!(error_code = info.code, status = %info.status, "request rejected");
        }

        let body = Json(ErrorResponse {
            error: info.code.to_string(),
            message: info.message,
            details: info.details,
        });

        (info.status, body).into_response()
    }
}

impl AppError {
    fn error_info(&self) -> ErrorInfo {
        match self {
            // 401 Unauthorized
            AppError::Authentication(msg) => {
                ErrorInfo::public(StatusCode::UNAUTHORIZED, "AUTHENTICATION_FAILED", msg, None)
            }
            AppError::Token(msg) => {
                ErrorInfo::public(StatusCode::UNAUTHORIZED, "INVALID_TOKEN", msg, None)
            }
            AppError::RefreshToken(msg) => ErrorInfo::public(
                StatusCode::UNAUTHORIZED,
                "INVALID_REFRESH_TOKEN",
                msg,
                None,
            ),

            // 400 Bad Request
            AppError::Validation { message, details } => ErrorInfo::public(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                message,
                details.as_ref(),
            ),
            AppError::Domain { message, details } => ErrorInfo::public(
                StatusCode::BAD_REQUEST,
                "DOMAIN_ERROR",
                message,
                details.as_ref(),
            ),

            // 403 Forbidden
            AppError::Authorization(msg) => {
                ErrorInfo::public(StatusCode::FORBIDDEN, "FORBIDDEN", msg, None)
            }

            // 404 Not Found
            AppError::NotFound(msg) => {
                ErrorInfo::public(StatusCode::NOT_FOUND, "NOT_FOUND", msg, None)
            }

            // 422 Unprocessable Entity
            AppError::BusinessRule { message, details } => ErrorInfo::public(
                StatusCode::UNPROCESSABLE_ENTITY,
                "BUSINESS_RULE_VIOLATION",
                message,
                details.as_ref(),
            ),

            // 500 Internal Server Error
            AppError::Internal(msg) => ErrorInfo {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "INTERNAL_ERROR",
                message: "An internal server error occurred".to_string(),
                details: None,
                internal_detail: Some(msg.clone()),
            },
        }
    }

    // === Constructeurs helpers ===
    pub fn authentication(msg: impl Into<String>) -> Self {
        AppError::Authentication(msg.into())
    }

    pub fn token(msg: impl Into<String>) -> Self {
        AppError::Token(msg.into())
    }

    pub fn refresh_token(msg: impl Into<String>) -> Self {
        AppError::RefreshToken(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation {
            message: msg.into(),
            details: None,
        }
    }

    pub fn validation_with(msg: impl Into<String>, details: Value) -> Self {
        AppError::Validation {
            message: msg.into(),
            details: Some(details),
        }
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        AppError::Authorization(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Retourne le code de statut HTTP
    pub fn status_code(&self) -> StatusCode {
        self.error_info().status
    }
}

// === Conversions automatiques depuis d'autres types d'erreurs ===

/// Store failures that reach this conversion had no more specific meaning at
/// the call site, so they surface as internal errors.
impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::internal(err.to_string())
    }
}

// Needed by `diesel::Connection::transaction`, which reports BEGIN/COMMIT
// failures through the closure's error type.
impl From<diesel::result::Error> for AppError {
    fn from(err: diesel::result::Error) -> Self {
        RepositoryError::from(err).into()
    }
}

impl From<crate::auth::tokens::JwtError> for AppError {
    fn from(err: crate::auth::tokens::JwtError) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<crate::auth::password::PasswordError> for AppError {
    fn from(err: crate::auth::password::PasswordError) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::validation(format!("Invalid JSON: {}", err.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_family_maps_to_401_status() {
        assert_eq!(
            AppError::authentication("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::token("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::refresh_token("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn validation_error_maps_to_400_status() {
        assert_eq!(
            AppError::validation("test").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn authorization_error_maps_to_403_status() {
        assert_eq!(
            AppError::authorization("test").status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn not_found_maps_to_404_status() {
        assert_eq!(
            AppError::not_found("test").status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn business_rule_maps_to_422_status() {
        let err = AppError::BusinessRule {
            message: "rule".to_string(),
            details: None,
        };
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn generic_domain_error_maps_to_400_status() {
        let err = AppError::Domain {
            message: "domain".to_string(),
            details: None,
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_error_maps_to_500_status() {
        assert_eq!(
            AppError::internal("test").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn repository_errors_become_internal() {
        let err = AppError::from(RepositoryError::DatabaseError("connection reset".into()));
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn internal_error_body_hides_the_detail() {
        let response = AppError::internal("password column is null for a@x.com").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "INTERNAL_ERROR");
        assert!(!body.message.contains("a@x.com"));
    }

    #[tokio::test]
    async fn validation_error_body_carries_details() {
        let response = AppError::validation_with(
            "Password too short",
            serde_json::json!({ "field": "password", "min_length": 8 }),
        )
        .into_response();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "VALIDATION_ERROR");
        assert_eq!(body.message, "Password too short");
        assert_eq!(body.details.unwrap()["min_length"], 8);
    }
}
