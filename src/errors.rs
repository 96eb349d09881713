use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::auth::AuthError;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every endpoint: `{"error": "<message>"}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("{0}")]
    Conflict(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Token signing failed: {0}")]
    SigningError(String),

    #[error("Hash error: {0}")]
    HashError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(format!("Validation failed: {}", err))
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InsufficientRole => ServiceError::Forbidden(err.to_string()),
            AuthError::SigningError(msg) => ServiceError::SigningError(msg),
            AuthError::MissingToken
            | AuthError::TokenInvalid
            | AuthError::TokenExpired
            | AuthError::InvalidCredentials => ServiceError::Unauthenticated(err.to_string()),
        }
    }
}

impl ServiceError {
    pub fn invalid_quantity() -> Self {
        ServiceError::ValidationError("Quantity must be greater than zero".to_string())
    }

    pub fn product_not_found(id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("Product {} not found", id))
    }

    pub fn line_not_found(id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("Cart item {} not found in this cart", id))
    }

    /// Maps a unique-constraint violation to `Conflict`, leaving other
    /// database errors untouched.
    pub fn from_write(err: DbErr, conflict_message: impl Into<String>) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                ServiceError::Conflict(conflict_message.into())
            }
            _ => ServiceError::DatabaseError(err),
        }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::EmptyCart => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) | Self::InsufficientStock(_) => StatusCode::CONFLICT,
            Self::DatabaseError(_)
            | Self::SigningError(_)
            | Self::HashError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::SigningError(_) | Self::HashError(_) | Self::InternalError(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: self.response_message(),
            request_id: current_request_id(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use test_case::test_case;

    #[tokio::test]
    async fn error_body_carries_message_and_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("Order 7 not found".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.error, "Order 7 not found");
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
    }

    #[tokio::test]
    async fn error_body_omits_request_id_outside_a_request() {
        let response = ServiceError::EmptyCart.into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload, serde_json::json!({ "error": "Cart is empty" }));
    }

    #[test_case(ServiceError::ValidationError("x".into()), StatusCode::BAD_REQUEST)]
    #[test_case(ServiceError::EmptyCart, StatusCode::BAD_REQUEST)]
    #[test_case(ServiceError::Unauthenticated("x".into()), StatusCode::UNAUTHORIZED)]
    #[test_case(ServiceError::Forbidden("x".into()), StatusCode::FORBIDDEN)]
    #[test_case(ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND)]
    #[test_case(ServiceError::Conflict("x".into()), StatusCode::CONFLICT)]
    #[test_case(ServiceError::InsufficientStock("x".into()), StatusCode::CONFLICT)]
    #[test_case(ServiceError::InternalError("x".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    #[test_case(ServiceError::DatabaseError(DbErr::Custom("x".into())), StatusCode::INTERNAL_SERVER_ERROR)]
    fn service_error_status_code_mapping(err: ServiceError, expected: StatusCode) {
        assert_eq!(err.status_code(), expected);
    }

    #[test]
    fn response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("relation missing".into()))
                .response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::HashError("argon2 params".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::SigningError("bad key".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::invalid_quantity().response_message(),
            "Quantity must be greater than zero"
        );
    }

    #[test]
    fn auth_errors_split_between_401_and_403() {
        assert_eq!(
            ServiceError::from(AuthError::TokenExpired).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::from(AuthError::MissingToken).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::from(AuthError::InsufficientRole).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::from(AuthError::SigningError("x".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
