/*!
 * # Authentication and Authorization Module
 *
 * Issues and verifies HS256 session tokens carrying a subject id and a role,
 * and provides the router middleware that guards endpoints by role.
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::ServiceError;

mod password;
mod rbac;

pub use password::{hash_password, verify_password};
pub use rbac::{authorize, Permission, Role};

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Subject (user ID)
    pub role: String, // Role name
    pub iat: i64,     // Issued at time
    pub exp: i64,     // Expiration time
}

/// Authenticated caller extracted from the bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub subject_id: String,
    pub role: String,
}

impl AuthUser {
    /// The caller's user id; the subject of every token we issue is a UUID.
    pub fn user_id(&self) -> Result<Uuid, ServiceError> {
        Uuid::parse_str(&self.subject_id).map_err(|_| AuthError::TokenInvalid.into())
    }

    pub fn role(&self) -> Option<Role> {
        Role::from_str(&self.role).ok()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role() == Some(role)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AuthError::MissingToken.into())
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiry: ChronoDuration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, token_expiry_days: i64) -> Self {
        Self {
            jwt_secret,
            token_expiry: ChronoDuration::days(token_expiry_days),
        }
    }

    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self::new(cfg.jwt_secret.clone(), cfg.token_expiry_days)
    }
}

/// Token issuance and verification. Holds no mutable state and is shared
/// between requests behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Signs a token for `subject_id` valid for the configured number of days.
    pub fn issue_token(&self, subject_id: &str, role: Role) -> Result<String, AuthError> {
        self.issue_token_at(subject_id, role.as_ref(), Utc::now())
    }

    /// Signs a token as if it had been issued at `issued_at`.
    pub fn issue_token_at(
        &self,
        subject_id: &str,
        role: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject_id.to_string(),
            role: role.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.config.token_expiry).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::SigningError(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid,
        })
    }

    /// Verifies an `Authorization` header value of the form `Bearer <token>`.
    pub fn verify_bearer(&self, header_value: Option<&str>) -> Result<AuthUser, AuthError> {
        let value = header_value.ok_or(AuthError::MissingToken)?;
        let mut parts = value.split(' ');
        let token = match (parts.next(), parts.next(), parts.next()) {
            (Some("Bearer"), Some(token), None) if !token.is_empty() => token,
            _ => return Err(AuthError::TokenInvalid),
        };

        let claims = self.verify_token(token)?;
        Ok(AuthUser {
            subject_id: claims.sub,
            role: claims.role,
        })
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token is missing")]
    MissingToken,

    #[error("Token is invalid")]
    TokenInvalid,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Insufficient role for this operation")]
    InsufficientRole,

    #[error("Token signing failed: {0}")]
    SigningError(String),
}

/// Makes the shared `AuthService` available to the auth middleware.
pub async fn auth_service_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(auth_service);
    next.run(request).await
}

/// Authentication middleware that extracts and validates the bearer token
pub async fn auth_middleware(mut request: Request, next: Next) -> Result<Response, ServiceError> {
    let auth_service = request
        .extensions()
        .get::<Arc<AuthService>>()
        .cloned()
        .ok_or_else(|| {
            ServiceError::InternalError("Authentication service not available".to_string())
        })?;

    let header_value = match request.headers().get(header::AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| AuthError::TokenInvalid)?),
        None => None,
    };

    let user = auth_service.verify_bearer(header_value).map_err(|e| {
        debug!(error = %e, "rejected bearer token");
        e
    })?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Role middleware; runs after `auth_middleware`.
pub async fn permission_middleware(
    State(permission): State<Permission>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingToken)?;

    if !permission.permits(&user.role) {
        warn!(
            subject = %user.subject_id,
            role = %user.role,
            required = %permission,
            "unauthorized access attempt"
        );
        return Err(AuthError::InsufficientRole.into());
    }

    Ok(next.run(request).await)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: Permission) -> Self;
    fn with_role(self, role: Role) -> Self;
    fn with_exact_role(self, role: Role) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: Permission) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission,
            permission_middleware,
        ))
        .with_auth()
    }

    fn with_role(self, role: Role) -> Self {
        self.with_permission(Permission::AtLeast(role))
    }

    fn with_exact_role(self, role: Role) -> Self {
        self.with_permission(Permission::Exactly(role))
    }
}
