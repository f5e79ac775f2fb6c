//! API middleware
//!
//! Contains:
//! - Shared application state
//! - Bearer token authentication and the extractors built on it
//! - The JSON error envelope used by the REST endpoints

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

use crate::api::graphql::{self, AppSchema, WebSchema};
use crate::config::UploadConfig;
use crate::services::{Claims, ServiceError, Services, TokenKind};

// ============================================================================
// Application state
// ============================================================================

/// Application state containing shared services and both GraphQL schemas
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub app_schema: AppSchema,
    pub web_schema: WebSchema,
    pub upload_config: Arc<UploadConfig>,
}

impl AppState {
    pub fn new(services: Services, upload_config: UploadConfig) -> Self {
        Self {
            app_schema: graphql::app_schema(services.clone()),
            web_schema: graphql::web_schema(services.clone()),
            services,
            upload_config: Arc::new(upload_config),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Internal(e) => {
                error!(error = %e, "request failed");
                ApiError::internal_error("Internal server error")
            }
            other => {
                debug!(code = other.code(), error = %other, "request refused");
                ApiError::new(other.code(), other.to_string())
            }
        }
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Token from an `Authorization: Bearer <jwt>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Attach the claims of a valid access token to the request. Requests
/// without one pass through unauthenticated.
pub async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let claims = bearer_token(request.headers()).and_then(|token| {
        state
            .services
            .tokens
            .verify(token, TokenKind::Access)
            .map_err(|e| debug!(error = %e, "ignoring bearer token"))
            .ok()
    });
    if let Some(claims) = claims {
        request.extensions_mut().insert(claims);
    }
    next.run(request).await
}

/// Claims of the caller, if any
#[derive(Debug, Clone)]
pub struct MaybeClaims(pub Option<Claims>);

impl<S> FromRequestParts<S> for MaybeClaims
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Claims>().cloned()))
    }
}

/// An authenticated app user
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Claims);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Claims>() {
            Some(claims) if !claims.admin => Ok(Self(claims.clone())),
            Some(_) => Err(ApiError::forbidden("User account required")),
            None => Err(ApiError::unauthorized("Authentication required")),
        }
    }
}

/// An authenticated admin
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin(pub Claims);

impl<S> FromRequestParts<S> for AuthenticatedAdmin
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Claims>() {
            Some(claims) if claims.admin => Ok(Self(claims.clone())),
            Some(_) => Err(ApiError::forbidden("Admin privileges required")),
            None => Err(ApiError::unauthorized("Authentication required")),
        }
    }
}
