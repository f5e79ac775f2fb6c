//! Error type shared by all services

use thiserror::Error;

/// Error types for service operations
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is authenticated but may not do this
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Invalid input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity already exists or the operation collides with current state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad credentials or an unusable token
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Too many failed logins
    #[error("Too many failed login attempts, try again later")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(what.to_string())
    }

    pub fn forbidden(why: impl std::fmt::Display) -> Self {
        ServiceError::Forbidden(why.to_string())
    }

    pub fn validation(why: impl std::fmt::Display) -> Self {
        ServiceError::Validation(why.to_string())
    }

    /// Short machine-readable code, used by the REST error envelope
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Forbidden(_) => "FORBIDDEN",
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::Conflict(_) => "CONFLICT",
            ServiceError::Authentication(_) => "UNAUTHORIZED",
            ServiceError::RateLimited => "RATE_LIMITED",
            ServiceError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(ServiceError::not_found("tour 1").code(), "NOT_FOUND");
        assert_eq!(ServiceError::Authentication("bad".into()).code(), "UNAUTHORIZED");
        assert_eq!(
            ServiceError::from(anyhow::anyhow!("db down")).code(),
            "INTERNAL_ERROR"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ServiceError::not_found("tour 1").to_string(), "Not found: tour 1");
        assert_eq!(
            ServiceError::forbidden("not the owner").to_string(),
            "Forbidden: not the owner"
        );
    }
}
