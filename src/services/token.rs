//! Access and refresh tokens
//!
//! Stateless HS256 JWTs. The `kind` claim separates access tokens from
//! refresh tokens and the named `admin` claim marks admin accounts.

use crate::config::AuthConfig;
use crate::services::error::ServiceError;
use async_graphql::SimpleObject;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Verified token contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the account
    pub sub: String,
    pub kind: TokenKind,
    pub admin: bool,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and verifies tokens with one shared secret
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            access_ttl: Duration::minutes(config.access_token_minutes),
            refresh_ttl: Duration::days(config.refresh_token_days),
        }
    }

    pub fn issue(&self, subject: &str, admin: bool, kind: TokenKind) -> Result<String, ServiceError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        self.issue_with_ttl(subject, admin, kind, ttl)
    }

    pub fn issue_pair(&self, subject: &str, admin: bool) -> Result<TokenPair, ServiceError> {
        Ok(TokenPair {
            access_token: self.issue(subject, admin, TokenKind::Access)?,
            refresh_token: self.issue(subject, admin, TokenKind::Refresh)?,
        })
    }

    fn issue_with_ttl(
        &self,
        subject: &str,
        admin: bool,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            kind,
            admin,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to sign token: {}", e)))
    }

    /// Verify signature, expiry and that the token is of the `expected` kind
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, ServiceError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| ServiceError::Authentication(format!("Invalid token: {}", e)))?
            .claims;

        if claims.kind != expected {
            return Err(ServiceError::Authentication(format!(
                "Expected {:?} token",
                expected
            )));
        }
        Ok(claims)
    }

    /// Exchange a refresh token for a new access token
    pub fn refresh(&self, refresh_token: &str) -> Result<String, ServiceError> {
        let claims = self.verify(refresh_token, TokenKind::Refresh)?;
        self.issue(&claims.sub, claims.admin, TokenKind::Access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(&AuthConfig {
            jwt_secret: secret.to_string(),
            ..AuthConfig::default()
        })
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = service("s3cret");
        let pair = tokens.issue_pair("anna", false).unwrap();

        let claims = tokens.verify(&pair.access_token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, "anna");
        assert!(!claims.admin);
        assert!(claims.exp > claims.iat);

        let claims = tokens.verify(&pair.refresh_token, TokenKind::Refresh).unwrap();
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[test]
    fn test_kinds_are_not_interchangeable() {
        let tokens = service("s3cret");
        let pair = tokens.issue_pair("anna", false).unwrap();

        assert!(matches!(
            tokens.verify(&pair.refresh_token, TokenKind::Access),
            Err(ServiceError::Authentication(_))
        ));
        assert!(tokens.refresh(&pair.access_token).is_err());
    }

    #[test]
    fn test_refresh_keeps_admin_claim() {
        let tokens = service("s3cret");
        let pair = tokens.issue_pair("curator", true).unwrap();

        let access = tokens.refresh(&pair.refresh_token).unwrap();
        let claims = tokens.verify(&access, TokenKind::Access).unwrap();
        assert!(claims.admin);
        assert_eq!(claims.sub, "curator");
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = service("s3cret");
        let token = tokens
            .issue_with_ttl("anna", false, TokenKind::Access, Duration::seconds(-30))
            .unwrap();
        assert!(tokens.verify(&token, TokenKind::Access).is_err());
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let token = service("one").issue("anna", true, TokenKind::Access).unwrap();
        assert!(service("two").verify(&token, TokenKind::Access).is_err());
        assert!(service("one").verify("garbage", TokenKind::Access).is_err());
    }
}
