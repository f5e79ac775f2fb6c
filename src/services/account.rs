//! Account service
//!
//! Users and admins: registration, login with rate limiting, token refresh,
//! password changes, producer codes and account removal.

use crate::db::repositories::{AdminRepository, CascadeRepository, CodeRepository, UserRepository};
use crate::models::{Admin, Code, User, CODE_LENGTH};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::password::{hash_password, verify_password};
use crate::services::rate_limiter::LoginRateLimiter;
use crate::services::token::{TokenPair, TokenService};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]{1,64}$").expect("username pattern compiles"));

/// Attempts at drawing an unused producer code
const CODE_ATTEMPTS: usize = 5;

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    admins: Arc<dyn AdminRepository>,
    codes: Arc<dyn CodeRepository>,
    cascade: Arc<dyn CascadeRepository>,
    tokens: Arc<TokenService>,
    limiter: LoginRateLimiter,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        admins: Arc<dyn AdminRepository>,
        codes: Arc<dyn CodeRepository>,
        cascade: Arc<dyn CascadeRepository>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            users,
            admins,
            codes,
            cascade,
            tokens,
            limiter: LoginRateLimiter::new(),
        }
    }

    /// Shared handle to the login rate limiter, for periodic cleanup
    pub fn limiter(&self) -> &LoginRateLimiter {
        &self.limiter
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// Register a new user. Usernames are unique across users.
    pub async fn create_user(&self, username: &str, password: &str) -> ServiceResult<User> {
        validate_credentials(username, password)?;

        if self.users.get_by_username(username).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        let hash = hash_password(password)?;
        let user = self
            .users
            .create(&User::new(username.to_string(), hash))
            .await?;
        info!(username = %user.username, "user registered");
        Ok(user)
    }

    /// Log a user in, returning an access and a refresh token
    pub async fn login_user(&self, username: &str, password: &str) -> ServiceResult<TokenPair> {
        let key = format!("user:{}", username);
        self.check_limit(&key).await?;

        let user = self.users.get_by_username(username).await?;
        let valid = match &user {
            Some(user) => verify_password(password, &user.password_hash)?,
            None => false,
        };
        self.finish_login(&key, username, valid, false).await
    }

    /// The user behind a verified token
    pub async fn user(&self, username: &str) -> ServiceResult<User> {
        self.users
            .get_by_username(username)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("user '{}'", username)))
    }

    pub async fn change_user_password(&self, username: &str, password: &str) -> ServiceResult<()> {
        validate_password(password)?;
        let mut user = self.user(username).await?;
        user.password_hash = hash_password(password)?;
        self.users.update(&user).await?;
        Ok(())
    }

    /// Redeem a producer code. The code is consumed.
    pub async fn promote_user(&self, username: &str, code: &str) -> ServiceResult<User> {
        let mut user = self.user(username).await?;
        if !self.codes.take(code.trim()).await? {
            debug!(username, "unknown producer code");
            return Err(ServiceError::not_found("code"));
        }

        user.producer = true;
        self.users.update(&user).await?;
        info!(username, "user promoted to producer");
        Ok(user)
    }

    /// Revoke producer rights. Existing tours stay with the user.
    pub async fn demote_user(&self, username: &str) -> ServiceResult<User> {
        let mut user = self.user(username).await?;
        user.producer = false;
        self.users.update(&user).await?;
        Ok(user)
    }

    /// Delete a user and everything they own. Deleting a missing user
    /// succeeds and returns false.
    pub async fn delete_user(&self, username: &str) -> ServiceResult<bool> {
        let Some(user) = self.users.get_by_username(username).await? else {
            return Ok(false);
        };
        let deleted = self.cascade.delete_user(user.id).await?;
        info!(username, "user deleted");
        Ok(deleted)
    }

    pub async fn list_users(&self) -> ServiceResult<Vec<User>> {
        Ok(self.users.list().await?)
    }

    // ========================================================================
    // Admins
    // ========================================================================

    /// Create an admin. Without an admin caller this only works while no
    /// admin exists yet.
    pub async fn create_admin(
        &self,
        username: &str,
        password: &str,
        caller_is_admin: bool,
    ) -> ServiceResult<Admin> {
        if !caller_is_admin && self.admins.count().await? > 0 {
            return Err(ServiceError::forbidden("only admins can create admins"));
        }
        validate_credentials(username, password)?;

        if self.admins.get_by_username(username).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Admin '{}' already exists",
                username
            )));
        }

        let hash = hash_password(password)?;
        let admin = self
            .admins
            .create(&Admin::new(username.to_string(), hash))
            .await?;
        info!(username = %admin.username, "admin created");
        Ok(admin)
    }

    pub async fn login_admin(&self, username: &str, password: &str) -> ServiceResult<TokenPair> {
        let key = format!("admin:{}", username);
        self.check_limit(&key).await?;

        let admin = self.admins.get_by_username(username).await?;
        let valid = match &admin {
            Some(admin) => verify_password(password, &admin.password_hash)?,
            None => false,
        };
        self.finish_login(&key, username, valid, true).await
    }

    pub async fn change_admin_password(&self, username: &str, password: &str) -> ServiceResult<()> {
        validate_password(password)?;
        let admin = self
            .admins
            .get_by_username(username)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("admin '{}'", username)))?;
        self.admins
            .update_password(admin.id, &hash_password(password)?)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Tokens and codes
    // ========================================================================

    /// Exchange a refresh token for a new access token
    pub fn refresh(&self, refresh_token: &str) -> ServiceResult<String> {
        self.tokens.refresh(refresh_token)
    }

    /// Draw a fresh random producer code
    pub async fn create_code(&self) -> ServiceResult<Code> {
        for _ in 0..CODE_ATTEMPTS {
            let candidate = random_code();
            if self.codes.list().await?.iter().any(|c| c.code == candidate) {
                continue;
            }
            return Ok(self.codes.create(&candidate).await?);
        }
        Err(ServiceError::Internal(anyhow::anyhow!(
            "Failed to draw an unused code after {} attempts",
            CODE_ATTEMPTS
        )))
    }

    pub async fn list_codes(&self) -> ServiceResult<Vec<Code>> {
        Ok(self.codes.list().await?)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn check_limit(&self, key: &str) -> ServiceResult<()> {
        if self.limiter.is_limited(key).await {
            warn!(account = key, "login refused, too many failed attempts");
            return Err(ServiceError::RateLimited);
        }
        Ok(())
    }

    async fn finish_login(
        &self,
        key: &str,
        username: &str,
        valid: bool,
        admin: bool,
    ) -> ServiceResult<TokenPair> {
        if !valid {
            self.limiter.record_failure(key).await;
            warn!(account = key, "failed login");
            return Err(ServiceError::Authentication(
                "Invalid username or password".to_string(),
            ));
        }

        self.limiter.clear(key).await;
        self.tokens.issue_pair(username, admin)
    }
}

fn random_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| rng.random_range(b'a'..=b'z') as char)
        .collect()
}

fn validate_credentials(username: &str, password: &str) -> ServiceResult<()> {
    if !USERNAME_PATTERN.is_match(username) {
        return Err(ServiceError::validation(
            "username must be 1-64 letters, digits or . _ -",
        ));
    }
    validate_password(password)
}

fn validate_password(password: &str) -> ServiceResult<()> {
    if password.is_empty() {
        return Err(ServiceError::validation("password must not be empty"));
    }
    Ok(())
}
