//! User repository
//!
//! Database operations for app users. Account removal is not here: it spans
//! several tables and lives in [`super::cascade`].

use crate::db::DynDatabasePool;
use crate::models::User;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Persist password hash, producer flag and profile picture
    async fn update(&self, user: &User) -> Result<User>;

    /// List all users ordered by username
    async fn list(&self) -> Result<Vec<User>>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        create_user(self.pool.sqlite(), user).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get user by ID")?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS))
            .bind(username)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get user by username")?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn update(&self, user: &User) -> Result<User> {
        update_user(self.pool.sqlite(), user).await
    }

    async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!("SELECT {} FROM users ORDER BY username", USER_COLUMNS))
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list users")?;
        rows.iter().map(row_to_user).collect()
    }
}

const USER_COLUMNS: &str = "id, username, password_hash, producer, profile_picture_id, created_at";

async fn create_user(pool: &SqlitePool, user: &User) -> Result<User> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, password_hash, producer, profile_picture_id, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(user.producer)
    .bind(user.profile_picture_id)
    .bind(user.created_at)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        ..user.clone()
    })
}

async fn update_user(pool: &SqlitePool, user: &User) -> Result<User> {
    sqlx::query(
        r#"
        UPDATE users
        SET password_hash = ?, producer = ?, profile_picture_id = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.password_hash)
    .bind(user.producer)
    .bind(user.profile_picture_id)
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    Ok(user.clone())
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        producer: row.try_get("producer")?,
        profile_picture_id: row.try_get("profile_picture_id")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::migrated_pool;

    async fn setup_repo() -> SqlxUserRepository {
        SqlxUserRepository::new(migrated_pool().await)
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = setup_repo().await;

        let created = repo
            .create(&User::new("anna".to_string(), "hash".to_string()))
            .await
            .expect("Failed to create user");
        assert!(created.id > 0);

        let by_id = repo.get_by_id(created.id).await.unwrap().expect("missing user");
        assert_eq!(by_id.username, "anna");
        assert!(!by_id.producer);

        let by_name = repo.get_by_username("anna").await.unwrap().expect("missing user");
        assert_eq!(by_name.id, created.id);

        assert!(repo.get_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let repo = setup_repo().await;

        repo.create(&User::new("anna".to_string(), "hash".to_string())).await.unwrap();
        let duplicate = repo.create(&User::new("anna".to_string(), "other".to_string())).await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_update_user() {
        let repo = setup_repo().await;

        let mut user = repo
            .create(&User::new("anna".to_string(), "hash".to_string()))
            .await
            .unwrap();
        user.producer = true;
        user.profile_picture_id = Some(7);
        user.password_hash = "new-hash".to_string();
        repo.update(&user).await.unwrap();

        let stored = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.producer);
        assert_eq!(stored.profile_picture_id, Some(7));
        assert_eq!(stored.password_hash, "new-hash");
    }

    #[tokio::test]
    async fn test_list_users_sorted() {
        let repo = setup_repo().await;

        for name in ["zoe", "anna", "mika"] {
            repo.create(&User::new(name.to_string(), "hash".to_string())).await.unwrap();
        }

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|u| u.username).collect();
        assert_eq!(names, vec!["anna", "mika", "zoe"]);
    }
}
