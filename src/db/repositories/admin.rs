//! Admin repository
//!
//! Admin accounts live in their own table; they never own tours or answers.

use crate::db::DynDatabasePool;
use crate::models::Admin;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Admin repository trait
#[async_trait]
pub trait AdminRepository: Send + Sync {
    /// Create a new admin
    async fn create(&self, admin: &Admin) -> Result<Admin>;

    /// Get admin by username
    async fn get_by_username(&self, username: &str) -> Result<Option<Admin>>;

    /// Replace the stored password hash
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()>;

    /// Count admin accounts
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based admin repository implementation
pub struct SqlxAdminRepository {
    pool: DynDatabasePool,
}

impl SqlxAdminRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AdminRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AdminRepository for SqlxAdminRepository {
    async fn create(&self, admin: &Admin) -> Result<Admin> {
        let result = sqlx::query(
            "INSERT INTO admins (username, password_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(&admin.username)
        .bind(&admin.password_hash)
        .bind(admin.created_at)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create admin")?;

        Ok(Admin {
            id: result.last_insert_rowid(),
            ..admin.clone()
        })
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<Admin>> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, created_at FROM admins WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get admin by username")?;

        row.map(|row| {
            Ok(Admin {
                id: row.try_get("id")?,
                username: row.try_get("username")?,
                password_hash: row.try_get("password_hash")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .transpose()
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE admins SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update admin password")?;
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM admins")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count admins")?;
        Ok(row.get("count"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::migrated_pool;

    #[tokio::test]
    async fn test_admin_lifecycle() {
        let repo = SqlxAdminRepository::new(migrated_pool().await);
        assert_eq!(repo.count().await.unwrap(), 0);

        let admin = repo
            .create(&Admin::new("curator".to_string(), "hash".to_string()))
            .await
            .unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);

        repo.update_password(admin.id, "new-hash").await.unwrap();
        let stored = repo.get_by_username("curator").await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new-hash");
        assert!(repo.get_by_username("anna").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_admin_rejected() {
        let repo = SqlxAdminRepository::new(migrated_pool().await);
        repo.create(&Admin::new("curator".to_string(), "hash".to_string())).await.unwrap();
        assert!(repo
            .create(&Admin::new("curator".to_string(), "hash".to_string()))
            .await
            .is_err());
    }
}
