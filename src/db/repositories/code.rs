//! Producer codes
//!
//! A code is single use: redeeming it deletes the row.

use crate::db::DynDatabasePool;
use crate::models::Code;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait CodeRepository: Send + Sync {
    /// Store a new code. Fails if the code already exists.
    async fn create(&self, code: &str) -> Result<Code>;

    /// Consume a code, returning whether it existed
    async fn take(&self, code: &str) -> Result<bool>;

    async fn list(&self) -> Result<Vec<Code>>;
}

pub struct SqlxCodeRepository {
    pool: DynDatabasePool,
}

impl SqlxCodeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CodeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CodeRepository for SqlxCodeRepository {
    async fn create(&self, code: &str) -> Result<Code> {
        let created_at = chrono::Utc::now();
        sqlx::query("INSERT INTO codes (code, created_at) VALUES (?, ?)")
            .bind(code)
            .bind(created_at)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to create code")?;

        Ok(Code {
            code: code.to_string(),
            created_at,
        })
    }

    async fn take(&self, code: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM codes WHERE code = ?")
            .bind(code)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to redeem code")?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<Code>> {
        let rows = sqlx::query("SELECT code, created_at FROM codes ORDER BY created_at, code")
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list codes")?;

        rows.iter()
            .map(|row| {
                Ok(Code {
                    code: row.try_get("code")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::migrated_pool;

    #[tokio::test]
    async fn test_code_is_single_use() {
        let repo = SqlxCodeRepository::new(migrated_pool().await);
        repo.create("AB12C").await.unwrap();

        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert!(repo.take("AB12C").await.unwrap());
        assert!(!repo.take("AB12C").await.unwrap());
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let repo = SqlxCodeRepository::new(migrated_pool().await);
        repo.create("AB12C").await.unwrap();
        assert!(repo.create("AB12C").await.is_err());
    }
}
