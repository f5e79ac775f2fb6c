//! Favourite tours and museum objects of a user

use super::museum_object::row_to_object;
use super::tour::{row_to_tour, TOUR_SELECT};
use crate::db::DynDatabasePool;
use crate::models::{MuseumObject, Tour};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

#[async_trait]
pub trait FavouriteRepository: Send + Sync {
    /// Returns false if the tour already was a favourite
    async fn add_tour(&self, user_id: i64, tour_id: i64) -> Result<bool>;
    async fn remove_tour(&self, user_id: i64, tour_id: i64) -> Result<()>;
    async fn list_tours(&self, user_id: i64) -> Result<Vec<Tour>>;

    /// Returns false if the object already was a favourite
    async fn add_object(&self, user_id: i64, object_id: &str) -> Result<bool>;
    async fn remove_object(&self, user_id: i64, object_id: &str) -> Result<()>;
    async fn list_objects(&self, user_id: i64) -> Result<Vec<MuseumObject>>;
}

pub struct SqlxFavouriteRepository {
    pool: DynDatabasePool,
}

impl SqlxFavouriteRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FavouriteRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FavouriteRepository for SqlxFavouriteRepository {
    async fn add_tour(&self, user_id: i64, tour_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO favourite_tours (user_id, tour_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(tour_id)
        .bind(Utc::now())
        .execute(self.pool.sqlite())
        .await
        .context("Failed to add favourite tour")?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_tour(&self, user_id: i64, tour_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM favourite_tours WHERE user_id = ? AND tour_id = ?")
            .bind(user_id)
            .bind(tour_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to remove favourite tour")?;
        Ok(())
    }

    async fn list_tours(&self, user_id: i64) -> Result<Vec<Tour>> {
        let rows = sqlx::query(&format!(
            "{} JOIN favourite_tours f ON f.tour_id = t.id WHERE f.user_id = ? ORDER BY f.created_at, t.id",
            TOUR_SELECT
        ))
        .bind(user_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list favourite tours")?;
        rows.iter().map(row_to_tour).collect()
    }

    async fn add_object(&self, user_id: i64, object_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO favourite_objects (user_id, object_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(object_id)
        .bind(Utc::now())
        .execute(self.pool.sqlite())
        .await
        .context("Failed to add favourite object")?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_object(&self, user_id: i64, object_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM favourite_objects WHERE user_id = ? AND object_id = ?")
            .bind(user_id)
            .bind(object_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to remove favourite object")?;
        Ok(())
    }

    async fn list_objects(&self, user_id: i64) -> Result<Vec<MuseumObject>> {
        let rows = sqlx::query(
            r#"
            SELECT o.* FROM museum_objects o
            JOIN favourite_objects f ON f.object_id = o.object_id
            WHERE f.user_id = ?
            ORDER BY f.created_at, o.object_id
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list favourite objects")?;
        rows.iter().map(row_to_object).collect()
    }
}
