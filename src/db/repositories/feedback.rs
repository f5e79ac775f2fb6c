//! Feedback repository

use crate::db::DynDatabasePool;
use crate::models::{AppFeedback, TourFeedback};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn create_app_feedback(&self, rating: i32, review: &str) -> Result<AppFeedback>;

    /// App feedback, newest first. `unread_only` skips read entries.
    async fn list_app_feedback(&self, unread_only: bool) -> Result<Vec<AppFeedback>>;

    /// Returns false if the feedback does not exist
    async fn mark_read(&self, id: i64) -> Result<bool>;

    async fn create_tour_feedback(&self, tour_id: i64, rating: i32, review: &str) -> Result<TourFeedback>;

    async fn list_tour_feedback(&self, tour_id: i64) -> Result<Vec<TourFeedback>>;
}

pub struct SqlxFeedbackRepository {
    pool: DynDatabasePool,
}

impl SqlxFeedbackRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FeedbackRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FeedbackRepository for SqlxFeedbackRepository {
    async fn create_app_feedback(&self, rating: i32, review: &str) -> Result<AppFeedback> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO app_feedback (rating, review, read, created_at) VALUES (?, ?, 0, ?)",
        )
        .bind(rating)
        .bind(review)
        .bind(created_at)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create feedback")?;

        Ok(AppFeedback {
            id: result.last_insert_rowid(),
            rating,
            review: review.to_string(),
            read: false,
            created_at,
        })
    }

    async fn list_app_feedback(&self, unread_only: bool) -> Result<Vec<AppFeedback>> {
        let sql = if unread_only {
            "SELECT * FROM app_feedback WHERE read = 0 ORDER BY created_at DESC, id DESC"
        } else {
            "SELECT * FROM app_feedback ORDER BY created_at DESC, id DESC"
        };

        let rows = sqlx::query(sql)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list feedback")?;

        rows.iter()
            .map(|row| {
                Ok(AppFeedback {
                    id: row.try_get("id")?,
                    rating: row.try_get("rating")?,
                    review: row.try_get("review")?,
                    read: row.try_get("read")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn mark_read(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE app_feedback SET read = 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to mark feedback as read")?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_tour_feedback(&self, tour_id: i64, rating: i32, review: &str) -> Result<TourFeedback> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO tour_feedback (tour_id, rating, review, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(tour_id)
        .bind(rating)
        .bind(review)
        .bind(created_at)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create tour feedback")?;

        Ok(TourFeedback {
            id: result.last_insert_rowid(),
            tour_id,
            rating,
            review: review.to_string(),
            created_at,
        })
    }

    async fn list_tour_feedback(&self, tour_id: i64) -> Result<Vec<TourFeedback>> {
        let rows = sqlx::query("SELECT * FROM tour_feedback WHERE tour_id = ? ORDER BY created_at DESC, id DESC")
            .bind(tour_id)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list tour feedback")?;

        rows.iter()
            .map(|row| {
                Ok(TourFeedback {
                    id: row.try_get("id")?,
                    tour_id: row.try_get("tour_id")?,
                    rating: row.try_get("rating")?,
                    review: row.try_get("review")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}
