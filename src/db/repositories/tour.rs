//! Tour repository
//!
//! Tours, their status and their member lists. Checkpoints and the
//! `current_checkpoints` counter are maintained by [`super::checkpoint`].

use crate::db::DynDatabasePool;
use crate::models::{CreateTourInput, Tour, TourStatus, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Tour repository trait
#[async_trait]
pub trait TourRepository: Send + Sync {
    /// Create a tour owned by `owner`, who becomes its first member
    async fn create(&self, owner: &User, input: &CreateTourInput) -> Result<Tour>;

    async fn get(&self, id: i64) -> Result<Option<Tour>>;

    async fn get_by_search_id(&self, search_id: &str) -> Result<Option<Tour>>;

    /// Tours in the given review state, newest first
    async fn list_by_status(&self, status: TourStatus) -> Result<Vec<Tour>>;

    async fn list_owned(&self, user_id: i64) -> Result<Vec<Tour>>;

    /// Tours the user is a member of, including owned ones
    async fn list_joined(&self, user_id: i64) -> Result<Vec<Tour>>;

    async fn update_status(&self, id: i64, status: TourStatus) -> Result<()>;

    async fn update_session_id(&self, id: i64, session_id: i64) -> Result<()>;

    async fn is_member(&self, tour_id: i64, user_id: i64) -> Result<bool>;

    /// Returns false if the user already was a member
    async fn add_member(&self, tour_id: i64, user_id: i64) -> Result<bool>;

    /// Returns false if the user was not a member
    async fn remove_member(&self, tour_id: i64, user_id: i64) -> Result<bool>;

    /// Member usernames in join order
    async fn members(&self, tour_id: i64) -> Result<Vec<String>>;
}

/// SQLx-based tour repository implementation
pub struct SqlxTourRepository {
    pool: DynDatabasePool,
}

impl SqlxTourRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TourRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Tour columns joined with the owner's username
pub(crate) const TOUR_SELECT: &str = r#"
    SELECT t.id, t.name, t.owner_id, u.username AS owner, t.session_id, t.search_id,
           t.description, t.difficulty, t.status, t.current_checkpoints,
           t.created_at, t.updated_at
    FROM tours t
    JOIN users u ON u.id = t.owner_id
"#;

#[async_trait]
impl TourRepository for SqlxTourRepository {
    async fn create(&self, owner: &User, input: &CreateTourInput) -> Result<Tour> {
        create_tour(self.pool.sqlite(), owner, input).await
    }

    async fn get(&self, id: i64) -> Result<Option<Tour>> {
        let row = sqlx::query(&format!("{} WHERE t.id = ?", TOUR_SELECT))
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get tour")?;
        row.as_ref().map(row_to_tour).transpose()
    }

    async fn get_by_search_id(&self, search_id: &str) -> Result<Option<Tour>> {
        let row = sqlx::query(&format!("{} WHERE t.search_id = ?", TOUR_SELECT))
            .bind(search_id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get tour by search id")?;
        row.as_ref().map(row_to_tour).transpose()
    }

    async fn list_by_status(&self, status: TourStatus) -> Result<Vec<Tour>> {
        let rows = sqlx::query(&format!(
            "{} WHERE t.status = ? ORDER BY t.updated_at DESC, t.id DESC",
            TOUR_SELECT
        ))
        .bind(status.to_string())
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list tours by status")?;
        rows.iter().map(row_to_tour).collect()
    }

    async fn list_owned(&self, user_id: i64) -> Result<Vec<Tour>> {
        let rows = sqlx::query(&format!("{} WHERE t.owner_id = ? ORDER BY t.id", TOUR_SELECT))
            .bind(user_id)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list owned tours")?;
        rows.iter().map(row_to_tour).collect()
    }

    async fn list_joined(&self, user_id: i64) -> Result<Vec<Tour>> {
        let rows = sqlx::query(&format!(
            "{} JOIN tour_members m ON m.tour_id = t.id WHERE m.user_id = ? ORDER BY m.joined_at, t.id",
            TOUR_SELECT
        ))
        .bind(user_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list joined tours")?;
        rows.iter().map(row_to_tour).collect()
    }

    async fn update_status(&self, id: i64, status: TourStatus) -> Result<()> {
        sqlx::query("UPDATE tours SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update tour status")?;
        Ok(())
    }

    async fn update_session_id(&self, id: i64, session_id: i64) -> Result<()> {
        sqlx::query("UPDATE tours SET session_id = ?, updated_at = ? WHERE id = ?")
            .bind(session_id)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update session id")?;
        Ok(())
    }

    async fn is_member(&self, tour_id: i64, user_id: i64) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM tour_members WHERE tour_id = ? AND user_id = ?")
            .bind(tour_id)
            .bind(user_id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to check membership")?;
        Ok(row.is_some())
    }

    async fn add_member(&self, tour_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO tour_members (tour_id, user_id, joined_at) VALUES (?, ?, ?)",
        )
        .bind(tour_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(self.pool.sqlite())
        .await
        .context("Failed to add member")?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_member(&self, tour_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tour_members WHERE tour_id = ? AND user_id = ?")
            .bind(tour_id)
            .bind(user_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to remove member")?;
        Ok(result.rows_affected() > 0)
    }

    async fn members(&self, tour_id: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT u.username FROM tour_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.tour_id = ?
            ORDER BY m.joined_at, u.id
            "#,
        )
        .bind(tour_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list members")?;
        rows.iter()
            .map(|row| Ok(row.try_get::<String, _>("username")?))
            .collect()
    }
}

async fn create_tour(pool: &SqlitePool, owner: &User, input: &CreateTourInput) -> Result<Tour> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO tours (name, owner_id, session_id, search_id, description, difficulty,
                           status, current_checkpoints, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(&input.name)
    .bind(owner.id)
    .bind(input.session_id)
    .bind(&input.search_id)
    .bind(&input.description)
    .bind(input.difficulty)
    .bind(TourStatus::Private.to_string())
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create tour")?;
    let id = result.last_insert_rowid();

    sqlx::query("INSERT INTO tour_members (tour_id, user_id, joined_at) VALUES (?, ?, ?)")
        .bind(id)
        .bind(owner.id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to add owner as member")?;

    tx.commit().await.context("Failed to commit transaction")?;

    Ok(Tour {
        id,
        name: input.name.clone(),
        owner_id: owner.id,
        owner: owner.username.clone(),
        session_id: input.session_id,
        search_id: input.search_id.clone(),
        description: input.description.clone(),
        difficulty: input.difficulty,
        status: TourStatus::Private,
        current_checkpoints: 0,
        created_at: now,
        updated_at: now,
    })
}

pub(crate) fn row_to_tour(row: &sqlx::sqlite::SqliteRow) -> Result<Tour> {
    let status: String = row.try_get("status")?;
    Ok(Tour {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        owner_id: row.try_get("owner_id")?,
        owner: row.try_get("owner")?,
        session_id: row.try_get("session_id")?,
        search_id: row.try_get("search_id")?,
        description: row.try_get("description")?,
        difficulty: row.try_get("difficulty")?,
        status: status.parse()?,
        current_checkpoints: row.try_get("current_checkpoints")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
