//! Media repository
//!
//! Metadata for uploaded pictures, profile pictures and badges. The bytes
//! themselves live in the file storage under `file_key`.

use super::begin_write;
use crate::db::DynDatabasePool;
use crate::models::{Badge, BadgeProgress, CreateBadgeInput, Picture, ProfilePicture, StoredFile};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait MediaRepository: Send + Sync {
    // Pictures
    async fn create_picture(&self, description: Option<&str>, file: &StoredFile) -> Result<Picture>;
    async fn get_picture(&self, id: i64) -> Result<Option<Picture>>;

    // Profile pictures
    async fn create_profile_picture(&self, locked: bool, file: &StoredFile) -> Result<ProfilePicture>;
    async fn get_profile_picture(&self, id: i64) -> Result<Option<ProfilePicture>>;
    async fn list_profile_pictures(&self) -> Result<Vec<ProfilePicture>>;
    /// Returns false if the picture does not exist
    async fn set_profile_picture_locked(&self, id: i64, locked: bool) -> Result<bool>;

    // Badges
    async fn create_badge(&self, input: &CreateBadgeInput, file: &StoredFile) -> Result<Badge>;
    async fn get_badge(&self, id: &str) -> Result<Option<Badge>>;
    async fn list_badges(&self) -> Result<Vec<Badge>>;
    /// Delete a badge together with all progress on it
    async fn delete_badge(&self, id: &str) -> Result<Option<Badge>>;

    /// Progress of a user on every badge. Badges the user never touched
    /// report zero progress.
    async fn list_progress(&self, user_id: i64) -> Result<Vec<BadgeProgress>>;

    /// Record progress of a user on a badge, creating the row on first use
    async fn set_progress(&self, user_id: i64, badge_id: &str, progress: i64) -> Result<()>;
}

pub struct SqlxMediaRepository {
    pool: DynDatabasePool,
}

impl SqlxMediaRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MediaRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl MediaRepository for SqlxMediaRepository {
    // ========================================================================
    // Pictures
    // ========================================================================

    async fn create_picture(&self, description: Option<&str>, file: &StoredFile) -> Result<Picture> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO pictures (description, file_key, content_type, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(description)
        .bind(&file.key)
        .bind(&file.content_type)
        .bind(created_at)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create picture")?;

        Ok(Picture {
            id: result.last_insert_rowid(),
            description: description.map(str::to_string),
            file: file.clone(),
            created_at,
        })
    }

    async fn get_picture(&self, id: i64) -> Result<Option<Picture>> {
        let row = sqlx::query("SELECT * FROM pictures WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get picture")?;

        row.map(|row| {
            Ok(Picture {
                id: row.try_get("id")?,
                description: row.try_get("description")?,
                file: stored_file(&row)?,
                created_at: row.try_get("created_at")?,
            })
        })
        .transpose()
    }

    // ========================================================================
    // Profile pictures
    // ========================================================================

    async fn create_profile_picture(&self, locked: bool, file: &StoredFile) -> Result<ProfilePicture> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO profile_pictures (locked, file_key, content_type, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(locked)
        .bind(&file.key)
        .bind(&file.content_type)
        .bind(created_at)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create profile picture")?;

        Ok(ProfilePicture {
            id: result.last_insert_rowid(),
            locked,
            file: file.clone(),
            created_at,
        })
    }

    async fn get_profile_picture(&self, id: i64) -> Result<Option<ProfilePicture>> {
        let row = sqlx::query("SELECT * FROM profile_pictures WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get profile picture")?;
        row.as_ref().map(row_to_profile_picture).transpose()
    }

    async fn list_profile_pictures(&self) -> Result<Vec<ProfilePicture>> {
        let rows = sqlx::query("SELECT * FROM profile_pictures ORDER BY id")
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list profile pictures")?;
        rows.iter().map(row_to_profile_picture).collect()
    }

    async fn set_profile_picture_locked(&self, id: i64, locked: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE profile_pictures SET locked = ? WHERE id = ?")
            .bind(locked)
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update profile picture")?;
        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Badges
    // ========================================================================

    async fn create_badge(&self, input: &CreateBadgeInput, file: &StoredFile) -> Result<Badge> {
        let created_at = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO badges (id, name, description, cost, file_key, content_type, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.cost)
        .bind(&file.key)
        .bind(&file.content_type)
        .bind(created_at)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create badge")?;

        Ok(Badge {
            id: input.id.clone(),
            name: input.name.clone(),
            description: input.description.clone(),
            cost: input.cost,
            file: file.clone(),
            created_at,
        })
    }

    async fn get_badge(&self, id: &str) -> Result<Option<Badge>> {
        let row = sqlx::query("SELECT * FROM badges WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get badge")?;
        row.as_ref().map(row_to_badge).transpose()
    }

    async fn list_badges(&self) -> Result<Vec<Badge>> {
        let rows = sqlx::query("SELECT * FROM badges ORDER BY cost, id")
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list badges")?;
        rows.iter().map(row_to_badge).collect()
    }

    async fn delete_badge(&self, id: &str) -> Result<Option<Badge>> {
        let mut tx = begin_write(&self.pool).await?;

        let row = sqlx::query("SELECT * FROM badges WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to get badge")?;
        let Some(badge) = row.as_ref().map(row_to_badge).transpose()? else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM badge_progress WHERE badge_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete badge progress")?;
        sqlx::query("DELETE FROM badges WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete badge")?;

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(Some(badge))
    }

    async fn list_progress(&self, user_id: i64) -> Result<Vec<BadgeProgress>> {
        let rows = sqlx::query(
            r#"
            SELECT b.*, COALESCE(p.progress, 0) AS progress
            FROM badges b
            LEFT JOIN badge_progress p ON p.badge_id = b.id AND p.user_id = ?
            ORDER BY b.cost, b.id
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list badge progress")?;

        rows.iter()
            .map(|row| Ok(BadgeProgress::new(row_to_badge(row)?, row.try_get("progress")?)))
            .collect()
    }

    async fn set_progress(&self, user_id: i64, badge_id: &str, progress: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO badge_progress (user_id, badge_id, progress, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (user_id, badge_id)
            DO UPDATE SET progress = excluded.progress, updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(badge_id)
        .bind(progress)
        .bind(Utc::now())
        .execute(self.pool.sqlite())
        .await
        .context("Failed to set badge progress")?;
        Ok(())
    }
}

pub(crate) fn stored_file(row: &SqliteRow) -> Result<StoredFile> {
    Ok(StoredFile {
        key: row.try_get("file_key")?,
        content_type: row.try_get("content_type")?,
    })
}

fn row_to_profile_picture(row: &SqliteRow) -> Result<ProfilePicture> {
    Ok(ProfilePicture {
        id: row.try_get("id")?,
        locked: row.try_get("locked")?,
        file: stored_file(row)?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_badge(row: &SqliteRow) -> Result<Badge> {
    Ok(Badge {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        cost: row.try_get("cost")?,
        file: stored_file(row)?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_user, migrated_pool};

    fn file(key: &str) -> StoredFile {
        StoredFile {
            key: key.to_string(),
            content_type: "image/png".to_string(),
        }
    }

    fn badge_input(id: &str, cost: i64) -> CreateBadgeInput {
        CreateBadgeInput {
            id: id.to_string(),
            name: id.to_uppercase(),
            description: None,
            cost,
        }
    }

    #[tokio::test]
    async fn test_picture_roundtrip() {
        let repo = SqlxMediaRepository::new(migrated_pool().await);
        let picture = repo.create_picture(Some("front"), &file("a.png")).await.unwrap();

        let stored = repo.get_picture(picture.id).await.unwrap().unwrap();
        assert_eq!(stored.description.as_deref(), Some("front"));
        assert_eq!(stored.file, file("a.png"));
        assert!(repo.get_picture(picture.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_profile_picture_lock_toggle() {
        let repo = SqlxMediaRepository::new(migrated_pool().await);
        let picture = repo.create_profile_picture(false, &file("p.png")).await.unwrap();

        assert!(repo.set_profile_picture_locked(picture.id, true).await.unwrap());
        assert!(repo.get_profile_picture(picture.id).await.unwrap().unwrap().locked);
        assert!(!repo.set_profile_picture_locked(999, true).await.unwrap());
        assert_eq!(repo.list_profile_pictures().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_progress_defaults_to_zero_until_set() {
        let pool = migrated_pool().await;
        let user = insert_user(&pool, "anna").await;
        let repo = SqlxMediaRepository::new(pool);

        repo.create_badge(&badge_input("explorer", 3), &file("b.png")).await.unwrap();
        repo.create_badge(&badge_input("scholar", 10), &file("c.png")).await.unwrap();

        let progress = repo.list_progress(user).await.unwrap();
        assert_eq!(progress.len(), 2);
        assert!(progress.iter().all(|p| p.progress == 0 && !p.earned));

        repo.set_progress(user, "explorer", 2).await.unwrap();
        repo.set_progress(user, "explorer", 3).await.unwrap();

        let progress = repo.list_progress(user).await.unwrap();
        assert_eq!(progress[0].badge.id, "explorer");
        assert_eq!(progress[0].progress, 3);
        assert!(progress[0].earned);
        assert_eq!(progress[1].progress, 0);
    }

    #[tokio::test]
    async fn test_delete_badge_removes_progress() {
        let pool = migrated_pool().await;
        let user = insert_user(&pool, "anna").await;
        let repo = SqlxMediaRepository::new(pool);

        repo.create_badge(&badge_input("explorer", 3), &file("b.png")).await.unwrap();
        repo.set_progress(user, "explorer", 1).await.unwrap();

        let deleted = repo.delete_badge("explorer").await.unwrap().expect("badge existed");
        assert_eq!(deleted.file.key, "b.png");
        assert!(repo.get_badge("explorer").await.unwrap().is_none());
        assert!(repo.list_progress(user).await.unwrap().is_empty());
        assert!(repo.delete_badge("explorer").await.unwrap().is_none());
    }
}
