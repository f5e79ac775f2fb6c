//! Cascading removals
//!
//! Tours, users and museum objects are referenced from several tables. Each
//! removal below deletes the dependents in a fixed order inside a single
//! transaction, so a failure part way leaves nothing behind. Removing an
//! entity that does not exist is not an error.

use super::checkpoint::{checkpoint_in, remove_checkpoint};
use super::media::stored_file;
use super::museum_object::row_to_object;
use super::{begin_write, from_json_list, like_pattern, to_json};
use crate::db::DynDatabasePool;
use crate::models::StoredFile;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqliteConnection};
use std::sync::Arc;

#[async_trait]
pub trait CascadeRepository: Send + Sync {
    /// Delete a tour with its checkpoints, answers, feedback, favourites and
    /// memberships. Returns false if the tour did not exist.
    async fn delete_tour(&self, tour_id: i64) -> Result<bool>;

    /// Delete a user, the tours they own and everything they left behind.
    /// Returns false if the user did not exist.
    async fn delete_user(&self, user_id: i64) -> Result<bool>;

    /// Delete a museum object, the checkpoints showing it or its pictures,
    /// its favourites and its pictures.
    ///
    /// Returns the picture files to remove from storage once the rows are
    /// gone, or None if the object did not exist.
    async fn delete_museum_object(&self, object_id: &str) -> Result<Option<Vec<StoredFile>>>;
}

pub struct SqlxCascadeRepository {
    pool: DynDatabasePool,
}

impl SqlxCascadeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CascadeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CascadeRepository for SqlxCascadeRepository {
    async fn delete_tour(&self, tour_id: i64) -> Result<bool> {
        let mut tx = begin_write(&self.pool).await?;
        let deleted = delete_tour_in(&mut tx, tour_id).await?;
        tx.commit().await.context("Failed to commit transaction")?;
        Ok(deleted)
    }

    async fn delete_user(&self, user_id: i64) -> Result<bool> {
        let mut tx = begin_write(&self.pool).await?;

        let owned: Vec<i64> = sqlx::query("SELECT id FROM tours WHERE owner_id = ?")
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await
            .context("Failed to list owned tours")?
            .iter()
            .map(|row| row.get("id"))
            .collect();
        for tour_id in owned {
            delete_tour_in(&mut tx, tour_id).await?;
        }

        for (sql, what) in [
            ("DELETE FROM answers WHERE user_id = ?", "answers"),
            ("DELETE FROM favourite_tours WHERE user_id = ?", "favourite tours"),
            ("DELETE FROM favourite_objects WHERE user_id = ?", "favourite objects"),
            ("DELETE FROM badge_progress WHERE user_id = ?", "badge progress"),
            ("DELETE FROM tour_members WHERE user_id = ?", "memberships"),
        ] {
            sqlx::query(sql)
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to delete {} of user", what))?;
        }

        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete user")?;

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_museum_object(&self, object_id: &str) -> Result<Option<Vec<StoredFile>>> {
        let mut tx = begin_write(&self.pool).await?;

        let row = sqlx::query("SELECT * FROM museum_objects WHERE object_id = ?")
            .bind(object_id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to get museum object")?;
        let Some(object) = row.as_ref().map(row_to_object).transpose()? else {
            return Ok(None);
        };

        // Checkpoints showing the object or one of its pictures
        let mut doomed: Vec<i64> = sqlx::query(
            "SELECT id FROM checkpoints WHERE kind = 'object' AND object_id = ?",
        )
        .bind(object_id)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to find object checkpoints")?
        .iter()
        .map(|row| row.get("id"))
        .collect();
        for picture_id in &object.pictures {
            let rows = sqlx::query("SELECT id FROM checkpoints WHERE kind = 'picture' AND picture_id = ?")
                .bind(*picture_id)
                .fetch_all(&mut *tx)
                .await
                .context("Failed to find picture checkpoints")?;
            doomed.extend(rows.iter().map(|row| row.get::<i64, _>("id")));
        }
        // Re-read each one: earlier removals shift the positions of the rest
        for id in doomed {
            if let Some(checkpoint) = checkpoint_in(&mut tx, id).await? {
                remove_checkpoint(&mut tx, &checkpoint).await?;
            }
        }

        unlink_object(&mut tx, object_id).await?;

        sqlx::query("DELETE FROM favourite_objects WHERE object_id = ?")
            .bind(object_id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete favourites of museum object")?;

        let mut files = Vec::with_capacity(object.pictures.len());
        for picture_id in &object.pictures {
            let row = sqlx::query("SELECT file_key, content_type FROM pictures WHERE id = ?")
                .bind(*picture_id)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to get picture")?;
            if let Some(row) = row {
                files.push(stored_file(&row)?);
            }
            sqlx::query("DELETE FROM pictures WHERE id = ?")
                .bind(*picture_id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete picture")?;
        }

        sqlx::query("DELETE FROM museum_objects WHERE object_id = ?")
            .bind(object_id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete museum object")?;

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(Some(files))
    }
}

// ============================================================================
// Steps
// ============================================================================

async fn delete_tour_in(conn: &mut SqliteConnection, tour_id: i64) -> Result<bool> {
    for (sql, what) in [
        (
            "DELETE FROM answers WHERE checkpoint_id IN (SELECT id FROM checkpoints WHERE tour_id = ?)",
            "answers",
        ),
        ("DELETE FROM checkpoints WHERE tour_id = ?", "checkpoints"),
        ("DELETE FROM tour_feedback WHERE tour_id = ?", "feedback"),
        ("DELETE FROM favourite_tours WHERE tour_id = ?", "favourites"),
        ("DELETE FROM tour_members WHERE tour_id = ?", "memberships"),
    ] {
        sqlx::query(sql)
            .bind(tour_id)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to delete {} of tour", what))?;
    }

    let result = sqlx::query("DELETE FROM tours WHERE id = ?")
        .bind(tour_id)
        .execute(&mut *conn)
        .await
        .context("Failed to delete tour")?;
    Ok(result.rows_affected() > 0)
}

/// Drop an object id from every question's linked objects
async fn unlink_object(conn: &mut SqliteConnection, object_id: &str) -> Result<()> {
    let rows = sqlx::query(
        "SELECT id, linked_objects FROM checkpoints WHERE linked_objects LIKE ? ESCAPE '\\'",
    )
    .bind(like_pattern(&to_json(&object_id)?))
    .fetch_all(&mut *conn)
    .await
    .context("Failed to find linked checkpoints")?;

    for row in rows {
        let id: i64 = row.try_get("id")?;
        let mut linked: Vec<String> = from_json_list(row.try_get("linked_objects")?)?;
        linked.retain(|linked_id| linked_id != object_id);

        sqlx::query("UPDATE checkpoints SET linked_objects = ? WHERE id = ?")
            .bind(to_json(&linked)?)
            .bind(id)
            .execute(&mut *conn)
            .await
            .context("Failed to unlink museum object")?;
    }
    Ok(())
}
