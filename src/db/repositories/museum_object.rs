//! Museum object repository
//!
//! Catalog entries keyed by their inventory id. Removal cascades into
//! checkpoints and favourites, so it lives in [`super::cascade`].

use super::{from_json_list, to_json};
use crate::db::DynDatabasePool;
use crate::models::{MuseumObject, MuseumObjectFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait MuseumObjectRepository: Send + Sync {
    /// Insert a new object. Fails if the object id is taken.
    async fn create(&self, object: &MuseumObject) -> Result<MuseumObject>;

    async fn get(&self, object_id: &str) -> Result<Option<MuseumObject>>;

    /// Overwrite every mutable column of an existing object
    async fn update(&self, object: &MuseumObject) -> Result<MuseumObject>;

    /// All objects ordered by object id
    async fn list(&self) -> Result<Vec<MuseumObject>>;

    /// Objects whose columns contain every term of the filter
    async fn search(&self, filter: &MuseumObjectFilter) -> Result<Vec<MuseumObject>>;
}

pub struct SqlxMuseumObjectRepository {
    pool: DynDatabasePool,
}

impl SqlxMuseumObjectRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MuseumObjectRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl MuseumObjectRepository for SqlxMuseumObjectRepository {
    async fn create(&self, object: &MuseumObject) -> Result<MuseumObject> {
        create_object(self.pool.sqlite(), object).await
    }

    async fn get(&self, object_id: &str) -> Result<Option<MuseumObject>> {
        let row = sqlx::query("SELECT * FROM museum_objects WHERE object_id = ?")
            .bind(object_id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get museum object")?;
        row.as_ref().map(row_to_object).transpose()
    }

    async fn update(&self, object: &MuseumObject) -> Result<MuseumObject> {
        update_object(self.pool.sqlite(), object).await
    }

    async fn list(&self) -> Result<Vec<MuseumObject>> {
        let rows = sqlx::query("SELECT * FROM museum_objects ORDER BY object_id")
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list museum objects")?;
        rows.iter().map(row_to_object).collect()
    }

    async fn search(&self, filter: &MuseumObjectFilter) -> Result<Vec<MuseumObject>> {
        search_objects(self.pool.sqlite(), filter).await
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_object(pool: &SqlitePool, object: &MuseumObject) -> Result<MuseumObject> {
    sqlx::query(
        r#"
        INSERT INTO museum_objects (
            object_id, category, sub_category, title, time_range, year, pictures,
            art_type, creator, material, size, location, description,
            additional_information, interdisciplinary_context, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&object.object_id)
    .bind(&object.category)
    .bind(&object.sub_category)
    .bind(&object.title)
    .bind(&object.time_range)
    .bind(&object.year)
    .bind(to_json(&object.pictures)?)
    .bind(&object.art_type)
    .bind(&object.creator)
    .bind(&object.material)
    .bind(&object.size)
    .bind(&object.location)
    .bind(&object.description)
    .bind(&object.additional_information)
    .bind(&object.interdisciplinary_context)
    .bind(object.created_at)
    .bind(object.updated_at)
    .execute(pool)
    .await
    .context("Failed to create museum object")?;

    Ok(object.clone())
}

async fn update_object(pool: &SqlitePool, object: &MuseumObject) -> Result<MuseumObject> {
    sqlx::query(
        r#"
        UPDATE museum_objects
        SET category = ?, sub_category = ?, title = ?, time_range = ?, year = ?,
            pictures = ?, art_type = ?, creator = ?, material = ?, size = ?,
            location = ?, description = ?, additional_information = ?,
            interdisciplinary_context = ?, updated_at = ?
        WHERE object_id = ?
        "#,
    )
    .bind(&object.category)
    .bind(&object.sub_category)
    .bind(&object.title)
    .bind(&object.time_range)
    .bind(&object.year)
    .bind(to_json(&object.pictures)?)
    .bind(&object.art_type)
    .bind(&object.creator)
    .bind(&object.material)
    .bind(&object.size)
    .bind(&object.location)
    .bind(&object.description)
    .bind(&object.additional_information)
    .bind(&object.interdisciplinary_context)
    .bind(object.updated_at)
    .bind(&object.object_id)
    .execute(pool)
    .await
    .context("Failed to update museum object")?;

    Ok(object.clone())
}

/// SQLite's `lower()` and `LIKE` only fold ASCII, so matching happens on the
/// decoded rows.
async fn search_objects(pool: &SqlitePool, filter: &MuseumObjectFilter) -> Result<Vec<MuseumObject>> {
    let rows = sqlx::query("SELECT * FROM museum_objects ORDER BY object_id")
        .fetch_all(pool)
        .await
        .context("Failed to search museum objects")?;

    let mut objects = Vec::new();
    for row in &rows {
        let object = row_to_object(row)?;
        if filter.matches(&object) {
            objects.push(object);
        }
    }
    Ok(objects)
}

pub(crate) fn row_to_object(row: &sqlx::sqlite::SqliteRow) -> Result<MuseumObject> {
    Ok(MuseumObject {
        object_id: row.try_get("object_id")?,
        category: row.try_get("category")?,
        sub_category: row.try_get("sub_category")?,
        title: row.try_get("title")?,
        time_range: row.try_get("time_range")?,
        year: row.try_get("year")?,
        pictures: from_json_list(row.try_get("pictures")?)?,
        art_type: row.try_get("art_type")?,
        creator: row.try_get("creator")?,
        material: row.try_get("material")?,
        size: row.try_get("size")?,
        location: row.try_get("location")?,
        description: row.try_get("description")?,
        additional_information: row.try_get("additional_information")?,
        interdisciplinary_context: row.try_get("interdisciplinary_context")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
