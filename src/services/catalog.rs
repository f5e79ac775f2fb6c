//! Catalog service
//!
//! Museum objects: admin-side CRUD and visitor-side lookup and search.

use crate::db::repositories::{CascadeRepository, MediaRepository, MuseumObjectRepository};
use crate::models::{
    CreateMuseumObjectInput, MuseumObject, MuseumObjectFilter, UpdateMuseumObjectInput,
};
use crate::services::error::{ServiceError, ServiceResult};
use crate::storage::DynFileStorage;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

pub struct CatalogService {
    objects: Arc<dyn MuseumObjectRepository>,
    media: Arc<dyn MediaRepository>,
    cascade: Arc<dyn CascadeRepository>,
    storage: DynFileStorage,
}

impl CatalogService {
    pub fn new(
        objects: Arc<dyn MuseumObjectRepository>,
        media: Arc<dyn MediaRepository>,
        cascade: Arc<dyn CascadeRepository>,
        storage: DynFileStorage,
    ) -> Self {
        Self {
            objects,
            media,
            cascade,
            storage,
        }
    }

    pub async fn create(&self, input: CreateMuseumObjectInput) -> ServiceResult<MuseumObject> {
        for (field, value) in [
            ("object_id", &input.object_id),
            ("category", &input.category),
            ("sub_category", &input.sub_category),
            ("title", &input.title),
        ] {
            if value.trim().is_empty() {
                return Err(ServiceError::validation(format!("{} must not be empty", field)));
            }
        }
        if self.objects.get(&input.object_id).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Museum object '{}' already exists",
                input.object_id
            )));
        }
        self.check_pictures(&input.pictures).await?;

        let object = self.objects.create(&input.into_object(Utc::now())).await?;
        info!(object_id = %object.object_id, "museum object created");
        Ok(object)
    }

    pub async fn update(
        &self,
        object_id: &str,
        update: UpdateMuseumObjectInput,
    ) -> ServiceResult<MuseumObject> {
        let mut object = self.require(object_id).await?;
        if let Some(pictures) = &update.pictures {
            self.check_pictures(pictures).await?;
        }

        object.apply(update);
        object.updated_at = Utc::now();
        Ok(self.objects.update(&object).await?)
    }

    /// Delete an object with everything that points at it. Deleting a missing
    /// object succeeds and returns false.
    pub async fn delete(&self, object_id: &str) -> ServiceResult<bool> {
        let Some(files) = self.cascade.delete_museum_object(object_id).await? else {
            return Ok(false);
        };

        // Rows are gone already; a leftover file is harmless
        for file in &files {
            if let Err(e) = self.storage.delete(file).await {
                warn!(key = %file.key, error = %e, "failed to remove picture file");
            }
        }
        info!(object_id, pictures = files.len(), "museum object deleted");
        Ok(true)
    }

    pub async fn get(&self, object_id: &str) -> ServiceResult<Option<MuseumObject>> {
        Ok(self.objects.get(object_id).await?)
    }

    pub async fn require(&self, object_id: &str) -> ServiceResult<MuseumObject> {
        self.objects
            .get(object_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("museum object '{}'", object_id)))
    }

    pub async fn list(&self) -> ServiceResult<Vec<MuseumObject>> {
        Ok(self.objects.list().await?)
    }

    pub async fn search(&self, filter: &MuseumObjectFilter) -> ServiceResult<Vec<MuseumObject>> {
        Ok(self.objects.search(filter).await?)
    }

    async fn check_pictures(&self, pictures: &[i64]) -> ServiceResult<()> {
        for id in pictures {
            if self.media.get_picture(*id).await?.is_none() {
                return Err(ServiceError::not_found(format!("picture {}", id)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::migrated_pool;
    use crate::db::repositories::{
        SqlxCascadeRepository, SqlxMediaRepository, SqlxMuseumObjectRepository,
    };
    use crate::db::DynDatabasePool;
    use crate::storage::LocalFileStorage;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        pool: DynDatabasePool,
        storage: DynFileStorage,
        service: CatalogService,
    }

    async fn setup_test_service() -> Fixture {
        let dir = TempDir::new().unwrap();
        let pool = migrated_pool().await;
        let storage = LocalFileStorage::boxed(dir.path());
        let service = CatalogService::new(
            SqlxMuseumObjectRepository::boxed(pool.clone()),
            SqlxMediaRepository::boxed(pool.clone()),
            SqlxCascadeRepository::boxed(pool.clone()),
            storage.clone(),
        );
        Fixture {
            _dir: dir,
            pool,
            storage,
            service,
        }
    }

    fn input(id: &str) -> CreateMuseumObjectInput {
        CreateMuseumObjectInput {
            object_id: id.to_string(),
            category: "Painting".to_string(),
            sub_category: "Oil".to_string(),
            title: "Harbour".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_requires_fields_and_unique_id() {
        let f = setup_test_service().await;

        let mut missing_title = input("INV-1");
        missing_title.title = " ".to_string();
        assert!(matches!(f.service.create(missing_title).await, Err(ServiceError::Validation(_))));

        f.service.create(input("INV-1")).await.unwrap();
        assert!(matches!(f.service.create(input("INV-1")).await, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_checks_pictures() {
        let f = setup_test_service().await;

        let mut with_picture = input("INV-1");
        with_picture.pictures = vec![42];
        assert!(matches!(f.service.create(with_picture).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_missing_object() {
        let f = setup_test_service().await;
        let result = f
            .service
            .update("INV-9", UpdateMuseumObjectInput::default())
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_applies_patch() {
        let f = setup_test_service().await;
        f.service.create(input("INV-1")).await.unwrap();

        let updated = f
            .service
            .update(
                "INV-1",
                UpdateMuseumObjectInput {
                    creator: Some("Turner".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.creator.as_deref(), Some("Turner"));
        assert_eq!(f.service.require("INV-1").await.unwrap().creator.as_deref(), Some("Turner"));
    }

    #[tokio::test]
    async fn test_delete_removes_picture_files() {
        let f = setup_test_service().await;

        let file = f.storage.put(b"img", "image/png", "png").await.unwrap();
        let picture = SqlxMediaRepository::new(f.pool.clone())
            .create_picture(None, &file)
            .await
            .unwrap();

        let mut with_picture = input("INV-1");
        with_picture.pictures = vec![picture.id];
        f.service.create(with_picture).await.unwrap();

        assert!(f.service.delete("INV-1").await.unwrap());
        assert!(f.service.get("INV-1").await.unwrap().is_none());
        assert!(f.storage.read(&file).await.unwrap().is_none());
        assert!(!f.service.delete("INV-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_search_delegates_filter() {
        let f = setup_test_service().await;
        f.service.create(input("INV-1")).await.unwrap();

        let hits = f
            .service
            .search(&MuseumObjectFilter {
                title: Some("harb".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(f.service.list().await.unwrap().len(), 1);
    }
}
