//! Media service
//!
//! Image uploads and downloads, profile pictures and badges with the
//! per-user progress towards them.

use crate::config::UploadConfig;
use crate::db::repositories::{MediaRepository, UserRepository};
use crate::models::{
    Badge, BadgeProgress, CreateBadgeInput, MediaKind, Picture, ProfilePicture, StoredFile, User,
};
use crate::services::access;
use crate::services::error::{ServiceError, ServiceResult};
use crate::storage::DynFileStorage;
use std::sync::Arc;
use tracing::{info, warn};

/// Bytes read back from storage
#[derive(Debug)]
pub struct Download {
    pub data: Vec<u8>,
    pub content_type: String,
}

pub struct MediaService {
    users: Arc<dyn UserRepository>,
    media: Arc<dyn MediaRepository>,
    storage: DynFileStorage,
    upload: UploadConfig,
}

impl MediaService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        media: Arc<dyn MediaRepository>,
        storage: DynFileStorage,
        upload: UploadConfig,
    ) -> Self {
        Self {
            users,
            media,
            storage,
            upload,
        }
    }

    // ========================================================================
    // Upload / download
    // ========================================================================

    pub async fn upload_picture(
        &self,
        description: Option<&str>,
        data: &[u8],
        content_type: &str,
    ) -> ServiceResult<Picture> {
        let file = self.store(data, content_type).await?;
        let created = self.media.create_picture(description, &file).await;
        let picture = self.discard_on_error(&file, created).await?;
        info!(picture_id = picture.id, size = data.len(), "picture uploaded");
        Ok(picture)
    }

    pub async fn upload_profile_picture(
        &self,
        locked: bool,
        data: &[u8],
        content_type: &str,
    ) -> ServiceResult<ProfilePicture> {
        let file = self.store(data, content_type).await?;
        let created = self.media.create_profile_picture(locked, &file).await;
        let picture = self.discard_on_error(&file, created).await?;
        info!(profile_picture_id = picture.id, locked, "profile picture uploaded");
        Ok(picture)
    }

    pub async fn upload_badge(
        &self,
        input: CreateBadgeInput,
        data: &[u8],
        content_type: &str,
    ) -> ServiceResult<Badge> {
        if input.id.trim().is_empty() || input.name.trim().is_empty() {
            return Err(ServiceError::validation("badge id and name must not be empty"));
        }
        if input.cost < 0 {
            return Err(ServiceError::validation("badge cost must not be negative"));
        }
        if self.media.get_badge(&input.id).await?.is_some() {
            return Err(ServiceError::Conflict(format!("Badge '{}' already exists", input.id)));
        }

        let file = self.store(data, content_type).await?;
        let created = self.media.create_badge(&input, &file).await;
        let badge = self.discard_on_error(&file, created).await?;
        info!(badge_id = %badge.id, cost = badge.cost, "badge uploaded");
        Ok(badge)
    }

    /// Remove a freshly stored file whose row could not be written
    async fn discard_on_error<T>(&self, file: &StoredFile, created: anyhow::Result<T>) -> ServiceResult<T> {
        if created.is_err() {
            if let Err(e) = self.storage.delete(file).await {
                warn!(key = %file.key, error = %e, "failed to remove orphaned upload");
            }
        }
        Ok(created?)
    }

    /// Stored bytes of a picture, profile picture or badge
    pub async fn download(&self, kind: MediaKind, id: &str) -> ServiceResult<Download> {
        let file = match kind {
            MediaKind::Picture => self
                .media
                .get_picture(numeric_id(id)?)
                .await?
                .map(|p| p.file),
            MediaKind::ProfilePicture => self
                .media
                .get_profile_picture(numeric_id(id)?)
                .await?
                .map(|p| p.file),
            MediaKind::Badge => self.media.get_badge(id).await?.map(|b| b.file),
        };
        let file = file.ok_or_else(|| ServiceError::not_found(format!("{} {}", kind, id)))?;

        let data = self
            .storage
            .read(&file)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("file of {} {}", kind, id)))?;
        Ok(Download {
            data,
            content_type: file.content_type,
        })
    }

    async fn store(&self, data: &[u8], content_type: &str) -> ServiceResult<StoredFile> {
        if !self.upload.is_type_allowed(content_type) {
            return Err(ServiceError::validation(format!(
                "File type '{}' is not allowed",
                content_type
            )));
        }
        if data.len() as u64 > self.upload.max_file_size {
            return Err(ServiceError::validation(format!(
                "File too large: {} bytes (max: {} bytes)",
                data.len(),
                self.upload.max_file_size
            )));
        }
        if data.is_empty() {
            return Err(ServiceError::validation("File is empty"));
        }

        let extension = self.upload.get_extension(content_type);
        Ok(self.storage.put(data, content_type, extension).await?)
    }

    // ========================================================================
    // Profile pictures
    // ========================================================================

    pub async fn profile_pictures(&self) -> ServiceResult<Vec<ProfilePicture>> {
        Ok(self.media.list_profile_pictures().await?)
    }

    /// Pick an unlocked profile picture
    pub async fn choose_profile_picture(
        &self,
        username: &str,
        picture_id: i64,
    ) -> ServiceResult<User> {
        let mut user = access::caller(self.users.as_ref(), username).await?;
        let picture = self
            .media
            .get_profile_picture(picture_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("profile picture {}", picture_id)))?;
        if picture.locked {
            return Err(ServiceError::forbidden("this profile picture is locked"));
        }

        user.profile_picture_id = Some(picture.id);
        Ok(self.users.update(&user).await?)
    }

    pub async fn set_profile_picture_locked(
        &self,
        picture_id: i64,
        locked: bool,
    ) -> ServiceResult<ProfilePicture> {
        if !self.media.set_profile_picture_locked(picture_id, locked).await? {
            return Err(ServiceError::not_found(format!("profile picture {}", picture_id)));
        }
        self.media
            .get_profile_picture(picture_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("profile picture {}", picture_id)))
    }

    // ========================================================================
    // Badges
    // ========================================================================

    pub async fn badges(&self) -> ServiceResult<Vec<Badge>> {
        Ok(self.media.list_badges().await?)
    }

    /// Every badge with the caller's progress; untouched badges report 0
    pub async fn badge_progress(&self, username: &str) -> ServiceResult<Vec<BadgeProgress>> {
        let user = access::caller(self.users.as_ref(), username).await?;
        Ok(self.media.list_progress(user.id).await?)
    }

    pub async fn update_badge_progress(
        &self,
        username: &str,
        badge_id: &str,
        progress: i64,
    ) -> ServiceResult<BadgeProgress> {
        if progress < 0 {
            return Err(ServiceError::validation("progress must not be negative"));
        }
        let user = access::caller(self.users.as_ref(), username).await?;
        let badge = self
            .media
            .get_badge(badge_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("badge '{}'", badge_id)))?;

        self.media.set_progress(user.id, badge_id, progress).await?;
        Ok(BadgeProgress::new(badge, progress))
    }

    /// Delete a badge, everyone's progress towards it and its image.
    /// Deleting a missing badge succeeds and returns false.
    pub async fn delete_badge(&self, badge_id: &str) -> ServiceResult<bool> {
        let Some(badge) = self.media.delete_badge(badge_id).await? else {
            return Ok(false);
        };
        if let Err(e) = self.storage.delete(&badge.file).await {
            warn!(key = %badge.file.key, error = %e, "failed to remove badge file");
        }
        info!(badge_id, "badge deleted");
        Ok(true)
    }
}

fn numeric_id(id: &str) -> ServiceResult<i64> {
    id.trim()
        .parse()
        .map_err(|_| ServiceError::validation(format!("'{}' is not a valid id", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_user, migrated_pool};
    use crate::db::repositories::{SqlxMediaRepository, SqlxUserRepository};
    use crate::db::DatabasePool;
    use crate::storage::LocalFileStorage;
    use tempfile::TempDir;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

    async fn setup_test_service() -> (TempDir, MediaService) {
        let dir = TempDir::new().unwrap();
        let pool = migrated_pool().await;
        insert_user(&pool, "anna").await;

        let upload = UploadConfig {
            path: dir.path().to_path_buf(),
            max_file_size: 64,
            ..Default::default()
        };
        let service = MediaService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxMediaRepository::boxed(pool.clone()),
            LocalFileStorage::boxed(dir.path()),
            upload,
        );
        (dir, service)
    }

    fn badge(id: &str, cost: i64) -> CreateBadgeInput {
        CreateBadgeInput {
            id: id.to_string(),
            name: "Explorer".to_string(),
            description: None,
            cost,
        }
    }

    #[tokio::test]
    async fn test_upload_and_download_picture() {
        let (_dir, service) = setup_test_service().await;

        let picture = service.upload_picture(Some("front"), PNG, "image/png").await.unwrap();
        let download = service
            .download(MediaKind::Picture, &picture.id.to_string())
            .await
            .unwrap();
        assert_eq!(download.data, PNG);
        assert_eq!(download.content_type, "image/png");

        let missing = service.download(MediaKind::Picture, "999").await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
        let garbage = service.download(MediaKind::Picture, "abc").await;
        assert!(matches!(garbage, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_failed_insert_removes_stored_file() {
        let dir = TempDir::new().unwrap();
        let pool = migrated_pool().await;
        let service = MediaService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxMediaRepository::boxed(pool.clone()),
            LocalFileStorage::boxed(dir.path()),
            UploadConfig {
                path: dir.path().to_path_buf(),
                ..Default::default()
            },
        );
        pool.execute("DROP TABLE pictures").await.unwrap();

        let result = service.upload_picture(Some("front"), PNG, "image/png").await;
        assert!(matches!(result, Err(ServiceError::Internal(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_rejects_type_and_size() {
        let (_dir, service) = setup_test_service().await;

        let wrong_type = service.upload_picture(None, PNG, "application/pdf").await;
        assert!(matches!(wrong_type, Err(ServiceError::Validation(_))));

        let too_big = service.upload_picture(None, &[0u8; 65], "image/png").await;
        assert!(matches!(too_big, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_choose_profile_picture() {
        let (_dir, service) = setup_test_service().await;
        let open = service.upload_profile_picture(false, PNG, "image/png").await.unwrap();
        let locked = service.upload_profile_picture(true, PNG, "image/png").await.unwrap();

        let user = service.choose_profile_picture("anna", open.id).await.unwrap();
        assert_eq!(user.profile_picture_id, Some(open.id));

        let refused = service.choose_profile_picture("anna", locked.id).await;
        assert!(matches!(refused, Err(ServiceError::Forbidden(_))));

        service.set_profile_picture_locked(locked.id, false).await.unwrap();
        service.choose_profile_picture("anna", locked.id).await.unwrap();

        let missing = service.set_profile_picture_locked(999, true).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_badge_progress_defaults_to_zero() {
        let (_dir, service) = setup_test_service().await;
        service.upload_badge(badge("explorer", 3), PNG, "image/png").await.unwrap();

        let progress = service.badge_progress("anna").await.unwrap();
        assert_eq!(progress.len(), 1);
        assert_eq!(progress[0].progress, 0);
        assert!(!progress[0].earned);

        let updated = service.update_badge_progress("anna", "explorer", 3).await.unwrap();
        assert!(updated.earned);
        assert_eq!(service.badge_progress("anna").await.unwrap()[0].progress, 3);

        let negative = service.update_badge_progress("anna", "explorer", -1).await;
        assert!(matches!(negative, Err(ServiceError::Validation(_))));
        let unknown = service.update_badge_progress("anna", "ghost", 1).await;
        assert!(matches!(unknown, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_badge() {
        let (_dir, service) = setup_test_service().await;
        service.upload_badge(badge("explorer", 3), PNG, "image/png").await.unwrap();
        service.update_badge_progress("anna", "explorer", 1).await.unwrap();

        let duplicate = service.upload_badge(badge("explorer", 1), PNG, "image/png").await;
        assert!(matches!(duplicate, Err(ServiceError::Conflict(_))));

        assert!(service.delete_badge("explorer").await.unwrap());
        assert!(service.badge_progress("anna").await.unwrap().is_empty());
        let gone = service.download(MediaKind::Badge, "explorer").await;
        assert!(matches!(gone, Err(ServiceError::NotFound(_))));
        assert!(!service.delete_badge("explorer").await.unwrap());
    }
}
