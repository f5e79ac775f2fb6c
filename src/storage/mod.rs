//! Blob storage for uploaded images
//!
//! Bytes live outside the database, addressed by a generated key of the form
//! `<uuid>.<ext>`. The database only keeps the key and the content type.

use crate::models::StoredFile;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store bytes under a fresh key
    async fn put(&self, data: &[u8], content_type: &str, extension: &str) -> Result<StoredFile>;

    /// Read stored bytes, None if the key is unknown
    async fn read(&self, file: &StoredFile) -> Result<Option<Vec<u8>>>;

    /// Remove stored bytes. Removing an unknown key succeeds.
    async fn delete(&self, file: &StoredFile) -> Result<()>;
}

pub type DynFileStorage = Arc<dyn FileStorage>;

/// Files in one flat directory on the local disk
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn boxed(root: impl Into<PathBuf>) -> DynFileStorage {
        Arc::new(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(&['/', '\\'][..]) || key.starts_with('.') {
            bail!("Invalid storage key: {}", key);
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn put(&self, data: &[u8], content_type: &str, extension: &str) -> Result<StoredFile> {
        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create upload dir {}", self.root.display()))?;

        let key = format!("{}.{}", Uuid::new_v4(), extension);
        fs::write(self.path_for(&key)?, data)
            .await
            .context("Failed to save file")?;

        Ok(StoredFile {
            key,
            content_type: content_type.to_string(),
        })
    }

    async fn read(&self, file: &StoredFile) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(&file.key)?).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to read file"),
        }
    }

    async fn delete(&self, file: &StoredFile) -> Result<()> {
        match fs::remove_file(self.path_for(&file.key)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to delete file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_read_delete() {
        let dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::new(dir.path().join("uploads"));

        let file = storage.put(b"png bytes", "image/png", "png").await.unwrap();
        assert!(file.key.ends_with(".png"));
        assert_eq!(file.content_type, "image/png");
        assert!(storage.root().join(&file.key).exists());

        assert_eq!(storage.read(&file).await.unwrap().as_deref(), Some(&b"png bytes"[..]));

        storage.delete(&file).await.unwrap();
        assert!(storage.read(&file).await.unwrap().is_none());
        storage.delete(&file).await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_are_unique() {
        let dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        let a = storage.put(b"a", "image/png", "png").await.unwrap();
        let b = storage.put(b"a", "image/png", "png").await.unwrap();
        assert_ne!(a.key, b.key);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        for key in ["../secret", "a/b.png", ".hidden", ""] {
            let file = StoredFile {
                key: key.to_string(),
                content_type: "image/png".to_string(),
            };
            assert!(storage.read(&file).await.is_err(), "key {:?} accepted", key);
        }
    }
}
