use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::services::s3::S3Blob;

/// Blob storage capability: save/retrieve byte content by generated path.
/// Backend is picked from configuration at startup.
#[derive(Clone)]
pub enum BlobStore {
    Local(LocalBlob),
    S3(S3Blob),
}

/// Collision-free storage name: random identifier plus the original extension.
fn unique_name(original_filename: &str) -> String {
    match Path::new(original_filename).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    }
}

impl BlobStore {
    pub async fn local(storage_path: &str) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(storage_path).await.map_err(|e| {
            AppError::Storage(format!(
                "Failed to create storage directory {}: {}",
                storage_path, e
            ))
        })?;
        tracing::info!("Storage directory ensured at {}", storage_path);
        Ok(BlobStore::Local(LocalBlob {
            root: PathBuf::from(storage_path),
        }))
    }

    pub async fn s3(config: &Config) -> Result<Self, AppError> {
        let blob = S3Blob::new(config);
        blob.ensure_bucket_exists().await?;
        Ok(BlobStore::S3(blob))
    }

    /// Persist `content` under a freshly generated path and return that path.
    pub async fn save(
        &self,
        content: &[u8],
        original_filename: &str,
        content_type: &str,
    ) -> Result<String, AppError> {
        let name = unique_name(original_filename);
        match self {
            BlobStore::Local(local) => {
                let path = local.root.join(&name);
                tokio::fs::write(&path, content).await.map_err(|e| {
                    AppError::Storage(format!("Failed to save file {}: {}", path.display(), e))
                })?;
                Ok(path.to_string_lossy().into_owned())
            }
            BlobStore::S3(s3) => {
                let key = format!("uploads/{}", name);
                s3.put_object(&key, content.to_vec(), content_type).await?;
                Ok(key)
            }
        }
    }

    /// Read back a blob previously returned by `save`.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>, AppError> {
        match self {
            BlobStore::Local(_) => tokio::fs::read(path).await.map_err(|e| {
                AppError::Storage(format!("Failed to read file {}: {}", path, e))
            }),
            BlobStore::S3(s3) => s3.get_object(path).await,
        }
    }

    pub async fn health(&self) -> Result<(), AppError> {
        match self {
            BlobStore::Local(local) => {
                tokio::fs::metadata(&local.root).await.map_err(|e| {
                    AppError::Storage(format!(
                        "Storage directory {} not accessible: {}",
                        local.root.display(),
                        e
                    ))
                })?;
                Ok(())
            }
            BlobStore::S3(s3) => s3.health().await,
        }
    }
}

#[derive(Clone)]
pub struct LocalBlob {
    root: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_names_keep_the_extension() {
        let a = unique_name("clip.wav");
        let b = unique_name("clip.wav");
        assert!(a.ends_with(".wav"));
        assert!(b.ends_with(".wav"));
        assert_ne!(a, b);
        assert!(!unique_name("noext").contains('.'));
    }

    #[tokio::test]
    async fn local_save_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::local(dir.path().to_str().unwrap()).await.unwrap();

        let path = store.save(b"hello", "greeting.txt", "text/plain").await.unwrap();
        assert!(path.ends_with(".txt"));

        let content = store.read(&path).await.unwrap();
        assert_eq!(content, b"hello");

        store.health().await.unwrap();
    }

    #[tokio::test]
    async fn local_read_of_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::local(dir.path().to_str().unwrap()).await.unwrap();
        assert!(store.read("/nonexistent/blob.wav").await.is_err());
    }
}
