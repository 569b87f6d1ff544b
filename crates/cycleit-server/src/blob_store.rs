//! Bucketed object storage on the local filesystem.
//!
//! Objects live at `{base}/{bucket}/{key}`. Keys are relative paths such as
//! `{owner}/{product}/{millis}-{index}.jpg` and are served publicly through
//! `GET /storage/{bucket}/{key}`.

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use cycleit_shared::Bucket;

use crate::error::ServerError;

/// Verify that a resolved path stays within the expected base directory.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf, ServerError> {
    // Canonicalize base; target may not exist yet so normalize manually
    let canonical_base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    let mut resolved = canonical_base.clone();
    for component in target
        .strip_prefix(base)
        .unwrap_or(target)
        .components()
    {
        match component {
            Component::Normal(c) => resolved.push(c),
            Component::ParentDir => {
                return Err(ServerError::BadRequest("Path traversal detected".to_string()));
            }
            _ => {} // RootDir, CurDir, Prefix
        }
    }
    if !resolved.starts_with(&canonical_base) {
        return Err(ServerError::BadRequest("Path traversal detected".to_string()));
    }
    Ok(resolved)
}

/// Reject keys that are absolute, contain backslashes, or walk upwards.
fn validate_key(key: &str) -> Result<(), ServerError> {
    if key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(ServerError::BadRequest(format!("Invalid object key: {key}")));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    base_path: PathBuf,
    max_size: usize,
    public_base_url: String,
}

impl BlobStore {
    pub async fn new(
        base_path: PathBuf,
        max_size: usize,
        public_base_url: impl Into<String>,
    ) -> Result<Self, ServerError> {
        for bucket in [Bucket::ProductImages, Bucket::Avatars] {
            let dir = base_path.join(bucket.as_str());
            fs::create_dir_all(&dir).await.map_err(|e| {
                ServerError::BlobStorage(format!(
                    "Failed to create bucket directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        info!(path = %base_path.display(), "Blob store initialized");

        Ok(Self {
            base_path,
            max_size,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Store `data` under `bucket/key`. Without `upsert` an existing object
    /// is a conflict.
    pub async fn put(
        &self,
        bucket: Bucket,
        key: &str,
        data: &[u8],
        upsert: bool,
    ) -> Result<(), ServerError> {
        if data.is_empty() {
            return Err(ServerError::BadRequest("Empty object".to_string()));
        }
        if data.len() > self.max_size {
            return Err(ServerError::TooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let path = self.object_path(bucket, key)?;
        if !upsert && fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ServerError::Conflict(format!(
                "Object already exists: {}/{}",
                bucket, key
            )));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                ServerError::BlobStorage(format!("Failed to create directory for {key}: {e}"))
            })?;
        }

        fs::write(&path, data)
            .await
            .map_err(|e| ServerError::BlobStorage(format!("Failed to write {key}: {e}")))?;

        debug!(%bucket, key, size = data.len(), "Stored object");
        Ok(())
    }

    pub async fn get(&self, bucket: Bucket, key: &str) -> Result<Vec<u8>, ServerError> {
        let path = self.object_path(bucket, key)?;

        if !path.is_file() {
            return Err(ServerError::NotFound(format!("{bucket}/{key}")));
        }

        let data = fs::read(&path)
            .await
            .map_err(|e| ServerError::BlobStorage(format!("Failed to read {key}: {e}")))?;

        debug!(%bucket, key, size = data.len(), "Retrieved object");
        Ok(data)
    }

    pub async fn delete(&self, bucket: Bucket, key: &str) -> Result<(), ServerError> {
        let path = self.object_path(bucket, key)?;

        if !path.is_file() {
            return Err(ServerError::NotFound(format!("{bucket}/{key}")));
        }

        fs::remove_file(&path)
            .await
            .map_err(|e| ServerError::BlobStorage(format!("Failed to delete {key}: {e}")))?;

        debug!(%bucket, key, "Deleted object");
        Ok(())
    }

    pub fn public_url(&self, bucket: Bucket, key: &str) -> String {
        format!("{}/storage/{}/{}", self.public_base_url, bucket, key)
    }

    fn object_path(&self, bucket: Bucket, key: &str) -> Result<PathBuf, ServerError> {
        validate_key(key)?;
        let bucket_dir = self.base_path.join(bucket.as_str());
        ensure_within(&bucket_dir, &bucket_dir.join(key))
    }
}

/// Best-effort content type from the key's extension.
pub fn content_type_for(key: &str) -> &'static str {
    match key.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (BlobStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf(), 1024, "http://localhost:8080/")
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (store, _dir) = test_store().await;
        store
            .put(Bucket::ProductImages, "u/p/1-0.jpg", b"jpeg-bytes", false)
            .await
            .unwrap();
        let data = store.get(Bucket::ProductImages, "u/p/1-0.jpg").await.unwrap();
        assert_eq!(data, b"jpeg-bytes");
        // buckets are separate namespaces
        assert!(store.get(Bucket::Avatars, "u/p/1-0.jpg").await.is_err());
    }

    #[tokio::test]
    async fn test_upsert() {
        let (store, _dir) = test_store().await;
        store.put(Bucket::Avatars, "u/avatar.png", b"one", false).await.unwrap();

        let err = store
            .put(Bucket::Avatars, "u/avatar.png", b"two", false)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Conflict(_)));

        store.put(Bucket::Avatars, "u/avatar.png", b"two", true).await.unwrap();
        assert_eq!(store.get(Bucket::Avatars, "u/avatar.png").await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _dir) = test_store().await;
        store.put(Bucket::Avatars, "u/a.png", b"x", false).await.unwrap();
        store.delete(Bucket::Avatars, "u/a.png").await.unwrap();
        assert!(matches!(
            store.get(Bucket::Avatars, "u/a.png").await,
            Err(ServerError::NotFound(_))
        ));
        assert!(store.delete(Bucket::Avatars, "u/a.png").await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_bad_payloads() {
        let (store, _dir) = test_store().await;
        assert!(matches!(
            store.put(Bucket::Avatars, "u/a.png", b"", false).await,
            Err(ServerError::BadRequest(_))
        ));
        let big = vec![0u8; 1025];
        assert!(matches!(
            store.put(Bucket::Avatars, "u/a.png", &big, false).await,
            Err(ServerError::TooLarge { size: 1025, max: 1024 })
        ));
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let (store, _dir) = test_store().await;
        for key in ["../escape.png", "/abs.png", "a\\b.png", "a//b.png", "a/./b.png", ""] {
            assert!(
                store.put(Bucket::Avatars, key, b"x", true).await.is_err(),
                "{key:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_public_url() {
        let (store, _dir) = test_store().await;
        assert_eq!(
            store.public_url(Bucket::ProductImages, "u/p/1-0.jpg"),
            "http://localhost:8080/storage/product-images/u/p/1-0.jpg"
        );
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type_for("a/b.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a/b.bin"), "application/octet-stream");
    }
}
