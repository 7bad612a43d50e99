//! Filesystem-backed object store, one directory per bucket.

use super::{Bucket, ObjectStore};
use crate::config::BucketNames;
use crate::error::{Result, SmartLearnError};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, instrument};

/// Object store rooted at a local directory.
pub struct LocalObjectStore {
    root: PathBuf,
    names: BucketNames,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, names: BucketNames) -> Self {
        Self {
            root: root.into(),
            names,
        }
    }

    fn bucket_dir(&self, bucket: Bucket) -> PathBuf {
        self.root.join(bucket.name(&self.names))
    }

    /// Resolve a key to a path inside the bucket directory.
    fn object_path(&self, bucket: Bucket, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(SmartLearnError::InvalidInput(format!(
                "Invalid object key: {}",
                key
            )));
        }
        Ok(self.bucket_dir(bucket).join(relative))
    }

    fn not_found(bucket: Bucket, key: &str) -> SmartLearnError {
        SmartLearnError::NotFound(format!("{:?}/{}", bucket, key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn ensure_bucket(&self, bucket: Bucket) -> Result<()> {
        tokio::fs::create_dir_all(self.bucket_dir(bucket)).await?;
        Ok(())
    }

    async fn exists(&self, bucket: Bucket, key: &str) -> Result<bool> {
        let path = self.object_path(bucket, key)?;
        Ok(tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false))
    }

    #[instrument(skip(self, data), fields(bytes = data.len()))]
    async fn put(&self, bucket: Bucket, key: &str, data: &[u8], _content_type: &str) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        debug!("Stored {:?}", path);
        Ok(())
    }

    async fn get(&self, bucket: Bucket, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Self::not_found(bucket, key)),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, bucket: Bucket, key: &str) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Self::not_found(bucket, key)),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, bucket: Bucket, prefix: &str) -> Result<Vec<String>> {
        let base = self.bucket_dir(bucket);
        let mut keys = Vec::new();
        let mut pending = vec![base.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }

                let Ok(relative) = path.strip_prefix(&base) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, LocalObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), BucketNames::default());
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_get_list_delete() {
        let (_dir, store) = store();
        super::super::ensure_all_buckets(&store).await.unwrap();

        store
            .put(Bucket::Slides, "run1/slide_1_image_1.jpeg", b"img", "image/jpeg")
            .await
            .unwrap();
        store
            .put(Bucket::Slides, "run2/slide_1_image_1.jpeg", b"img2", "image/jpeg")
            .await
            .unwrap();

        assert!(store.exists(Bucket::Slides, "run1/slide_1_image_1.jpeg").await.unwrap());
        assert!(!store.exists(Bucket::Files, "run1/slide_1_image_1.jpeg").await.unwrap());
        assert_eq!(
            store.get(Bucket::Slides, "run2/slide_1_image_1.jpeg").await.unwrap(),
            b"img2"
        );

        let keys = store.list(Bucket::Slides, "run1/").await.unwrap();
        assert_eq!(keys, vec!["run1/slide_1_image_1.jpeg"]);

        store.delete(Bucket::Slides, "run1/slide_1_image_1.jpeg").await.unwrap();
        assert!(matches!(
            store.delete(Bucket::Slides, "run1/slide_1_image_1.jpeg").await,
            Err(SmartLearnError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let (_dir, store) = store();
        assert!(matches!(
            store.put(Bucket::Files, "../evil.pdf", b"x", "application/pdf").await,
            Err(SmartLearnError::InvalidInput(_))
        ));
        assert!(store.get(Bucket::Files, "/etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn test_list_missing_bucket_is_empty() {
        let (_dir, store) = store();
        assert!(store.list(Bucket::Videos, "").await.unwrap().is_empty());
    }
}
