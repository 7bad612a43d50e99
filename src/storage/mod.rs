//! Object storage for uploaded files and lecture artifacts.
//!
//! Artifacts live in six logical buckets. Keys may contain `/` to group a
//! lecture run's objects under one folder prefix.

mod local;
mod s3_store;

pub use local::LocalObjectStore;
pub use s3_store::S3ObjectStore;

use crate::config::{BucketNames, Settings, StorageProvider};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Logical bucket of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Uploaded PDFs.
    Files,
    /// Images extracted from or rendered for slides.
    Slides,
    /// Rendered lecture videos.
    Videos,
    /// Narration clips.
    Audio,
    /// Narration scripts.
    Scripts,
    /// Lecture metadata JSON.
    Metadata,
}

impl Bucket {
    pub const ALL: [Bucket; 6] = [
        Bucket::Files,
        Bucket::Slides,
        Bucket::Videos,
        Bucket::Audio,
        Bucket::Scripts,
        Bucket::Metadata,
    ];

    /// Configured name of this bucket.
    pub fn name<'a>(&self, names: &'a BucketNames) -> &'a str {
        match self {
            Bucket::Files => &names.files,
            Bucket::Slides => &names.slides,
            Bucket::Videos => &names.videos,
            Bucket::Audio => &names.audio,
            Bucket::Scripts => &names.scripts,
            Bucket::Metadata => &names.metadata,
        }
    }
}

/// Trait for object storage backends.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create the bucket if it does not exist.
    async fn ensure_bucket(&self, bucket: Bucket) -> Result<()>;

    async fn exists(&self, bucket: Bucket, key: &str) -> Result<bool>;

    /// Store an object, replacing any previous content.
    async fn put(&self, bucket: Bucket, key: &str, data: &[u8], content_type: &str) -> Result<()>;

    /// Fetch an object; a missing key is `NotFound`.
    async fn get(&self, bucket: Bucket, key: &str) -> Result<Vec<u8>>;

    /// Remove an object; a missing key is `NotFound`.
    async fn delete(&self, bucket: Bucket, key: &str) -> Result<()>;

    /// Keys starting with `prefix`, sorted.
    async fn list(&self, bucket: Bucket, prefix: &str) -> Result<Vec<String>>;
}

/// Create every bucket.
pub async fn ensure_all_buckets(store: &dyn ObjectStore) -> Result<()> {
    for bucket in Bucket::ALL {
        store.ensure_bucket(bucket).await?;
    }
    Ok(())
}

/// Build the configured object store.
pub fn create_object_store(settings: &Settings) -> Result<Arc<dyn ObjectStore>> {
    let storage = &settings.storage;
    match storage.provider {
        StorageProvider::Local => {
            let root = settings.local_storage_root();
            info!("Using local object storage at {:?}", root);
            Ok(Arc::new(LocalObjectStore::new(root, storage.buckets.clone())))
        }
        StorageProvider::S3 => {
            info!("Using S3 object storage at {}", storage.endpoint);
            Ok(Arc::new(S3ObjectStore::new(storage)?))
        }
    }
}

/// Guess a content type from a key's extension.
pub fn content_type_for(key: &str) -> &'static str {
    let extension = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_names_follow_config() {
        let names = BucketNames::default();
        assert_eq!(Bucket::Audio.name(&names), "audios");
        assert_eq!(Bucket::Files.name(&names), "files");
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("lecture/video.MP4"), "video/mp4");
        assert_eq!(content_type_for("slides.pdf"), "application/pdf");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
