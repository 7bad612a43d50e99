//! S3-compatible object store (MinIO in the default deployment).

use super::{Bucket, ObjectStore};
use crate::config::{BucketNames, StorageSettings};
use crate::error::{Result, SmartLearnError};
use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{BucketConfiguration, Region};
use tracing::{info, instrument};

/// Object store backed by path-style S3 buckets.
pub struct S3ObjectStore {
    region: Region,
    credentials: Credentials,
    names: BucketNames,
}

impl S3ObjectStore {
    pub fn new(settings: &StorageSettings) -> Result<Self> {
        let access_key = settings.resolved_access_key();
        let secret_key = settings.resolved_secret_key();

        let credentials = Credentials::new(
            access_key.as_deref(),
            secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| SmartLearnError::Config(format!("Invalid storage credentials: {}", e)))?;

        Ok(Self {
            region: Region::Custom {
                region: settings.region.clone(),
                endpoint: settings.endpoint.clone(),
            },
            credentials,
            names: settings.buckets.clone(),
        })
    }

    fn bucket(&self, bucket: Bucket) -> Result<s3::Bucket> {
        Ok(s3::Bucket::new(
            bucket.name(&self.names),
            self.region.clone(),
            self.credentials.clone(),
        )?
        .with_path_style())
    }

    fn is_not_found(error: &S3Error) -> bool {
        matches!(error, S3Error::Http(404, _))
    }

    fn map_missing(error: S3Error, bucket: Bucket, key: &str) -> SmartLearnError {
        if Self::is_not_found(&error) {
            SmartLearnError::NotFound(format!("{:?}/{}", bucket, key))
        } else {
            error.into()
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self))]
    async fn ensure_bucket(&self, bucket: Bucket) -> Result<()> {
        let handle = self.bucket(bucket)?;

        if let Err(error) = handle.head_object("/").await {
            if !Self::is_not_found(&error) {
                return Err(error.into());
            }

            let name = bucket.name(&self.names);
            info!("Unknown bucket {}, creating it", name);
            s3::Bucket::create_with_path_style(
                name,
                self.region.clone(),
                self.credentials.clone(),
                BucketConfiguration::default(),
            )
            .await?;
        }

        Ok(())
    }

    async fn exists(&self, bucket: Bucket, key: &str) -> Result<bool> {
        match self.bucket(bucket)?.head_object(key).await {
            Ok(_) => Ok(true),
            Err(error) if Self::is_not_found(&error) => Ok(false),
            Err(error) => Err(error.into()),
        }
    }

    #[instrument(skip(self, data), fields(bytes = data.len()))]
    async fn put(&self, bucket: Bucket, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        self.bucket(bucket)?
            .put_object_with_content_type(key, data, content_type)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, bucket: Bucket, key: &str) -> Result<Vec<u8>> {
        let response = self
            .bucket(bucket)?
            .get_object(key)
            .await
            .map_err(|e| Self::map_missing(e, bucket, key))?;
        Ok(response.to_vec())
    }

    #[instrument(skip(self))]
    async fn delete(&self, bucket: Bucket, key: &str) -> Result<()> {
        // A plain S3 delete succeeds for missing keys.
        if !self.exists(bucket, key).await? {
            return Err(SmartLearnError::NotFound(format!("{:?}/{}", bucket, key)));
        }
        self.bucket(bucket)?
            .delete_object(key)
            .await
            .map_err(|e| Self::map_missing(e, bucket, key))?;
        Ok(())
    }

    async fn list(&self, bucket: Bucket, prefix: &str) -> Result<Vec<String>> {
        let pages = self.bucket(bucket)?.list(prefix.to_string(), None).await?;
        let mut keys: Vec<String> = pages
            .into_iter()
            .flat_map(|page| page.contents.into_iter().map(|object| object.key))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_configured_credentials() {
        let settings = StorageSettings {
            access_key: Some("minio".to_string()),
            secret_key: Some("minio123".to_string()),
            ..StorageSettings::default()
        };
        let store = S3ObjectStore::new(&settings).unwrap();
        assert!(store.bucket(Bucket::Videos).is_ok());
    }
}
