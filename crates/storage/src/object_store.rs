//! Object storage interface (S3 compatible).

use std::path::Path as FsPath;
use std::sync::Arc;

use bytes::Bytes;
use object_store::{aws::AmazonS3Builder, path::Path, ObjectStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use storm_common::{StormError, StormResult};

/// Configuration for object storage connection.
///
/// Unset credentials fall back to the AWS default chain
/// (environment, profile, instance metadata).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// Custom S3 endpoint URL (MinIO, localstack); `None` uses AWS
    pub endpoint: Option<String>,
    /// Access key ID
    pub access_key_id: Option<String>,
    /// Secret access key
    pub secret_access_key: Option<String>,
    /// AWS region
    pub region: String,
    /// Allow HTTP (for local endpoints)
    pub allow_http: bool,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            region: "us-east-1".to_string(),
            allow_http: false,
        }
    }
}

impl ObjectStorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("S3_ENDPOINT")
                .or_else(|_| std::env::var("AWS_ENDPOINT"))
                .ok()
                .filter(|s| !s.is_empty()),
            access_key_id: std::env::var("AWS_ACCESS_KEY_ID").ok().filter(|s| !s.is_empty()),
            secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            region: std::env::var("AWS_REGION")
                .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
                .unwrap_or_else(|_| "us-east-1".to_string()),
            allow_http: std::env::var("S3_ALLOW_HTTP")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    pub fn validate(&self) -> StormResult<()> {
        if self.region.trim().is_empty() {
            return Err(StormError::Config("AWS region must not be empty".to_string()));
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(StormError::Config(
                "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together".to_string(),
            ));
        }
        if let Some(endpoint) = &self.endpoint {
            if endpoint.starts_with("http://") {
                if !self.allow_http {
                    return Err(StormError::Config(format!(
                        "endpoint {} uses http but S3_ALLOW_HTTP is not set",
                        endpoint
                    )));
                }
            } else if !endpoint.starts_with("https://") {
                return Err(StormError::Config(format!(
                    "endpoint {} must start with http:// or https://",
                    endpoint
                )));
            }
        }
        Ok(())
    }

    /// S3 client builder for one bucket.
    pub fn s3_builder(&self, bucket: &str) -> AmazonS3Builder {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_region(&self.region)
            .with_allow_http(self.allow_http);

        if let Some(endpoint) = &self.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if let (Some(key), Some(secret)) = (&self.access_key_id, &self.secret_access_key) {
            builder = builder
                .with_access_key_id(key)
                .with_secret_access_key(secret);
        }
        builder
    }
}

/// Object storage client scoped to one bucket.
#[derive(Clone)]
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl std::fmt::Debug for ObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl ObjectStorage {
    /// Create a new S3 client from config.
    pub fn new(config: &ObjectStorageConfig, bucket: &str) -> StormResult<Self> {
        let store = config
            .s3_builder(bucket)
            .build()
            .map_err(|e| StormError::Storage(format!("Failed to create S3 client: {}", e)))?;

        Ok(Self::from_store(Arc::new(store), bucket))
    }

    /// Wrap any object store (in-memory, local) under a bucket name.
    pub fn from_store(store: Arc<dyn ObjectStore>, bucket: &str) -> Self {
        Self {
            store,
            bucket: bucket.to_string(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Underlying store, for readers that need raw access (Zarr).
    pub fn store(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }

    /// `s3://{bucket}/{key}`
    pub fn uri(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key.trim_start_matches('/'))
    }

    /// Write bytes to a path in the bucket.
    #[instrument(skip(self, data), fields(bucket = %self.bucket, path = %path))]
    pub async fn put(&self, path: &str, data: Bytes) -> StormResult<()> {
        let location = Path::from(path);
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| StormError::Storage(format!("Failed to write {}: {}", path, e)))?;

        Ok(())
    }

    /// Read bytes from a path.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %path))]
    pub async fn get(&self, path: &str) -> StormResult<Bytes> {
        let location = Path::from(path);

        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| StormError::Storage(format!("Failed to read {}: {}", path, e)))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StormError::Storage(format!("Failed to read bytes: {}", e)))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    /// Check if an object exists.
    pub async fn exists(&self, path: &str) -> StormResult<bool> {
        let location = Path::from(path);

        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StormError::Storage(format!(
                "Failed to check {}: {}",
                path, e
            ))),
        }
    }

    /// Upload a local file and return its `s3://` URI.
    #[instrument(skip(self), fields(bucket = %self.bucket, key = %key))]
    pub async fn upload_file(&self, local: &FsPath, key: &str) -> StormResult<String> {
        let data = tokio::fs::read(local).await?;
        info!(local = %local.display(), size = data.len(), "Uploading file");
        self.put(key, Bytes::from(data)).await?;
        Ok(self.uri(key))
    }

    /// Download an object into a local file.
    #[instrument(skip(self), fields(bucket = %self.bucket, key = %key))]
    pub async fn download_to(&self, key: &str, dest: &FsPath) -> StormResult<()> {
        let bytes = self.get(key).await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;
        debug!(dest = %dest.display(), size = bytes.len(), "Downloaded object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn memory_storage() -> ObjectStorage {
        ObjectStorage::from_store(Arc::new(InMemory::new()), "test-bucket")
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ObjectStorageConfig::default();
        assert_eq!(config.region, "us-east-1");
        assert!(!config.allow_http);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_half_credentials() {
        let config = ObjectStorageConfig {
            access_key_id: Some("key".to_string()),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(StormError::Config(_))));
    }

    #[test]
    fn test_validate_http_endpoint_requires_allow_http() {
        let mut config = ObjectStorageConfig {
            endpoint: Some("http://localhost:9000".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        config.allow_http = true;
        assert!(config.validate().is_ok());

        config.endpoint = Some("localhost:9000".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_uri() {
        let storage = memory_storage();
        assert_eq!(storage.uri("gifs/storm.gif"), "s3://test-bucket/gifs/storm.gif");
        assert_eq!(storage.uri("/storm.gif"), "s3://test-bucket/storm.gif");
    }

    #[tokio::test]
    async fn test_put_get_exists() {
        let storage = memory_storage();
        assert!(!storage.exists("a/b.txt").await.unwrap());

        storage.put("a/b.txt", Bytes::from_static(b"hello")).await.unwrap();
        assert!(storage.exists("a/b.txt").await.unwrap());
        assert_eq!(storage.get("a/b.txt").await.unwrap().as_ref(), b"hello");
        assert!(!storage.exists("a/b").await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_and_download_file() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("in.bin");
        std::fs::write(&local, b"gif-bytes").unwrap();

        let storage = memory_storage();
        let uri = storage.upload_file(&local, "out/storm.gif").await.unwrap();
        assert_eq!(uri, "s3://test-bucket/out/storm.gif");

        let dest = dir.path().join("nested/copy.bin");
        storage.download_to("out/storm.gif", &dest).await.unwrap();
        assert_eq!(std::fs::read(dest).unwrap(), b"gif-bytes");
    }

    #[tokio::test]
    async fn test_get_missing_is_storage_error() {
        let storage = memory_storage();
        let err = storage.get("nope").await.unwrap_err();
        assert!(matches!(err, StormError::Storage(_)));
    }
}
