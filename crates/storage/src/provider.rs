//! Injectable storage providers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use object_store::memory::InMemory;
use tracing::debug;

use storm_common::{StormError, StormResult};

use crate::object_store::{ObjectStorage, ObjectStorageConfig};

/// Hands out a client for a named bucket.
pub trait StorageProvider: Send + Sync {
    fn bucket(&self, bucket: &str) -> StormResult<ObjectStorage>;
}

/// Real S3 access.
#[derive(Debug, Clone)]
pub struct S3StorageProvider {
    config: ObjectStorageConfig,
}

impl S3StorageProvider {
    pub fn new(config: ObjectStorageConfig) -> Self {
        Self { config }
    }
}

impl StorageProvider for S3StorageProvider {
    fn bucket(&self, bucket: &str) -> StormResult<ObjectStorage> {
        debug!(bucket, "Creating S3 client");
        ObjectStorage::new(&self.config, bucket)
    }
}

/// Process-local buckets backed by `object_store::memory::InMemory`.
///
/// The same bucket name always maps to the same store, so objects written
/// through one client are visible through the next.
#[derive(Debug, Default)]
pub struct InMemoryStorageProvider {
    buckets: Mutex<HashMap<String, Arc<InMemory>>>,
}

impl InMemoryStorageProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageProvider for InMemoryStorageProvider {
    fn bucket(&self, bucket: &str) -> StormResult<ObjectStorage> {
        if bucket.is_empty() {
            return Err(StormError::Storage("bucket name must not be empty".to_string()));
        }
        let mut buckets = self
            .buckets
            .lock()
            .map_err(|_| StormError::Storage("bucket registry poisoned".to_string()))?;
        let store = buckets
            .entry(bucket.to_string())
            .or_insert_with(|| Arc::new(InMemory::new()))
            .clone();
        Ok(ObjectStorage::from_store(store, bucket))
    }
}
