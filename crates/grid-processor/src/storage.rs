//! Storage backends for reading Zarr partitions.
//!
//! Local paths are served by `zarrs_filesystem`. Remote partitions
//! (`s3://` or `/vsis3/`) go through `object_store`, wrapped for the
//! synchronous zarrs API.

use std::path::Path;
use std::sync::Arc;

use object_store::prefix::PrefixStore;
use object_store::ObjectStore;
use tracing::debug;
use zarrs::storage::ReadableStorageTraits;
use zarrs_filesystem::FilesystemStore;
use zarrs_object_store::AsyncObjectStore;
use zarrs_storage::storage_adapter::async_to_sync::{
    AsyncToSyncBlockOn, AsyncToSyncStorageAdapter,
};

use storage::{ObjectLocation, StorageProvider};
use storm_common::{StormError, StormResult};

/// Blocking executor that works from within a tokio runtime.
///
/// Uses `tokio::task::block_in_place` to move the current task to a blocking
/// thread, then uses the runtime handle to drive the future. Requires the
/// multi-thread runtime.
#[derive(Clone, Copy)]
pub struct TokioBlockOn;

impl AsyncToSyncBlockOn for TokioBlockOn {
    fn block_on<F: core::future::Future>(&self, future: F) -> F::Output {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
    }
}

/// Object store rooted at one partition.
type PartitionObjectStore = AsyncObjectStore<PrefixStore<Arc<dyn ObjectStore>>>;

/// Sync adapter over a remote partition.
pub type RemotePartitionStorage = AsyncToSyncStorageAdapter<PartitionObjectStore, TokioBlockOn>;

/// Any readable partition store.
pub type PartitionStorage = Arc<dyn ReadableStorageTraits>;

/// Opens hourly partitions from local disk or object storage.
#[derive(Clone)]
pub struct PartitionOpener {
    provider: Option<Arc<dyn StorageProvider>>,
}

impl PartitionOpener {
    /// Opener that can only read local partitions.
    pub fn local() -> Self {
        Self { provider: None }
    }

    /// Opener that reads remote partitions through `provider`.
    pub fn with_provider(provider: Arc<dyn StorageProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// Open the partition at `location`.
    ///
    /// Fails with `DatasetOpen` when a local partition does not exist.
    /// Remote partitions are only checked when their metadata is read.
    pub fn open(&self, location: &str) -> StormResult<PartitionStorage> {
        match ObjectLocation::parse(location)? {
            Some(remote) => self.open_remote(&remote),
            None => self.open_local(Path::new(location)),
        }
    }

    fn open_local(&self, path: &Path) -> StormResult<PartitionStorage> {
        if !path.is_dir() {
            return Err(StormError::DatasetOpen(format!(
                "partition {} does not exist",
                path.display()
            )));
        }
        let store = FilesystemStore::new(path).map_err(|e| {
            StormError::DatasetOpen(format!("failed to open {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Opened local partition");
        Ok(Arc::new(store))
    }

    fn open_remote(&self, location: &ObjectLocation) -> StormResult<PartitionStorage> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            StormError::DatasetOpen(format!(
                "no object storage configured to read {}",
                location
            ))
        })?;

        let storage = provider
            .bucket(&location.bucket)
            .map_err(|e| StormError::DatasetOpen(format!("{}: {}", location, e)))?;

        let prefix = location.key.trim_end_matches('/');
        let rooted = PrefixStore::new(storage.store(), prefix);
        let async_store = Arc::new(AsyncObjectStore::new(rooted));
        let sync_store: RemotePartitionStorage =
            AsyncToSyncStorageAdapter::new(async_store, TokioBlockOn);

        debug!(bucket = %location.bucket, key = %location.key, "Opened remote partition");
        Ok(Arc::new(sync_store))
    }
}

impl Default for PartitionOpener {
    fn default() -> Self {
        Self::local()
    }
}
