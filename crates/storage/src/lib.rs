//! Storage abstractions for storm-gif.
//!
//! Provides:
//! - Object storage (S3 or in-memory) for inputs and the finished animation
//! - Parsing of `s3://` and GDAL-style `/vsis3/` locations
//! - An injectable [`StorageProvider`] so runs never reach for a global client

pub mod location;
pub mod object_store;
pub mod provider;

pub use self::object_store::{ObjectStorage, ObjectStorageConfig};
pub use location::ObjectLocation;
pub use provider::{InMemoryStorageProvider, S3StorageProvider, StorageProvider};
