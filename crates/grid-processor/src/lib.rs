//! Hourly precipitation loading with Zarr V3 support.
//!
//! Reads one Zarr partition per hour (from local disk or object storage),
//! concatenates them along time, then optionally masks the result to a
//! watershed and converts millimetres to inches.
//!
//! # Architecture
//!
//! ```text
//! partition paths
//!      │
//!      ▼
//! PartitionOpener::open ──► FilesystemStore | object_store (sync adapter)
//!      │
//!      ▼
//! load_partitions ──► sort by time, check shared grid
//!      │
//!      ├─► clip_to_boundary (optional)
//!      │
//!      └─► convert_units (optional)
//!               │
//!               ▼
//!          PrecipDataset
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{load_and_clip, LoadOptions, PartitionOpener};
//!
//! let paths = storm_common::generate_paths("2009-09-20", 24, "/data/aorc/")?;
//! let dataset = load_and_clip(&paths, Some(&watershed), &LoadOptions::default(), &PartitionOpener::local())?;
//! ```

pub mod cf_time;
pub mod clip;
pub mod config;
pub mod dataset;
pub mod loader;
pub mod storage;

// Re-export commonly used types at crate root
pub use cf_time::{CfTimeUnits, TimeUnit};
pub use clip::{clip_to_boundary, load_and_clip};
pub use config::{LoadOptions, DEFAULT_VARIABLE, MM_PER_INCH};
pub use dataset::PrecipDataset;
pub use loader::load_partitions;
pub use storage::{PartitionOpener, PartitionStorage, TokioBlockOn};
