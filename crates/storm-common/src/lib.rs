//! Common types and utilities shared across the storm-gif crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod time;

pub use bbox::BoundingBox;
pub use crs::{Crs, CrsCode};
pub use error::{StormError, StormResult};
pub use time::{generate_paths, HourlyRange};
