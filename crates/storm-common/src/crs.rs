//! Coordinate Reference System tags attached to datasets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known CRS codes understood by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 Geographic (lat/lon in degrees)
    Epsg4326,
}

impl CrsCode {
    /// EPSG numeric code.
    pub fn epsg(&self) -> u32 {
        match self {
            CrsCode::Epsg4326 => 4326,
        }
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// CRS assigned to a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crs {
    pub code: CrsCode,
}

impl Crs {
    pub fn new(code: CrsCode) -> Self {
        Self { code }
    }

    /// WGS84 lat/lon, the CRS of the hourly precipitation partitions.
    pub fn wgs84() -> Self {
        Self::new(CrsCode::Epsg4326)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.code.fmt(f)
    }
}
