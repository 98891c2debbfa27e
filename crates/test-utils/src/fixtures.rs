//! Common test fixtures for storm-gif tests.
//!
//! GeoJSON documents covering the watershed shapes the loader has to handle,
//! plus a helper to drop them into a scratch directory.

use std::path::{Path, PathBuf};

/// Unit square watershed at (-80.5, 37.5)..(-79.5, 38.5) as a FeatureCollection.
pub const SQUARE_WATERSHED: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": { "name": "square" },
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[-80.5, 37.5], [-79.5, 37.5], [-79.5, 38.5], [-80.5, 38.5], [-80.5, 37.5]]]
      }
    }
  ]
}"#;

/// Two disjoint squares, the second one larger than the first.
pub const TWO_FEATURE_WATERSHED: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": { "name": "upper" },
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
      }
    },
    {
      "type": "Feature",
      "properties": { "name": "lower" },
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[3.0, 0.0], [5.0, 0.0], [5.0, 2.0], [3.0, 2.0], [3.0, 0.0]]]
      }
    }
  ]
}"#;

/// Two overlapping squares; their union is smaller than the sum of areas.
pub const OVERLAPPING_WATERSHED: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": {},
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0], [0.0, 0.0]]]
      }
    },
    {
      "type": "Feature",
      "properties": {},
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[1.0, 1.0], [3.0, 1.0], [3.0, 3.0], [1.0, 3.0], [1.0, 1.0]]]
      }
    }
  ]
}"#;

/// A single MultiPolygon feature with two parts.
pub const MULTIPART_WATERSHED: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": {},
      "geometry": {
        "type": "MultiPolygon",
        "coordinates": [
          [[[10.0, 10.0], [11.0, 10.0], [11.0, 11.0], [10.0, 11.0], [10.0, 10.0]]],
          [[[12.0, 10.0], [14.0, 10.0], [14.0, 12.0], [12.0, 12.0], [12.0, 10.0]]]
        ]
      }
    }
  ]
}"#;

/// A "bowtie" polygon whose ring crosses itself.
pub const SELF_INTERSECTING_WATERSHED: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": {},
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[0.0, 0.0], [2.0, 2.0], [2.0, 0.0], [0.0, 2.0], [0.0, 0.0]]]
      }
    }
  ]
}"#;

/// A FeatureCollection with no features.
pub const EMPTY_WATERSHED: &str = r#"{ "type": "FeatureCollection", "features": [] }"#;

/// Write a fixture into `dir` and return its path.
pub fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("Failed to write fixture");
    path
}

/// Common time values for testing.
pub mod time {
    /// Storm start used across the end-to-end tests.
    pub const STORM_START: &str = "2009-09-20";

    /// Expected output name for [`STORM_START`].
    pub const STORM_GIF: &str = "storm-2009-09-20.gif";
}
