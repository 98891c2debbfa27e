//! Writers for synthetic hourly precipitation partitions.
//!
//! Each partition is a Zarr V3 group holding one hour of data:
//! `APCP_surface[time, latitude, longitude]` plus the three coordinate
//! arrays, mirroring the layout of the gridded AORC archive.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::GroupBuilder;
use zarrs_filesystem::FilesystemStore;

/// Name of the precipitation variable in every partition.
pub const PRECIP_VARIABLE: &str = "APCP_surface";

/// Regular lat/lon grid of cell centres.
///
/// Latitudes run north to south, longitudes west to east, matching
/// the orientation of the production archive.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticGrid {
    /// Longitude of the first (westmost) column.
    pub west: f64,
    /// Latitude of the first (northmost) row.
    pub north: f64,
    /// Spacing in degrees for both axes.
    pub resolution: f64,
    pub width: usize,
    pub height: usize,
}

impl SyntheticGrid {
    /// 20x20 grid at 0.1 degrees with centres from (-80.95, 37.05) to
    /// (-79.05, 38.95).
    ///
    /// Fully contains [`crate::SQUARE_WATERSHED`]; exactly 10x10 centres
    /// fall inside it.
    pub fn around_square() -> Self {
        Self {
            west: -80.95,
            north: 38.95,
            resolution: 0.1,
            width: 20,
            height: 20,
        }
    }

    pub fn latitudes(&self) -> Vec<f64> {
        (0..self.height)
            .map(|i| self.north - i as f64 * self.resolution)
            .collect()
    }

    pub fn longitudes(&self) -> Vec<f64> {
        (0..self.width)
            .map(|j| self.west + j as f64 * self.resolution)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Write a single-hour partition at `path`.
///
/// `values` is row-major (`height` rows of `width` values) in mm.
pub fn write_partition(
    path: &Path,
    grid: &SyntheticGrid,
    time: DateTime<Utc>,
    values: &[f32],
) -> TestResult<()> {
    assert_eq!(values.len(), grid.len(), "values must cover the grid");

    std::fs::create_dir_all(path)?;
    let store = Arc::new(FilesystemStore::new(path)?);

    let group = GroupBuilder::new().build(store.clone(), "/")?;
    group.store_metadata()?;

    let height = grid.height as u64;
    let width = grid.width as u64;

    // Precipitation
    let precip = ArrayBuilder::new(
        vec![1, height, width],
        DataType::Float32,
        vec![1, height, width].try_into()?,
        FillValue::from(f32::NAN),
    )
    .attributes(attributes(&[
        ("_ARRAY_DIMENSIONS", serde_json::json!(["time", "latitude", "longitude"])),
        ("units", serde_json::json!("kg/m^2")),
        ("long_name", serde_json::json!("Total Precipitation")),
    ]))
    .build(store.clone(), &format!("/{}", PRECIP_VARIABLE))?;
    precip.store_metadata()?;
    precip.store_array_subset_elements(&full(&precip), values)?;

    // Coordinates
    let lat = ArrayBuilder::new(
        vec![height],
        DataType::Float64,
        vec![height].try_into()?,
        FillValue::from(f64::NAN),
    )
    .attributes(attributes(&[
        ("_ARRAY_DIMENSIONS", serde_json::json!(["latitude"])),
        ("units", serde_json::json!("degrees_north")),
    ]))
    .build(store.clone(), "/latitude")?;
    lat.store_metadata()?;
    lat.store_array_subset_elements(&full(&lat), &grid.latitudes())?;

    let lon = ArrayBuilder::new(
        vec![width],
        DataType::Float64,
        vec![width].try_into()?,
        FillValue::from(f64::NAN),
    )
    .attributes(attributes(&[
        ("_ARRAY_DIMENSIONS", serde_json::json!(["longitude"])),
        ("units", serde_json::json!("degrees_east")),
    ]))
    .build(store.clone(), "/longitude")?;
    lon.store_metadata()?;
    lon.store_array_subset_elements(&full(&lon), &grid.longitudes())?;

    let hours_since_epoch = time.timestamp() / 3600;
    let time_array = ArrayBuilder::new(
        vec![1],
        DataType::Int64,
        vec![1].try_into()?,
        FillValue::from(0i64),
    )
    .attributes(attributes(&[
        ("_ARRAY_DIMENSIONS", serde_json::json!(["time"])),
        ("units", serde_json::json!("hours since 1970-01-01 00:00:00")),
        ("calendar", serde_json::json!("standard")),
    ]))
    .build(store.clone(), "/time")?;
    time_array.store_metadata()?;
    time_array.store_array_subset_elements(&full(&time_array), &[hours_since_epoch])?;

    Ok(())
}

/// Write `hours` consecutive partitions under `base`, laid out as
/// `{base}/{YYYY}/{YYYYMMDDHH}.zarr`, starting at midnight of `start`.
///
/// `values_for_hour` supplies the row-major field for each hour index.
/// Returns the base location with a trailing separator, ready to pass
/// as the precipitation source.
pub fn write_storm_partitions<F>(
    base: &Path,
    start: &str,
    hours: i64,
    grid: &SyntheticGrid,
    mut values_for_hour: F,
) -> TestResult<String>
where
    F: FnMut(i64) -> Vec<f32>,
{
    let date = NaiveDate::parse_from_str(start, "%Y-%m-%d")?;
    let midnight = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).ok_or("bad start date")?);

    for hour in 0..hours {
        let ts = midnight + Duration::hours(hour);
        let path = partition_dir(base, &ts);
        write_partition(&path, grid, ts, &values_for_hour(hour))?;
    }

    Ok(format!("{}/", base.display()))
}

/// Directory of the partition for `ts` under `base`.
pub fn partition_dir(base: &Path, ts: &DateTime<Utc>) -> PathBuf {
    base.join(ts.format("%Y").to_string())
        .join(format!("{}.zarr", ts.format("%Y%m%d%H")))
}

fn attributes(pairs: &[(&str, serde_json::Value)]) -> serde_json::Map<String, serde_json::Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn full<S: ?Sized>(array: &Array<S>) -> ArraySubset {
    ArraySubset::new_with_shape(array.shape().to_vec())
}
