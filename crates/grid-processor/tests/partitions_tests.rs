//! Integration test: write synthetic hourly partitions and load them back.
//!
//! Exercises the whole loading path:
//! 1. Write N hourly Zarr V3 partitions with known values
//! 2. Load them through `load_and_clip` (local disk or object storage)
//! 3. Verify shape, ordering, clipping and unit conversion

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use grid_processor::{clip_to_boundary, load_and_clip, LoadOptions, PartitionOpener};
use storage::{InMemoryStorageProvider, ObjectStorage, StorageProvider};
use storm_common::{generate_paths, StormError};
use test_utils::{
    assert_approx_eq, create_storm_cell, create_test_grid, write_storm_partitions, SyntheticGrid,
    SQUARE_WATERSHED,
};
use watershed::parse_boundary;

const START: &str = "2009-09-20";

fn raw_options() -> LoadOptions {
    LoadOptions {
        clip: false,
        convert_units: false,
        ..Default::default()
    }
}

/// Hour `h` has value `col * 1000 + row + h * 0.5` at each cell.
fn hourly_values(grid: &SyntheticGrid) -> impl FnMut(i64) -> Vec<f32> + '_ {
    move |h| {
        create_test_grid(grid.width, grid.height)
            .into_iter()
            .map(|v| v + h as f32 * 0.5)
            .collect()
    }
}

#[test]
fn test_load_concatenates_hours_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let grid = SyntheticGrid::around_square();
    let base = write_storm_partitions(dir.path(), START, 3, &grid, hourly_values(&grid)).unwrap();

    let paths = generate_paths(START, 3, &base).unwrap();
    // Reverse to check that ordering comes from the time axis
    let reversed: Vec<String> = paths.iter().rev().cloned().collect();
    let ds = load_and_clip(&reversed, None, &raw_options(), &PartitionOpener::local()).unwrap();

    assert_eq!(ds.shape(), (3, 20, 20));
    assert_eq!(ds.units, "kg/m^2");
    assert_eq!(ds.times[0].format("%Y%m%d%H").to_string(), "2009092000");
    assert_eq!(ds.times[2].format("%Y%m%d%H").to_string(), "2009092002");
    assert_approx_eq!(ds.resolution.0, 0.1, 1e-9);

    for h in 0..3 {
        assert_approx_eq!(ds.value(h, 4, 7).unwrap(), 7004.0 + h as f32 * 0.5, 1e-3);
    }
}

#[test]
fn test_clip_shrinks_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let grid = SyntheticGrid::around_square();
    let base = write_storm_partitions(dir.path(), START, 2, &grid, |_| {
        create_storm_cell(grid.width, grid.height, 10.0, 10.0, 4.0, 40.0)
    })
    .unwrap();
    let paths = generate_paths(START, 2, &base).unwrap();
    let boundary = parse_boundary(SQUARE_WATERSHED, false).unwrap();

    let full = load_and_clip(&paths, None, &raw_options(), &PartitionOpener::local()).unwrap();
    let options = LoadOptions {
        clip: true,
        ..raw_options()
    };
    let clipped = load_and_clip(&paths, Some(&boundary), &options, &PartitionOpener::local()).unwrap();

    assert_eq!(clipped.shape(), (2, 10, 10));
    assert!(clipped.height() < full.height() && clipped.width() < full.width());
    let bounds = clipped.bounds().unwrap();
    assert!(bounds.min_x > -80.5 && bounds.max_x < -79.5);
    assert!(bounds.min_y > 37.5 && bounds.max_y < 38.5);

    let again = clip_to_boundary(&clipped, &boundary).unwrap();
    assert_eq!(again.shape(), clipped.shape());
    assert_eq!(again.lats, clipped.lats);
    for (a, b) in again.data.iter().zip(&clipped.data) {
        assert!(a == b || (a.is_nan() && b.is_nan()));
    }
}

#[test]
fn test_noop_clip_keeps_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let grid = SyntheticGrid {
        west: -80.4,
        north: 38.4,
        resolution: 0.2,
        width: 4,
        height: 4,
    };
    let base = write_storm_partitions(dir.path(), START, 1, &grid, |_| vec![2.0; 16]).unwrap();
    let paths = generate_paths(START, 1, &base).unwrap();
    let boundary = parse_boundary(SQUARE_WATERSHED, false).unwrap();

    let options = LoadOptions {
        clip: true,
        ..raw_options()
    };
    let ds = load_and_clip(&paths, Some(&boundary), &options, &PartitionOpener::local()).unwrap();
    assert_eq!(ds.shape(), (1, 4, 4));
    assert_eq!(ds.valid_cells(), 16);
}

#[test]
fn test_unit_conversion_is_invertible() {
    let dir = tempfile::tempdir().unwrap();
    let grid = SyntheticGrid::around_square();
    let base = write_storm_partitions(dir.path(), START, 2, &grid, |h| {
        create_storm_cell(grid.width, grid.height, 5.0 + h as f32, 8.0, 3.0, 25.0)
    })
    .unwrap();
    let paths = generate_paths(START, 2, &base).unwrap();

    let mm = load_and_clip(&paths, None, &raw_options(), &PartitionOpener::local()).unwrap();
    let inches = load_and_clip(&paths, None, &LoadOptions::default(), &PartitionOpener::local()).unwrap();

    assert_eq!(inches.units, "in");
    assert_eq!(mm.shape(), inches.shape());
    for (x, converted) in mm.data.iter().zip(&inches.data) {
        assert_approx_eq!(converted * 25.4, *x, 1e-4);
    }
}

#[test]
fn test_clip_without_boundary_is_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let grid = SyntheticGrid::around_square();
    let base = write_storm_partitions(dir.path(), START, 1, &grid, hourly_values(&grid)).unwrap();
    let paths = generate_paths(START, 1, &base).unwrap();

    let options = LoadOptions {
        clip: true,
        ..Default::default()
    };
    let err = load_and_clip(&paths, None, &options, &PartitionOpener::local()).unwrap_err();
    assert!(matches!(err, StormError::InvalidInput(_)));
}

#[test]
fn test_missing_partition_is_dataset_open() {
    let dir = tempfile::tempdir().unwrap();
    let grid = SyntheticGrid::around_square();
    let base = write_storm_partitions(dir.path(), START, 2, &grid, hourly_values(&grid)).unwrap();

    let paths = generate_paths(START, 3, &base).unwrap();
    let err = load_and_clip(&paths, None, &raw_options(), &PartitionOpener::local()).unwrap_err();
    assert!(matches!(err, StormError::DatasetOpen(_)), "{:?}", err);
}

#[test]
fn test_mismatched_grid_is_dataset_open() {
    let dir = tempfile::tempdir().unwrap();
    let grid = SyntheticGrid::around_square();
    let base = write_storm_partitions(dir.path(), START, 1, &grid, hourly_values(&grid)).unwrap();

    let shifted = SyntheticGrid {
        west: grid.west + 1.0,
        ..grid
    };
    let second = dir.path().join("2009/2009092001.zarr");
    let ts = chrono::DateTime::parse_from_rfc3339("2009-09-20T01:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    test_utils::write_partition(&second, &shifted, ts, &vec![0.0; shifted.len()]).unwrap();

    let paths = generate_paths(START, 2, &base).unwrap();
    let err = load_and_clip(&paths, None, &raw_options(), &PartitionOpener::local()).unwrap_err();
    assert!(matches!(err, StormError::DatasetOpen(_)), "{:?}", err);
}

/// Copy a local directory tree into a bucket under `prefix`.
async fn upload_tree(storage: &ObjectStorage, root: &Path, dir: &Path) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            Box::pin(upload_tree(storage, root, &path)).await;
        } else {
            let key = format!("aorc/{}", path.strip_prefix(root).unwrap().display());
            let data = std::fs::read(&path).unwrap();
            storage.put(&key, Bytes::from(data)).await.unwrap();
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_load_from_object_storage() {
    let dir = tempfile::tempdir().unwrap();
    let grid = SyntheticGrid::around_square();
    write_storm_partitions(dir.path(), START, 2, &grid, hourly_values(&grid)).unwrap();

    let provider = Arc::new(InMemoryStorageProvider::new());
    let bucket = provider.bucket("tempest").unwrap();
    upload_tree(&bucket, dir.path(), dir.path()).await;

    let opener = PartitionOpener::with_provider(provider.clone());
    for base in ["s3://tempest/aorc/", "/vsis3/tempest/aorc/"] {
        let paths = generate_paths(START, 2, base).unwrap();
        let ds = load_and_clip(&paths, None, &raw_options(), &opener).unwrap();
        assert_eq!(ds.shape(), (2, 20, 20));
        assert_approx_eq!(ds.value(1, 3, 2).unwrap(), 2003.5, 1e-3);
    }

    let missing = generate_paths("2009-09-22", 1, "s3://tempest/aorc/").unwrap();
    let err = load_and_clip(&missing, None, &raw_options(), &opener).unwrap_err();
    assert!(matches!(err, StormError::DatasetOpen(_)));
}
