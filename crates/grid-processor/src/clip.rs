//! Masking a dataset to a watershed and the full load pipeline.

use tracing::{debug, error, info, instrument};

use storm_common::{StormError, StormResult};
use watershed::Watershed;

use crate::config::LoadOptions;
use crate::dataset::PrecipDataset;
use crate::loader::load_partitions;
use crate::storage::PartitionOpener;

/// Mask `dataset` to `boundary`.
///
/// A cell is kept when its centre lies inside the boundary. The grid is
/// cropped to the contiguous block of rows and columns spanning every kept
/// cell, so spacing stays regular; outside cells in that block become NaN.
pub fn clip_to_boundary(dataset: &PrecipDataset, boundary: &Watershed) -> StormResult<PrecipDataset> {
    let (steps, height, width) = dataset.shape();

    let mut inside = vec![false; height * width];
    for (r, lat) in dataset.lats.iter().enumerate() {
        for (c, lon) in dataset.lons.iter().enumerate() {
            inside[r * width + c] = boundary.contains(*lon, *lat);
        }
    }

    let kept_rows: Vec<usize> = (0..height)
        .filter(|r| inside[r * width..(r + 1) * width].iter().any(|v| *v))
        .collect();
    let kept_cols: Vec<usize> = (0..width)
        .filter(|c| (0..height).any(|r| inside[r * width + c]))
        .collect();

    let rows: Vec<usize> = match (kept_rows.first(), kept_rows.last()) {
        (Some(&first), Some(&last)) => (first..=last).collect(),
        _ => Vec::new(),
    };
    let cols: Vec<usize> = match (kept_cols.first(), kept_cols.last()) {
        (Some(&first), Some(&last)) => (first..=last).collect(),
        _ => Vec::new(),
    };

    if rows.is_empty() || cols.is_empty() {
        let bounds = boundary.bounds();
        return Err(StormError::NoDataInBounds(format!(
            "no grid cell centre falls inside the watershed ({}, {}, {}, {})",
            bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y
        )));
    }

    let mut data = Vec::with_capacity(steps * rows.len() * cols.len());
    for t in 0..steps {
        let frame = dataset.slice(t).unwrap_or(&[]);
        for &r in &rows {
            for &c in &cols {
                let idx = r * width + c;
                data.push(if inside[idx] { frame[idx] } else { f32::NAN });
            }
        }
    }

    let lats = rows.iter().map(|&r| dataset.lats[r]).collect();
    let lons = cols.iter().map(|&c| dataset.lons[c]).collect();

    let mut clipped = PrecipDataset::new(
        dataset.variable.clone(),
        dataset.units.clone(),
        dataset.times.clone(),
        lats,
        lons,
        data,
    )?;
    // A single kept row or column cannot tell its own spacing.
    clipped.resolution = dataset.resolution;
    clipped.crs = dataset.crs;
    Ok(clipped)
}

/// Open all partitions, tag them EPSG:4326, optionally clip and convert.
///
/// `boundary` is required when `options.clip` is set.
#[instrument(skip_all, fields(partitions = paths.len(), clip = options.clip))]
pub fn load_and_clip(
    paths: &[String],
    boundary: Option<&Watershed>,
    options: &LoadOptions,
    opener: &PartitionOpener,
) -> StormResult<PrecipDataset> {
    info!("Loading precipitation dataset");
    let mut dataset = load_partitions(paths, &options.variable, opener)?;
    debug!(crs = %dataset.crs.code, "Assigned CRS");

    if options.clip {
        let boundary = boundary.ok_or_else(|| {
            StormError::InvalidInput("clipping requested without a watershed boundary".to_string())
        })?;
        info!("Clipping to watershed");
        let clipped = clip_to_boundary(&dataset, boundary)?;
        if clipped.shape() == dataset.shape() {
            error!(shape = ?dataset.shape(), "Clipping did not change dataset dimensions");
        }
        dataset = clipped;
    }

    if options.convert_units {
        info!(divisor = options.unit_divisor, "Converting millimetres to inches");
        let units = options.output_units(&dataset.units);
        dataset.convert_units(options.unit_divisor, units);
    }

    info!(shape = ?dataset.shape(), units = %dataset.units, "Dataset ready");
    Ok(dataset)
}
