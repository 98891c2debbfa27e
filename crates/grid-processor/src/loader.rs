//! Reading hourly partitions into a single dataset.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use zarrs::array::{Array, DataType};
use zarrs::array_subset::ArraySubset;
use zarrs::storage::ReadableStorageTraits;

use storm_common::{StormError, StormResult};

use crate::cf_time::CfTimeUnits;
use crate::dataset::PrecipDataset;
use crate::storage::{PartitionOpener, PartitionStorage};

const LAT_NAMES: [&str; 3] = ["latitude", "lat", "y"];
const LON_NAMES: [&str; 3] = ["longitude", "lon", "x"];
const TIME_NAMES: [&str; 1] = ["time"];

type PartitionArray = Array<dyn ReadableStorageTraits>;

/// One partition after decoding, before concatenation.
#[derive(Debug)]
struct Slab {
    source: String,
    times: Vec<DateTime<Utc>>,
    lats: Vec<f64>,
    lons: Vec<f64>,
    units: String,
    data: Vec<f32>,
}

/// Open every partition and concatenate along time.
///
/// Partitions are sorted by timestamp. Every partition must share the same
/// lat/lon grid and no timestamp may appear twice. Rows are returned north
/// to south and columns west to east regardless of storage order.
#[instrument(skip(paths, opener), fields(partitions = paths.len()))]
pub fn load_partitions(
    paths: &[String],
    variable: &str,
    opener: &PartitionOpener,
) -> StormResult<PrecipDataset> {
    if paths.is_empty() {
        return Err(StormError::DatasetOpen("no partitions to open".to_string()));
    }

    info!(first = %paths[0], last = %paths[paths.len() - 1], "Opening precipitation partitions");

    let mut slabs = paths
        .iter()
        .map(|path| read_partition(path, variable, opener))
        .collect::<StormResult<Vec<_>>>()?;

    slabs.sort_by_key(|s| s.times.first().copied());

    let reference = &slabs[0];
    for slab in &slabs[1..] {
        if slab.lats != reference.lats || slab.lons != reference.lons {
            return Err(StormError::DatasetOpen(format!(
                "partition {} does not share the grid of {}",
                slab.source, reference.source
            )));
        }
    }

    let lats = reference.lats.clone();
    let lons = reference.lons.clone();
    let units = reference.units.clone();

    let mut times = Vec::new();
    let mut data = Vec::with_capacity(slabs.iter().map(|s| s.data.len()).sum());
    for slab in slabs {
        times.extend(slab.times);
        data.extend(slab.data);
    }

    if let Some(pair) = times.windows(2).find(|w| w[0] >= w[1]) {
        return Err(StormError::DatasetOpen(format!(
            "duplicate or unordered timestamp {}",
            pair[1].format("%Y-%m-%d %H:%M")
        )));
    }

    let dataset = PrecipDataset::new(variable, units, times, lats, lons, data)?;
    debug!(shape = ?dataset.shape(), "Concatenated partitions");
    Ok(dataset)
}

fn read_partition(path: &str, variable: &str, opener: &PartitionOpener) -> StormResult<Slab> {
    let storage = opener.open(path)?;
    let open_err = |what: &str, e: String| {
        StormError::DatasetOpen(format!("{}: failed to read {}: {}", path, what, e))
    };

    let array = open_array(&storage, variable).map_err(|e| open_err(variable, e))?;
    let shape = array.shape().to_vec();

    let dims = declared_dimensions(&array);
    let time_names = candidates(dims.as_deref(), 0, &TIME_NAMES);
    let lat_names = candidates(dims.as_deref(), 1, &LAT_NAMES);
    let lon_names = candidates(dims.as_deref(), 2, &LON_NAMES);

    let lats = read_coordinate(&storage, &lat_names).map_err(|e| open_err("latitude", e))?;
    let lons = read_coordinate(&storage, &lon_names).map_err(|e| open_err("longitude", e))?;

    if lats.len() < 2 || lons.len() < 2 {
        return Err(StormError::DatasetOpen(format!(
            "{}: grid of {}x{} is too small to infer spacing",
            path,
            lons.len(),
            lats.len()
        )));
    }

    let (steps, height, width) = match shape.as_slice() {
        [t, h, w] => (*t as usize, *h as usize, *w as usize),
        other => {
            return Err(StormError::DatasetOpen(format!(
                "{}: expected (time, latitude, longitude), found {} dimensions",
                path,
                other.len()
            )))
        }
    };

    if height != lats.len() || width != lons.len() {
        return Err(StormError::DatasetOpen(format!(
            "{}: {} shape {:?} does not match coordinates ({}, {})",
            path,
            variable,
            shape,
            lats.len(),
            lons.len()
        )));
    }

    let times = read_times(&storage, &time_names).map_err(|e| open_err("time", e))?;
    if times.len() != steps {
        return Err(StormError::DatasetOpen(format!(
            "{}: {} has {} timesteps, time axis has {}",
            path,
            variable,
            steps,
            times.len()
        )));
    }

    let units = array
        .attributes()
        .get("units")
        .and_then(|v| v.as_str())
        .unwrap_or("mm")
        .to_string();

    let raw = read_as_f64(&array).map_err(|e| open_err(variable, e))?;
    let data = decode_values(&array, raw);

    let (lats, lons, data) = orient(lats, lons, data, steps);

    debug!(path, steps, height, width, "Read partition");
    Ok(Slab {
        source: path.to_string(),
        times,
        lats,
        lons,
        units,
        data,
    })
}

fn open_array(storage: &PartitionStorage, name: &str) -> Result<PartitionArray, String> {
    Array::open(Arc::clone(storage), &format!("/{}", name)).map_err(|e| e.to_string())
}

/// Dimension names from the xarray `_ARRAY_DIMENSIONS` attribute.
fn declared_dimensions(array: &PartitionArray) -> Option<Vec<String>> {
    array
        .attributes()
        .get("_ARRAY_DIMENSIONS")?
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// Coordinate names to try for `axis`: the declared one, then the defaults.
fn candidates<'a>(dims: Option<&'a [String]>, axis: usize, defaults: &[&'a str]) -> Vec<&'a str> {
    let mut names: Vec<&str> = dims
        .filter(|d| d.len() == 3)
        .and_then(|d| d.get(axis))
        .map(|name| vec![name.as_str()])
        .unwrap_or_default();
    for name in defaults {
        if !names.contains(name) {
            names.push(*name);
        }
    }
    names
}

fn open_first(storage: &PartitionStorage, names: &[&str]) -> Result<PartitionArray, String> {
    let mut last_err = String::from("not found");
    for name in names {
        match open_array(storage, name) {
            Ok(array) => return Ok(array),
            Err(e) => last_err = e,
        }
    }
    Err(format!("none of {:?} present ({})", names, last_err))
}

fn read_coordinate(storage: &PartitionStorage, names: &[&str]) -> Result<Vec<f64>, String> {
    read_as_f64(&open_first(storage, names)?)
}

fn read_times(storage: &PartitionStorage, names: &[&str]) -> Result<Vec<DateTime<Utc>>, String> {
    let array = open_first(storage, names)?;
    let units = array
        .attributes()
        .get("units")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "time axis has no units attribute".to_string())?;
    let units = CfTimeUnits::parse(units).map_err(|e| e.to_string())?;

    read_as_f64(&array)?
        .into_iter()
        .map(|v| units.decode(v).map_err(|e| e.to_string()))
        .collect()
}

/// Read a whole numeric array, widening to f64.
fn read_as_f64(array: &PartitionArray) -> Result<Vec<f64>, String> {
    let subset = ArraySubset::new_with_shape(array.shape().to_vec());
    macro_rules! widen {
        ($t:ty) => {
            array
                .retrieve_array_subset_elements::<$t>(&subset)
                .map(|v| v.into_iter().map(|x| x as f64).collect())
                .map_err(|e| e.to_string())
        };
    }

    match array.data_type() {
        DataType::Float64 => array
            .retrieve_array_subset_elements::<f64>(&subset)
            .map_err(|e| e.to_string()),
        DataType::Float32 => widen!(f32),
        DataType::Int64 => widen!(i64),
        DataType::Int32 => widen!(i32),
        DataType::Int16 => widen!(i16),
        DataType::UInt32 => widen!(u32),
        DataType::UInt16 => widen!(u16),
        other => Err(format!("unsupported data type {:?}", other)),
    }
}

/// Apply CF packing attributes and turn fill values into NaN.
fn decode_values(array: &PartitionArray, raw: Vec<f64>) -> Vec<f32> {
    let attrs = array.attributes();
    let number = |key: &str| attrs.get(key).and_then(|v| v.as_f64());

    let scale = number("scale_factor").unwrap_or(1.0);
    let offset = number("add_offset").unwrap_or(0.0);
    let fill = number("_FillValue").or_else(|| number("missing_value"));

    raw.into_iter()
        .map(|v| {
            if v.is_nan() || fill.is_some_and(|f| v == f) {
                f32::NAN
            } else {
                (v * scale + offset) as f32
            }
        })
        .collect()
}

/// Flip rows/columns so latitude descends and longitude ascends.
fn orient(
    mut lats: Vec<f64>,
    mut lons: Vec<f64>,
    mut data: Vec<f32>,
    steps: usize,
) -> (Vec<f64>, Vec<f64>, Vec<f32>) {
    let (height, width) = (lats.len(), lons.len());
    let flip_rows = lats[0] < lats[height - 1];
    let flip_cols = lons[0] > lons[width - 1];

    if flip_rows || flip_cols {
        warn!(flip_rows, flip_cols, "Reorienting partition grid");
        let frame = height * width;
        for t in 0..steps {
            let chunk = &mut data[t * frame..(t + 1) * frame];
            if flip_rows {
                for r in 0..height / 2 {
                    for c in 0..width {
                        chunk.swap(r * width + c, (height - 1 - r) * width + c);
                    }
                }
            }
            if flip_cols {
                for row in chunk.chunks_mut(width) {
                    row.reverse();
                }
            }
        }
        if flip_rows {
            lats.reverse();
        }
        if flip_cols {
            lons.reverse();
        }
    }

    (lats, lons, data)
}
