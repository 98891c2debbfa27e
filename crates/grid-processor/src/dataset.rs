//! In-memory precipitation cube.

use chrono::{DateTime, Utc};

use storm_common::{BoundingBox, Crs, StormError, StormResult};

/// A `(time, y, x)` precipitation cube.
///
/// `data` is time-major: frame `t` occupies
/// `data[t * height * width..(t + 1) * height * width]`, rows ordered as
/// `lats`, columns as `lons`. Masked cells are NaN.
#[derive(Debug, Clone)]
pub struct PrecipDataset {
    pub variable: String,
    pub units: String,
    pub crs: Crs,
    pub times: Vec<DateTime<Utc>>,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    /// Absolute grid spacing in degrees (lon, lat).
    pub resolution: (f64, f64),
    pub data: Vec<f32>,
}

impl PrecipDataset {
    /// Assemble a dataset, checking that `data` matches the coordinate lengths.
    pub fn new(
        variable: impl Into<String>,
        units: impl Into<String>,
        times: Vec<DateTime<Utc>>,
        lats: Vec<f64>,
        lons: Vec<f64>,
        data: Vec<f32>,
    ) -> StormResult<Self> {
        let expected = times.len() * lats.len() * lons.len();
        if data.len() != expected {
            return Err(StormError::DatasetOpen(format!(
                "data has {} values, coordinates describe {}",
                data.len(),
                expected
            )));
        }

        let resolution = (spacing(&lons), spacing(&lats));
        Ok(Self {
            variable: variable.into(),
            units: units.into(),
            crs: Crs::wgs84(),
            times,
            lats,
            lons,
            resolution,
            data,
        })
    }

    /// (time, height, width)
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.times.len(), self.lats.len(), self.lons.len())
    }

    pub fn width(&self) -> usize {
        self.lons.len()
    }

    pub fn height(&self) -> usize {
        self.lats.len()
    }

    pub fn frame_len(&self) -> usize {
        self.width() * self.height()
    }

    /// Values of one timestep, row-major.
    pub fn slice(&self, t: usize) -> Option<&[f32]> {
        let n = self.frame_len();
        self.data.get(t * n..(t + 1) * n)
    }

    /// Value at (t, row, col).
    pub fn value(&self, t: usize, row: usize, col: usize) -> Option<f32> {
        if row >= self.height() || col >= self.width() {
            return None;
        }
        self.slice(t).map(|frame| frame[row * self.width() + col])
    }

    /// Extent of the cell centres.
    pub fn bounds(&self) -> Option<BoundingBox> {
        let (min_x, max_x) = min_max(&self.lons)?;
        let (min_y, max_y) = min_max(&self.lats)?;
        Some(BoundingBox::new(min_x, min_y, max_x, max_y))
    }

    /// Divide every value by `divisor`, relabelling the units.
    pub fn convert_units(&mut self, divisor: f32, units: impl Into<String>) {
        for v in self.data.iter_mut() {
            *v /= divisor;
        }
        self.units = units.into();
    }

    /// Largest strictly positive, finite value across all timesteps.
    pub fn max_positive(&self) -> Option<f32> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite() && *v > 0.0)
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f32| m.max(v))))
    }

    /// Number of cells holding a finite value in the first timestep.
    pub fn valid_cells(&self) -> usize {
        self.slice(0)
            .map(|frame| frame.iter().filter(|v| !v.is_nan()).count())
            .unwrap_or(0)
    }
}

fn spacing(coords: &[f64]) -> f64 {
    match coords {
        [a, b, ..] => (b - a).abs(),
        _ => 0.0,
    }
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tiny() -> PrecipDataset {
        let times = vec![
            Utc.with_ymd_and_hms(2009, 9, 20, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2009, 9, 20, 1, 0, 0).unwrap(),
        ];
        PrecipDataset::new(
            "APCP_surface",
            "kg/m^2",
            times,
            vec![1.0, 0.5],
            vec![10.0, 10.5, 11.0],
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 0.0, 0.0, 25.4, f32::NAN, -1.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_shape_and_slice() {
        let ds = tiny();
        assert_eq!(ds.shape(), (2, 2, 3));
        assert_eq!(ds.slice(1).unwrap()[2], 25.4);
        assert!(ds.slice(2).is_none());
        assert_eq!(ds.value(0, 1, 2), Some(5.0));
        assert_eq!(ds.value(0, 2, 0), None);
        assert_eq!(ds.resolution, (0.5, 0.5));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = PrecipDataset::new("v", "u", vec![], vec![0.0], vec![0.0], vec![1.0]).unwrap_err();
        assert!(matches!(err, StormError::DatasetOpen(_)));
    }

    #[test]
    fn test_max_positive_ignores_nan_and_negative() {
        let ds = tiny();
        assert_eq!(ds.max_positive(), Some(25.4));

        let dry = PrecipDataset::new("v", "u", vec![Utc::now()], vec![0.0], vec![0.0], vec![0.0]).unwrap();
        assert_eq!(dry.max_positive(), None);
    }

    #[test]
    fn test_convert_units() {
        let mut ds = tiny();
        ds.convert_units(25.4, "in");
        assert_eq!(ds.units, "in");
        assert!((ds.value(1, 0, 2).unwrap() - 1.0).abs() < 1e-6);
        assert!(ds.value(1, 1, 0).unwrap().is_nan());
    }

    #[test]
    fn test_bounds() {
        let ds = tiny();
        assert_eq!(ds.bounds(), Some(BoundingBox::new(10.0, 0.5, 11.0, 1.0)));
    }
}
