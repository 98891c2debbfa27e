//! Colour scales for precipitation frames.

use storm_common::{StormError, StormResult};

/// A colour at a normalized position in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub position: f32,
    pub color: [u8; 3],
}

/// Convert a hex colour string to RGB.
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

/// Reversed ColorBrewer "Spectral": violet for light rain, deep red for the peak.
const SPECTRAL_R: [&str; 11] = [
    "#5e4fa2", "#3288bd", "#66c2a5", "#abdda4", "#e6f598", "#ffffbf", "#fee08b", "#fdae61",
    "#f46d43", "#d53e4f", "#9e0142",
];

pub const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Piecewise-linear colormap with explicit colours for masked and
/// below-range values.
#[derive(Debug, Clone)]
pub struct Colormap {
    stops: Vec<ColorStop>,
    /// Colour for values below `vmin` (dry cells).
    pub under: [u8; 4],
    /// Colour for NaN (outside the watershed or missing).
    pub bad: [u8; 4],
}

impl Colormap {
    /// `Spectral_r` with white for dry and masked cells.
    pub fn spectral_r() -> Self {
        let stops = SPECTRAL_R
            .iter()
            .enumerate()
            .filter_map(|(i, hex)| {
                hex_to_rgb(hex).map(|(r, g, b)| ColorStop {
                    position: i as f32 / (SPECTRAL_R.len() - 1) as f32,
                    color: [r, g, b],
                })
            })
            .collect();
        Self {
            stops,
            under: WHITE,
            bad: WHITE,
        }
    }

    /// Colour at normalized position `t` (clamped to `[0, 1]`).
    pub fn sample(&self, t: f32) -> [u8; 4] {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let upper = self
            .stops
            .iter()
            .position(|s| s.position >= t)
            .unwrap_or(self.stops.len() - 1);
        if upper == 0 {
            let [r, g, b] = self.stops[0].color;
            return [r, g, b, 255];
        }

        let (lo, hi) = (self.stops[upper - 1], self.stops[upper]);
        let span = hi.position - lo.position;
        let f = if span <= f32::EPSILON {
            0.0
        } else {
            (t - lo.position) / span
        };
        let mix = |a: u8, b: u8| (a as f32 * (1.0 - f) + b as f32 * f).round() as u8;
        [
            mix(lo.color[0], hi.color[0]),
            mix(lo.color[1], hi.color[1]),
            mix(lo.color[2], hi.color[2]),
            255,
        ]
    }
}

/// Fixed value range shared by every frame of one animation.
#[derive(Debug, Clone)]
pub struct ColorScale {
    pub vmin: f32,
    pub vmax: f32,
    pub colormap: Colormap,
}

impl ColorScale {
    /// Scale from 0 to `vmax`. Fails when there is no positive value to scale to.
    pub fn new(vmax: Option<f32>, colormap: Colormap) -> StormResult<Self> {
        match vmax {
            Some(vmax) if vmax.is_finite() && vmax > 0.0 => Ok(Self {
                vmin: 0.0,
                vmax,
                colormap,
            }),
            _ => Err(StormError::Render(
                "no positive precipitation in the dataset; nothing to colour".to_string(),
            )),
        }
    }

    /// Colour for one value. Non-positive values are masked like the source
    /// plot does, so dry cells and NaN both come out as background.
    pub fn color_for(&self, value: f32) -> [u8; 4] {
        if value.is_nan() {
            return self.colormap.bad;
        }
        if value <= self.vmin {
            return self.colormap.under;
        }
        self.colormap
            .sample((value - self.vmin) / (self.vmax - self.vmin))
    }

    /// Evenly spaced tick values from vmin to vmax, inclusive.
    pub fn ticks(&self, count: usize) -> Vec<f32> {
        let count = count.max(2);
        (0..count)
            .map(|i| self.vmin + (self.vmax - self.vmin) * i as f32 / (count - 1) as f32)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb("#FF0000"), Some((255, 0, 0)));
        assert_eq!(hex_to_rgb("5e4fa2"), Some((0x5e, 0x4f, 0xa2)));
        assert_eq!(hex_to_rgb("#GGGGGG"), None);
        assert_eq!(hex_to_rgb("#FFF"), None);
    }

    #[test]
    fn test_spectral_r_endpoints() {
        let cmap = Colormap::spectral_r();
        assert_eq!(cmap.sample(0.0), [0x5e, 0x4f, 0xa2, 255]);
        assert_eq!(cmap.sample(1.0), [0x9e, 0x01, 0x42, 255]);
        assert_eq!(cmap.sample(0.5), [0xff, 0xff, 0xbf, 255]);
        assert_eq!(cmap.sample(7.0), cmap.sample(1.0));
    }

    #[test]
    fn test_scale_masks_dry_and_nan() {
        let scale = ColorScale::new(Some(2.0), Colormap::spectral_r()).unwrap();
        assert_eq!(scale.color_for(f32::NAN), WHITE);
        assert_eq!(scale.color_for(0.0), WHITE);
        assert_eq!(scale.color_for(-1.0), WHITE);
        assert_eq!(scale.color_for(2.0), [0x9e, 0x01, 0x42, 255]);
        assert_eq!(scale.color_for(10.0), scale.color_for(2.0));
    }

    #[test]
    fn test_scale_requires_positive_max() {
        assert!(ColorScale::new(None, Colormap::spectral_r()).is_err());
        assert!(ColorScale::new(Some(0.0), Colormap::spectral_r()).is_err());
        assert!(ColorScale::new(Some(f32::NAN), Colormap::spectral_r()).is_err());
    }

    #[test]
    fn test_ticks() {
        let scale = ColorScale::new(Some(3.0), Colormap::spectral_r()).unwrap();
        assert_eq!(scale.ticks(4), vec![0.0, 1.0, 2.0, 3.0]);
    }
}
