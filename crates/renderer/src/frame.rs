//! Map frames: one raster per timestep.
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │           2009-09-20 00  (title)          │
//! │ ┌───────────────────────────┐  Precip(in.)│
//! │ │                           │  ┌──┐ 1.20  │
//! │ │  precipitation + outline  │  │  │ 0.60  │
//! │ │                           │  └──┘ 0.00  │
//! │ └───────────────────────────┘             │
//! └───────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use rayon::prelude::*;
use tracing::debug;

use grid_processor::PrecipDataset;
use storm_common::{BoundingBox, StormError, StormResult};
use watershed::Watershed;

use crate::colormap::{ColorScale, Colormap, WHITE};
use crate::config::RenderConfig;
use crate::text::{line_height, TextRenderer};

const MARGIN: u32 = 12;
const TITLE_PX: f32 = 20.0;
const LABEL_PX: f32 = 13.0;
/// Width reserved right of the map for the colorbar and its labels.
const COLORBAR_PANEL: u32 = 100;
const COLORBAR_WIDTH: u32 = 18;
const TICKS: usize = 5;

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// One rendered timestep.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub time: DateTime<Utc>,
    pub image: RgbaImage,
}

impl RenderedFrame {
    /// `YYYYMMDDHH.png`, which sorts in time order.
    pub fn file_name(&self) -> String {
        format!("{}.png", self.time.format("%Y%m%d%H"))
    }
}

/// Title for a frame: `YYYY-MM-DD HH`.
pub fn frame_title(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H").to_string()
}

/// Pixel rectangle of the map inside the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PlotArea {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

/// Renders every timestep of a dataset with one shared colour scale.
pub struct FrameRenderer<'a> {
    dataset: &'a PrecipDataset,
    boundary: &'a Watershed,
    scale: ColorScale,
    extent: BoundingBox,
    plot: PlotArea,
    text: TextRenderer,
    /// Background, caption and colorbar, shared by every frame.
    base: RgbaImage,
}

impl<'a> FrameRenderer<'a> {
    pub fn new(
        dataset: &'a PrecipDataset,
        boundary: &'a Watershed,
        config: &RenderConfig,
    ) -> StormResult<Self> {
        config.validate()?;
        if dataset.times.is_empty() {
            return Err(StormError::Render("dataset has no timesteps".to_string()));
        }

        let scale = ColorScale::new(dataset.max_positive(), Colormap::spectral_r())?;
        let extent = boundary.bounds().expand(config.buffer_degrees);
        if !(extent.width() > 0.0 && extent.height() > 0.0) {
            return Err(StormError::Render(format!(
                "map extent {:?} has no area",
                extent
            )));
        }

        let plot = fit_plot_area(&extent, config.width, config.height);
        let text = TextRenderer::new()?;
        let base = draw_base(config, &scale, &text, &colorbar_caption(&dataset.units));

        debug!(?extent, ?plot, vmax = scale.vmax, "Prepared frame renderer");
        Ok(Self {
            dataset,
            boundary,
            scale,
            extent,
            plot,
            text,
            base,
        })
    }

    pub fn len(&self) -> usize {
        self.dataset.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn scale(&self) -> &ColorScale {
        &self.scale
    }

    /// Render timestep `t`.
    pub fn render(&self, t: usize) -> StormResult<RenderedFrame> {
        let time = *self
            .dataset
            .times
            .get(t)
            .ok_or_else(|| StormError::Render(format!("timestep {} out of range", t)))?;
        let values = self
            .dataset
            .slice(t)
            .ok_or_else(|| StormError::Render(format!("timestep {} has no data", t)))?;

        let mut image = self.base.clone();

        let map = self.rasterize(values);
        imageops::replace(&mut image, &map, self.plot.x as i64, self.plot.y as i64);

        self.draw_outline(&mut image);
        draw_hollow_rect_mut(
            &mut image,
            Rect::at(self.plot.x as i32 - 1, self.plot.y as i32 - 1)
                .of_size(self.plot.width + 2, self.plot.height + 2),
            BLACK,
        );

        let title = frame_title(&time);
        let title_x = self.plot.x as i32
            + (self.plot.width as i32 - self.text.width(&title, TITLE_PX) as i32) / 2;
        self.text
            .draw(&mut image, title_x, MARGIN as i32, &title, TITLE_PX, BLACK);

        Ok(RenderedFrame { time, image })
    }

    /// Frames in dataset (time) order.
    pub fn frames(&self) -> impl Iterator<Item = StormResult<RenderedFrame>> + '_ {
        (0..self.len()).map(move |t| self.render(t))
    }

    /// Nearest-cell sampling of one timestep over the plot area.
    fn rasterize(&self, values: &[f32]) -> RgbaImage {
        let PlotArea { width, height, .. } = self.plot;
        let ds = self.dataset;
        let (dx, dy) = ds.resolution;
        let (lon0, lat0) = (ds.lons[0], ds.lats[0]);
        let (cols, rows) = (ds.width() as f64, ds.height() as f64);
        let ext = self.extent;

        let mut pixels = vec![0u8; (width * height * 4) as usize];
        pixels
            .par_chunks_mut((width * 4) as usize)
            .enumerate()
            .for_each(|(py, row)| {
                let lat = ext.max_y - (py as f64 + 0.5) / height as f64 * ext.height();
                let r = if dy > 0.0 { ((lat0 - lat) / dy).round() } else { 0.0 };
                for (px, out) in row.chunks_exact_mut(4).enumerate() {
                    let lon = ext.min_x + (px as f64 + 0.5) / width as f64 * ext.width();
                    let c = if dx > 0.0 { ((lon - lon0) / dx).round() } else { 0.0 };

                    let color = if r >= 0.0 && r < rows && c >= 0.0 && c < cols {
                        self.scale
                            .color_for(values[r as usize * ds.width() + c as usize])
                    } else {
                        WHITE
                    };
                    out.copy_from_slice(&color);
                }
            });

        RgbaImage::from_raw(width, height, pixels).unwrap_or_else(|| RgbaImage::new(width, height))
    }

    fn draw_outline(&self, image: &mut RgbaImage) {
        let to_pixel = |x: f64, y: f64| -> (f32, f32) {
            let px = self.plot.x as f64 + (x - self.extent.min_x) / self.extent.width() * self.plot.width as f64;
            let py = self.plot.y as f64 + (self.extent.max_y - y) / self.extent.height() * self.plot.height as f64;
            (px as f32, py as f32)
        };

        for ring in self.boundary.exterior_rings() {
            for line in ring.lines() {
                let (x0, y0) = to_pixel(line.start.x, line.start.y);
                let (x1, y1) = to_pixel(line.end.x, line.end.y);
                // Offset copies give a 2 px line
                draw_line_segment_mut(image, (x0, y0), (x1, y1), BLACK);
                draw_line_segment_mut(image, (x0 + 1.0, y0), (x1 + 1.0, y1), BLACK);
                draw_line_segment_mut(image, (x0, y0 + 1.0), (x1, y1 + 1.0), BLACK);
            }
        }
    }
}

/// Colorbar caption for the dataset units.
pub fn colorbar_caption(units: &str) -> String {
    if units == "in" {
        "Precip (in.)".to_string()
    } else {
        "Precip (mm)".to_string()
    }
}

/// Largest rectangle with the extent's on-screen aspect ratio that fits
/// left of the colorbar panel, centred.
///
/// Longitude degrees shrink by cos(latitude), as in a plate carrée plot
/// with equal aspect at the map's mid latitude.
fn fit_plot_area(extent: &BoundingBox, width: u32, height: u32) -> PlotArea {
    let title_band = MARGIN * 2 + line_height(TITLE_PX);
    let avail_w = width.saturating_sub(MARGIN * 2 + COLORBAR_PANEL).max(1) as f64;
    let avail_h = height.saturating_sub(title_band + MARGIN).max(1) as f64;

    let mid_lat = (extent.min_y + extent.max_y) / 2.0;
    let lon_scale = mid_lat.to_radians().cos().abs().max(0.05);
    let ratio = extent.height() / (extent.width() * lon_scale);

    let (w, h) = if ratio > avail_h / avail_w {
        (avail_h / ratio, avail_h)
    } else {
        (avail_w, avail_w * ratio)
    };
    let (w, h) = (w.round().max(1.0) as u32, h.round().max(1.0) as u32);

    PlotArea {
        x: MARGIN + (avail_w as u32 - w) / 2,
        y: title_band + (avail_h as u32 - h) / 2,
        width: w,
        height: h,
    }
}

/// White canvas with the colorbar, its ticks and caption.
fn draw_base(
    config: &RenderConfig,
    scale: &ColorScale,
    text: &TextRenderer,
    caption: &str,
) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(config.width, config.height, Rgba(WHITE));

    let panel_x = config.width - MARGIN - COLORBAR_PANEL;
    let bar_x = panel_x + 16;
    let caption_y = MARGIN * 2 + line_height(TITLE_PX);
    let bar_top = caption_y + line_height(LABEL_PX) + 8;
    let bar_bottom = config.height - MARGIN;
    let bar_height = bar_bottom.saturating_sub(bar_top).max(1);

    text.draw(&mut image, panel_x as i32, caption_y as i32, caption, LABEL_PX, BLACK);

    for y in 0..bar_height {
        let t = 1.0 - y as f32 / (bar_height - 1).max(1) as f32;
        let color = Rgba(scale.colormap.sample(t));
        for x in bar_x..bar_x + COLORBAR_WIDTH {
            image.put_pixel(x, bar_top + y, color);
        }
    }
    draw_hollow_rect_mut(
        &mut image,
        Rect::at(bar_x as i32, bar_top as i32).of_size(COLORBAR_WIDTH, bar_height),
        BLACK,
    );

    let label_x = (bar_x + COLORBAR_WIDTH + 4) as i32;
    for tick in scale.ticks(TICKS) {
        let t = (tick - scale.vmin) / (scale.vmax - scale.vmin);
        let y = bar_bottom as f32 - 1.0 - t * (bar_height - 1) as f32;
        let x_end = (bar_x + COLORBAR_WIDTH + 2) as f32;
        draw_line_segment_mut(&mut image, ((bar_x + COLORBAR_WIDTH) as f32, y), (x_end, y), BLACK);
        let label_y = y as i32 - line_height(LABEL_PX) as i32 / 2;
        text.draw(&mut image, label_x, label_y, &format!("{:.2}", tick), LABEL_PX, BLACK);
    }

    image
}
