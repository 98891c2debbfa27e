//! End-to-end rendering: dataset in, stills and GIF out.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use chrono::{Duration, TimeZone, Utc};
use grid_processor::PrecipDataset;
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, RgbaImage};
use renderer::{render_animation, RenderConfig};
use storm_common::StormError;
use watershed::{square, Watershed};

/// 6x6 grid at 0.2 degrees over (-81, 37)..(-79.8, 38.2). Hour `h` only
/// rains in column `h`, so every frame looks different.
fn moving_storm(hours: usize) -> PrecipDataset {
    let start = Utc.with_ymd_and_hms(2009, 9, 20, 0, 0, 0).unwrap();
    let times = (0..hours).map(|h| start + Duration::hours(h as i64)).collect();
    let lats = (0..6).map(|i| 38.1 - i as f64 * 0.2).collect();
    let lons = (0..6).map(|j| -80.9 + j as f64 * 0.2).collect();

    let mut data = Vec::with_capacity(hours * 36);
    for h in 0..hours {
        for _row in 0..6 {
            for col in 0..6 {
                data.push(if col == h % 6 { 0.5 + h as f32 * 0.1 } else { 0.0 });
            }
        }
    }
    PrecipDataset::new("APCP_surface", "in", times, lats, lons, data).unwrap()
}

fn boundary() -> Watershed {
    Watershed::from_polygon(square(-81.0, 37.0, 1.2)).unwrap()
}

fn pngs_in(dir: &std::path::Path) -> Vec<PathBuf> {
    let mut stills: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "png"))
        .collect();
    stills.sort();
    stills
}

fn difference(a: &RgbaImage, b: &RgbaImage) -> u64 {
    a.as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(x, y)| (*x as i64 - *y as i64).unsigned_abs())
        .sum()
}

#[test]
fn test_n_timesteps_give_n_stills_and_n_frames() {
    let dir = tempfile::tempdir().unwrap();
    let ds = moving_storm(4);
    let config = RenderConfig::default();

    let gif = render_animation(dir.path(), &ds, "storm-2009-09-20", &boundary(), &config).unwrap();
    assert_eq!(gif, dir.path().join("storm-2009-09-20.gif"));

    let stills = pngs_in(dir.path());
    let names: Vec<String> = stills
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["2009092000.png", "2009092001.png", "2009092002.png", "2009092003.png"]
    );

    let decoder = GifDecoder::new(BufReader::new(File::open(&gif).unwrap())).unwrap();
    let frames = decoder.into_frames().collect_frames().unwrap();
    assert_eq!(frames.len(), 4);

    for frame in &frames {
        let (numer, denom) = frame.delay().numer_denom_ms();
        assert_eq!(numer / denom, 100);
        assert_eq!(frame.buffer().dimensions(), (config.width, config.height));
    }
}

#[test]
fn test_gif_frames_are_in_time_order() {
    let dir = tempfile::tempdir().unwrap();
    let ds = moving_storm(3);
    let gif = render_animation(dir.path(), &ds, "storm", &boundary(), &RenderConfig::default()).unwrap();

    let stills: Vec<RgbaImage> = pngs_in(dir.path())
        .iter()
        .map(|p| image::open(p).unwrap().to_rgba8())
        .collect();

    let decoder = GifDecoder::new(BufReader::new(File::open(&gif).unwrap())).unwrap();
    let frames = decoder.into_frames().collect_frames().unwrap();

    // Each GIF frame is closest to the still with the same index
    for (k, frame) in frames.iter().enumerate() {
        let nearest = stills
            .iter()
            .enumerate()
            .min_by_key(|(_, still)| difference(frame.buffer(), still))
            .map(|(j, _)| j)
            .unwrap();
        assert_eq!(nearest, k);
    }
}

#[test]
fn test_dry_dataset_is_render_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut ds = moving_storm(2);
    ds.data.iter_mut().for_each(|v| *v = 0.0);

    let err = render_animation(dir.path(), &ds, "storm", &boundary(), &RenderConfig::default())
        .unwrap_err();
    assert!(matches!(err, StormError::Render(_)));
    assert!(pngs_in(dir.path()).is_empty());
}

#[test]
fn test_custom_delay_and_size() {
    let dir = tempfile::tempdir().unwrap();
    let config = RenderConfig {
        width: 320,
        height: 240,
        frame_delay_ms: 500,
        ..Default::default()
    };
    let gif = render_animation(dir.path(), &moving_storm(2), "small", &boundary(), &config).unwrap();

    let decoder = GifDecoder::new(BufReader::new(File::open(&gif).unwrap())).unwrap();
    let frames = decoder.into_frames().collect_frames().unwrap();
    assert_eq!(frames.len(), 2);
    let (numer, denom) = frames[0].delay().numer_denom_ms();
    assert_eq!(numer / denom, 500);
    assert_eq!(frames[0].buffer().dimensions(), (320, 240));
}

#[test]
fn test_unrelated_pngs_in_work_dir_are_not_frames() {
    let dir = tempfile::tempdir().unwrap();
    let legend = RgbaImage::from_pixel(16, 16, image::Rgba([0, 0, 0, 255]));
    std::fs::write(dir.path().join("zz-legend.png"), renderer::encode_png(&legend).unwrap()).unwrap();

    let gif = render_animation(dir.path(), &moving_storm(2), "storm", &boundary(), &RenderConfig::default())
        .unwrap();

    let decoder = GifDecoder::new(BufReader::new(File::open(&gif).unwrap())).unwrap();
    let frames = decoder.into_frames().collect_frames().unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(pngs_in(dir.path()).len(), 3);
}
