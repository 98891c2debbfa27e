//! Still frames on disk and the animated GIF built from them.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame};
use tracing::{debug, info, instrument};

use grid_processor::PrecipDataset;
use storm_common::{StormError, StormResult};
use watershed::Watershed;

use crate::config::RenderConfig;
use crate::frame::FrameRenderer;
use crate::png::encode_png;

fn render_err(context: &str, e: impl std::fmt::Display) -> StormError {
    StormError::Render(format!("{}: {}", context, e))
}

/// Render every timestep to `work_dir/YYYYMMDDHH.png`, then assemble the
/// stills written by this call into `work_dir/{output_name}.gif`.
///
/// Frames share one colour scale (0 to the dataset-wide maximum). Returns
/// the path of the GIF.
#[instrument(skip_all, fields(output = output_name, frames = dataset.times.len()))]
pub fn render_animation(
    work_dir: &Path,
    dataset: &PrecipDataset,
    output_name: &str,
    boundary: &Watershed,
    config: &RenderConfig,
) -> StormResult<PathBuf> {
    let renderer = FrameRenderer::new(dataset, boundary, config)?;
    info!(vmax = renderer.scale().vmax, "Rendering frames");

    let mut stills = Vec::with_capacity(renderer.len());
    for frame in renderer.frames() {
        let frame = frame?;
        let path = work_dir.join(frame.file_name());
        let png = encode_png(&frame.image)?;
        std::fs::write(&path, png)?;
        debug!(path = %path.display(), "Wrote frame");
        stills.push(path);
    }

    // Names are YYYYMMDDHH, so name order is time order
    stills.sort();
    let gif_path = work_dir.join(format!("{}.gif", output_name));
    write_gif(&stills, &gif_path, config.frame_delay_ms)?;

    info!(path = %gif_path.display(), frames = stills.len(), "Animation written");
    Ok(gif_path)
}

/// Encode `stills`, in the given order, as a looping GIF.
pub fn write_gif(stills: &[PathBuf], output: &Path, delay_ms: u32) -> StormResult<()> {
    if stills.is_empty() {
        return Err(StormError::Render("no frames to animate".to_string()));
    }

    let file = File::create(output)?;
    let mut encoder = GifEncoder::new(BufWriter::new(file));
    encoder
        .set_repeat(Repeat::Infinite)
        .map_err(|e| render_err("GIF setup failed", e))?;

    for path in stills {
        let image = image::open(path)
            .map_err(|e| render_err(&format!("failed to read {}", path.display()), e))?
            .to_rgba8();
        let frame = Frame::from_parts(image, 0, 0, Delay::from_numer_denom_ms(delay_ms, 1));
        encoder
            .encode_frame(frame)
            .map_err(|e| render_err("GIF encoding failed", e))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_write_gif_requires_frames() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_gif(&[], &dir.path().join("x.gif"), 100).unwrap_err();
        assert!(matches!(err, StormError::Render(_)));
    }

    #[test]
    fn test_write_gif_from_pngs() {
        let dir = tempfile::tempdir().unwrap();
        let mut stills = Vec::new();
        for i in 0..3u8 {
            let path = dir.path().join(format!("{}.png", i));
            let img = RgbaImage::from_pixel(8, 8, Rgba([i * 80, 0, 0, 255]));
            std::fs::write(&path, encode_png(&img).unwrap()).unwrap();
            stills.push(path);
        }

        let gif = dir.path().join("out.gif");
        write_gif(&stills, &gif, 250).unwrap();
        let bytes = std::fs::read(&gif).unwrap();
        assert_eq!(&bytes[..6], b"GIF89a");
    }
}
