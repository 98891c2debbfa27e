//! Frame text: titles, the colorbar caption and tick labels.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use rusttype::{Font, Scale};

use storm_common::{StormError, StormResult};

/// Embedded font data - DejaVu Sans Mono
const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

/// Font handle shared by every frame of one animation.
#[derive(Clone)]
pub struct TextRenderer {
    font: Font<'static>,
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer").finish_non_exhaustive()
    }
}

impl TextRenderer {
    pub fn new() -> StormResult<Self> {
        let font = Font::try_from_bytes(FONT_DATA)
            .ok_or_else(|| StormError::Render("failed to load embedded font".to_string()))?;
        Ok(Self { font })
    }

    /// Width and height in pixels of `text` at `size` px.
    pub fn size(&self, text: &str, size: f32) -> (u32, u32) {
        let (w, h) = text_size(Scale::uniform(size), &self.font, text);
        (w.max(0) as u32, h.max(0) as u32)
    }

    pub fn width(&self, text: &str, size: f32) -> u32 {
        self.size(text, size).0
    }

    /// Draw `text` with its line box starting at (`x`, `y`).
    pub fn draw(&self, image: &mut RgbaImage, x: i32, y: i32, text: &str, size: f32, color: Rgba<u8>) {
        draw_text_mut(image, color, x, y, Scale::uniform(size), &self.font, text);
    }
}

/// Line height in pixels for a font size.
pub fn line_height(size: f32) -> u32 {
    size.ceil() as u32
}
