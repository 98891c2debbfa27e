//! PNG encoding for rendered frames.
//!
//! Frames are mostly flat colour (white background, one colormap, black
//! outline and text), so they usually fit a 256-entry palette:
//! - **Indexed PNG (color type 3)** when the frame has ≤256 unique colours
//! - **RGBA PNG (color type 6)** otherwise

use std::collections::HashMap;
use std::io::Write;

use image::RgbaImage;
use rayon::prelude::*;

use storm_common::{StormError, StormResult};

/// Maximum colours for indexed PNG (PNG8)
const MAX_PALETTE_SIZE: usize = 256;

/// Minimum rows to make a parallel palette scan worthwhile
const PARALLEL_ROWS: usize = 64;

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Encode a frame, choosing indexed or RGBA output automatically.
pub fn encode_png(image: &RgbaImage) -> StormResult<Vec<u8>> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let pixels = image.as_raw();

    let encoded = match extract_palette(pixels, width, height) {
        Some((palette, indices)) => encode_indexed(width, height, &palette, &indices),
        None => encode_rgba(pixels, width, height),
    };
    encoded.map_err(|e| StormError::Render(format!("PNG encoding failed: {}", e)))
}

/// Split pixels into a palette and per-pixel indices, or `None` when there
/// are more than 256 colours.
fn extract_palette(pixels: &[u8], width: usize, height: usize) -> Option<(Vec<[u8; 4]>, Vec<u8>)> {
    let row_bytes = width * 4;
    if row_bytes == 0 {
        return Some((Vec::new(), Vec::new()));
    }

    // Unique colours first, so the palette order is deterministic
    let mut palette: Vec<[u8; 4]> = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut lookup: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    for px in pixels.chunks_exact(4) {
        let key = u32::from_le_bytes([px[0], px[1], px[2], px[3]]);
        if !lookup.contains_key(&key) {
            if palette.len() == MAX_PALETTE_SIZE {
                return None;
            }
            lookup.insert(key, palette.len() as u8);
            palette.push([px[0], px[1], px[2], px[3]]);
        }
    }

    let map_row = |row: &[u8], out: &mut [u8]| {
        for (px, idx) in row.chunks_exact(4).zip(out.iter_mut()) {
            let key = u32::from_le_bytes([px[0], px[1], px[2], px[3]]);
            *idx = lookup.get(&key).copied().unwrap_or(0);
        }
    };

    let mut indices = vec![0u8; width * height];
    if height >= PARALLEL_ROWS {
        indices
            .par_chunks_mut(width)
            .zip(pixels.par_chunks(row_bytes))
            .for_each(|(out, row)| map_row(row, out));
    } else {
        for (out, row) in indices.chunks_mut(width).zip(pixels.chunks(row_bytes)) {
            map_row(row, out);
        }
    }

    Some((palette, indices))
}

fn header(width: usize, height: usize, color_type: u8) -> Vec<u8> {
    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr.push(8); // bit depth
    ihdr.push(color_type);
    ihdr.push(0); // compression
    ihdr.push(0); // filter
    ihdr.push(0); // interlace
    ihdr
}

fn encode_indexed(
    width: usize,
    height: usize,
    palette: &[[u8; 4]],
    indices: &[u8],
) -> std::io::Result<Vec<u8>> {
    let mut png = SIGNATURE.to_vec();
    write_chunk(&mut png, b"IHDR", &header(width, height, 3));

    let plte: Vec<u8> = palette.iter().flat_map(|c| [c[0], c[1], c[2]]).collect();
    write_chunk(&mut png, b"PLTE", &plte);

    if palette.iter().any(|c| c[3] < 255) {
        let trns: Vec<u8> = palette.iter().map(|c| c[3]).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    write_chunk(&mut png, b"IDAT", &deflate_scanlines(indices, width, height)?);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

fn encode_rgba(pixels: &[u8], width: usize, height: usize) -> std::io::Result<Vec<u8>> {
    let mut png = SIGNATURE.to_vec();
    write_chunk(&mut png, b"IHDR", &header(width, height, 6));
    write_chunk(&mut png, b"IDAT", &deflate_scanlines(pixels, width * 4, height)?);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// Prefix every scanline with filter byte 0 and zlib-compress.
fn deflate_scanlines(data: &[u8], row_bytes: usize, height: usize) -> std::io::Result<Vec<u8>> {
    let mut raw = Vec::with_capacity(height * (1 + row_bytes));
    for row in data.chunks(row_bytes.max(1)).take(height) {
        raw.push(0);
        raw.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&raw)?;
    encoder.finish()
}

fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}
