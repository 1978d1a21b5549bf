//! Tile extraction and image encoding.
//!
//! Extraction is a pure transform: for a tile coordinate the source-space
//! crop rectangle is recovered by inverting the zoom scale, clamped to the
//! raster, resampled with a Lanczos filter and composited onto a transparent
//! canvas. The same inputs always produce byte-identical output. The
//! pyramid is dense: a coordinate whose clamped crop is empty still yields
//! a (fully transparent) tile of the exact tile size.
//!
//! The encoding format is a caller-selected policy, not an extractor
//! decision: PNG keeps edge transparency lossless, JPEG trades it for
//! bandwidth and flattens onto a white matte.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{imageops, ExtendedColorType, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};

use crate::error::PyramidError;
use crate::store::{CONTENT_TYPE_JPEG, CONTENT_TYPE_PNG};

use super::plan::PyramidPlan;

/// Default JPEG quality for lossy tiles.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Maximum width of the generated preview image.
pub const PREVIEW_MAX_WIDTH: u32 = 800;

/// JPEG quality used for the preview.
const PREVIEW_JPEG_QUALITY: u8 = 75;

/// Channel distance from the background color below which a pixel counts as
/// margin during trimming.
pub const TRIM_TOLERANCE: u8 = 10;

/// Pixels of margin kept around the detected content box.
pub const TRIM_PADDING: u32 = 20;

// =============================================================================
// Tile format policy
// =============================================================================

/// Encoding applied to extracted tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileFormat {
    /// Lossless, preserves the transparent edge padding
    Png,

    /// Lossy; alpha is flattened onto white
    Jpeg { quality: u8 },
}

impl TileFormat {
    /// File extension used in tile keys.
    pub fn ext(&self) -> &'static str {
        match self {
            TileFormat::Png => "png",
            TileFormat::Jpeg { .. } => "jpg",
        }
    }

    /// Content type for stored tiles.
    pub fn content_type(&self) -> &'static str {
        match self {
            TileFormat::Png => CONTENT_TYPE_PNG,
            TileFormat::Jpeg { .. } => CONTENT_TYPE_JPEG,
        }
    }

    /// Encode a tile image.
    pub fn encode(&self, tile: &RgbaImage) -> Result<Bytes, PyramidError> {
        let mut buf = Vec::new();
        match self {
            TileFormat::Png => {
                PngEncoder::new(&mut buf)
                    .write_image(
                        tile.as_raw(),
                        tile.width(),
                        tile.height(),
                        ExtendedColorType::Rgba8,
                    )
                    .map_err(|e| PyramidError::Encode(e.to_string()))?;
            }
            TileFormat::Jpeg { quality } => {
                let flattened = flatten_onto_white(tile);
                let mut encoder = JpegEncoder::new_with_quality(&mut buf, (*quality).clamp(1, 100));
                encoder
                    .encode_image(&flattened)
                    .map_err(|e| PyramidError::Encode(e.to_string()))?;
            }
        }
        Ok(Bytes::from(buf))
    }
}

impl std::fmt::Display for TileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.ext())
    }
}

// =============================================================================
// Tile extraction
// =============================================================================

/// Extract one tile from the raster.
///
/// The crop rectangle in raster space is the tile rectangle scaled by
/// `2^(max_zoom - zoom)`. After clamping to the raster bounds the cropped
/// region is resampled (Lanczos3) into tile space and composited onto a
/// transparent `tile_size`×`tile_size` canvas at the position the crop
/// occupied before clamping. A coordinate whose clamped crop is empty
/// yields a fully transparent tile.
///
/// # Errors
///
/// Returns [`PyramidError::TileOutOfGrid`] only when `zoom` lies outside
/// the planned range.
pub fn extract(
    raster: &RgbaImage,
    zoom: u8,
    x: u32,
    y: u32,
    plan: &PyramidPlan,
) -> Result<RgbaImage, PyramidError> {
    if zoom < plan.min_zoom || zoom > plan.max_zoom {
        return Err(PyramidError::TileOutOfGrid { zoom, x, y });
    }

    let tile_size = plan.tile_size;
    let factor = 1u64 << (plan.max_zoom - zoom);

    let src_x = x as u64 * tile_size as u64 * factor;
    let src_y = y as u64 * tile_size as u64 * factor;
    let src_span = tile_size as u64 * factor;

    let mut canvas = RgbaImage::new(tile_size, tile_size);

    // Clamp only ever trims the right/bottom edges, so the surviving crop
    // always lands at the canvas origin.
    let (width, height) = (raster.width() as u64, raster.height() as u64);
    if src_x >= width || src_y >= height {
        return Ok(canvas);
    }

    let crop_w = src_span.min(width - src_x) as u32;
    let crop_h = src_span.min(height - src_y) as u32;

    let cropped = imageops::crop_imm(raster, src_x as u32, src_y as u32, crop_w, crop_h).to_image();

    let resampled = if factor == 1 {
        cropped
    } else {
        let dst_w = (crop_w as u64).div_ceil(factor).max(1) as u32;
        let dst_h = (crop_h as u64).div_ceil(factor).max(1) as u32;
        imageops::resize(&cropped, dst_w, dst_h, FilterType::Lanczos3)
    };

    imageops::replace(&mut canvas, &resampled, 0, 0);
    Ok(canvas)
}

/// Extract and encode one tile in a single step.
pub fn extract_encoded(
    raster: &RgbaImage,
    zoom: u8,
    x: u32,
    y: u32,
    plan: &PyramidPlan,
    format: TileFormat,
) -> Result<Bytes, PyramidError> {
    let tile = extract(raster, zoom, x, y, plan)?;
    format.encode(&tile)
}

// =============================================================================
// Preview and margin trimming
// =============================================================================

/// Produce the low-resolution JPEG preview used for initial viewer load.
///
/// Downsamples to at most `max_width` pixels wide (never upscales) and
/// flattens transparency onto a white matte.
pub fn preview(raster: &RgbaImage, max_width: u32) -> Result<Bytes, PyramidError> {
    if raster.width() == 0 || raster.height() == 0 {
        return Err(PyramidError::EmptyRaster {
            width: raster.width(),
            height: raster.height(),
        });
    }

    let width = raster.width().min(max_width.max(1));
    let height = ((width as u64 * raster.height() as u64) / raster.width() as u64).max(1) as u32;

    let scaled = if width == raster.width() {
        raster.clone()
    } else {
        imageops::resize(raster, width, height, FilterType::Lanczos3)
    };
    let flattened = flatten_onto_white(&scaled);

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buf), PREVIEW_JPEG_QUALITY);
    encoder
        .encode_image(&flattened)
        .map_err(|e| PyramidError::Encode(e.to_string()))?;
    Ok(Bytes::from(buf))
}

/// Auto-crop uniform white margins around the plan content.
///
/// Scans for the bounding box of pixels that differ from white by more than
/// `tolerance` in any channel, expands it by `padding` and crops. Returns
/// the raster unchanged when no content box is found or nothing would be
/// trimmed.
pub fn trim_margins(raster: &RgbaImage, tolerance: u8, padding: u32) -> RgbaImage {
    let (width, height) = raster.dimensions();
    if width == 0 || height == 0 {
        return raster.clone();
    }

    let mut min_x = width;
    let mut min_y = height;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut found = false;

    for (x, y, pixel) in raster.enumerate_pixels() {
        if !is_background(pixel, tolerance) {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if !found {
        return raster.clone();
    }

    let left = min_x.saturating_sub(padding);
    let top = min_y.saturating_sub(padding);
    let right = (max_x + 1).saturating_add(padding).min(width);
    let bottom = (max_y + 1).saturating_add(padding).min(height);

    if left == 0 && top == 0 && right == width && bottom == height {
        return raster.clone();
    }

    imageops::crop_imm(raster, left, top, right - left, bottom - top).to_image()
}

fn is_background(pixel: &Rgba<u8>, tolerance: u8) -> bool {
    // Fully transparent pixels are margin too
    if pixel.0[3] == 0 {
        return true;
    }
    pixel.0[..3]
        .iter()
        .all(|&c| 255u8.saturating_sub(c) <= tolerance)
}

fn flatten_onto_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
        let a = a as u16;
        let blend = |c: u8| ((c as u16 * a + 255 * (255 - a)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

// =============================================================================
// Tests
// =============================================================================
