//! Zoom-level and tile-grid planning.
//!
//! A pyramid plan fixes the zoom range and, per zoom, the tile grid covering
//! the scaled image. Zoom `max_zoom` shows the raster at native resolution;
//! every step down halves both dimensions. Levels above the native zoom
//! (from the zoom boost) upscale beyond captured detail on purpose: deep
//! zoom viewers want the extra levels even though they add no new pixels.

use crate::error::PyramidError;

/// Grid geometry for a single zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomLevel {
    /// Zoom index, `min_zoom..=max_zoom`
    pub zoom: u8,

    /// Image width at this zoom, in pixels (ceiling of the exact scale)
    pub scaled_width: u32,

    /// Image height at this zoom, in pixels
    pub scaled_height: u32,

    /// Number of tile columns
    pub tiles_x: u32,

    /// Number of tile rows
    pub tiles_y: u32,
}

impl ZoomLevel {
    /// Tiles in this level's grid.
    pub fn tile_count(&self) -> u64 {
        self.tiles_x as u64 * self.tiles_y as u64
    }
}

/// The full pyramid layout for one raster.
#[derive(Debug, Clone)]
pub struct PyramidPlan {
    /// Source raster width in pixels
    pub width: u32,

    /// Source raster height in pixels
    pub height: u32,

    /// Tile edge length in pixels
    pub tile_size: u32,

    /// Lowest generated zoom
    pub min_zoom: u8,

    /// Highest generated zoom (native resolution)
    pub max_zoom: u8,

    /// Zoom at which the raster is covered at native resolution without
    /// upscaling; levels above it come from the zoom boost
    pub native_zoom: u8,

    /// Per-zoom grids, ascending by zoom
    pub levels: Vec<ZoomLevel>,
}

impl PyramidPlan {
    /// Total number of tiles across every level.
    pub fn total_tiles(&self) -> u64 {
        self.levels.iter().map(ZoomLevel::tile_count).sum()
    }

    /// Look up the grid for a zoom level.
    pub fn level(&self, zoom: u8) -> Option<&ZoomLevel> {
        if zoom < self.min_zoom || zoom > self.max_zoom {
            return None;
        }
        self.levels.get((zoom - self.min_zoom) as usize)
    }

    /// The zoom levels as a plain list, for the metadata descriptor.
    pub fn zoom_levels(&self) -> Vec<u8> {
        (self.min_zoom..=self.max_zoom).collect()
    }
}

/// Compute the pyramid plan for a raster.
///
/// `native_zoom = ceil(log2(max(width, height) / tile_size))`, clamped at
/// zero when the raster already fits a single tile. The zoom boost extends
/// the range above native resolution, capped by `max_zoom_limit`; `min_zoom`
/// is clamped into `[0, max_zoom]`.
///
/// # Errors
///
/// Returns [`PyramidError::EmptyRaster`] when either dimension is zero
/// (fatal to the job, never retried) and [`PyramidError::InvalidTileSize`]
/// for a zero tile size.
pub fn plan(
    width: u32,
    height: u32,
    tile_size: u32,
    zoom_boost: u8,
    min_zoom: u8,
    max_zoom_limit: u8,
) -> Result<PyramidPlan, PyramidError> {
    if width == 0 || height == 0 {
        return Err(PyramidError::EmptyRaster { width, height });
    }
    if tile_size == 0 {
        return Err(PyramidError::InvalidTileSize(tile_size));
    }

    let native_zoom = ceil_log2_ratio(width.max(height) as u64, tile_size as u64);
    let max_zoom = (native_zoom.saturating_add(zoom_boost)).min(max_zoom_limit);
    let min_zoom = min_zoom.min(max_zoom);

    let levels = (min_zoom..=max_zoom)
        .map(|zoom| {
            // 2^(max_zoom - zoom) is the downsample factor from native
            let factor = 1u64 << (max_zoom - zoom);
            let scaled_width = div_ceil(width as u64, factor) as u32;
            let scaled_height = div_ceil(height as u64, factor) as u32;
            ZoomLevel {
                zoom,
                scaled_width,
                scaled_height,
                tiles_x: div_ceil(scaled_width as u64, tile_size as u64) as u32,
                tiles_y: div_ceil(scaled_height as u64, tile_size as u64) as u32,
            }
        })
        .collect();

    Ok(PyramidPlan {
        width,
        height,
        tile_size,
        min_zoom,
        max_zoom,
        native_zoom,
        levels,
    })
}

/// `ceil(log2(value / divisor))` in integer arithmetic, 0 when the ratio is
/// at most 1.
fn ceil_log2_ratio(value: u64, divisor: u64) -> u8 {
    let mut zoom = 0u8;
    while (divisor << zoom) < value {
        zoom += 1;
    }
    zoom
}

fn div_ceil(value: u64, divisor: u64) -> u64 {
    value.div_ceil(divisor)
}
