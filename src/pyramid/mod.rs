//! Tile pyramid generation: quality selection, zoom planning and tile
//! extraction.
//!
//! The pipeline derives a [`QualityProfile`] from the source page, renders
//! the raster at that scale, computes a [`PyramidPlan`] and extracts one
//! encoded tile per grid coordinate, level by level.

pub mod extract;
pub mod plan;
pub mod quality;

pub use extract::{
    extract, extract_encoded, preview, trim_margins, TileFormat, DEFAULT_JPEG_QUALITY,
    PREVIEW_MAX_WIDTH, TRIM_PADDING, TRIM_TOLERANCE,
};
pub use plan::{plan, PyramidPlan, ZoomLevel};
pub use quality::{select, QualityProfile, LARGE_VECTOR_BYTES, MAX_PIXEL_AREA, POINTS_PER_INCH};
