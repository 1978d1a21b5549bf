//! Configuration management for the floorplan tiler.
//!
//! Supports command-line arguments via clap, environment variables with a
//! `TILER_` prefix, and sensible defaults for everything optional.
//!
//! # Environment Variables
//!
//! - `TILER_HOST` - Server bind address (default: 0.0.0.0)
//! - `TILER_PORT` - Server port (default: 8000)
//! - `TILER_S3_BUCKET` - S3 bucket for artifact storage (required)
//! - `TILER_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `TILER_S3_REGION` - AWS region (default: us-east-1)
//! - `TILER_TILE_SIZE` - Tile edge length (default: 512)
//! - `TILER_ZOOM_BOOST` - Extra zoom levels beyond native (default: 3)
//! - `TILER_MIN_ZOOM` - Lowest generated zoom (default: 0)
//! - `TILER_MAX_ZOOM_LIMIT` - Cap on the highest zoom (default: 12)
//! - `TILER_TILE_FORMAT` - png or jpeg (default: png)
//! - `TILER_JPEG_QUALITY` - Quality for jpeg tiles (default: 85)
//! - `TILER_MAX_JOBS` - Concurrent conversion ceiling (default: 2)

use clap::{Parser, ValueEnum};

use crate::job::manager::{
    DEFAULT_MAX_CONCURRENT_JOBS, DEFAULT_MAX_ZOOM_LIMIT, DEFAULT_TILE_SIZE, DEFAULT_ZOOM_BOOST,
};
use crate::job::TilerOptions;
use crate::pyramid::{TileFormat, DEFAULT_JPEG_QUALITY, PREVIEW_MAX_WIDTH};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Tile sizes the pipeline accepts.
pub const SUPPORTED_TILE_SIZES: &[u32] = &[128, 256, 512, 1024];

// =============================================================================
// CLI Arguments
// =============================================================================

/// Tile encoding selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TileFormatArg {
    /// Lossless tiles with transparent edge padding
    Png,
    /// Lossy tiles, flattened onto white
    Jpeg,
}

/// Floorplan Tiler - converts PDF floorplans into zoomable tile pyramids.
///
/// Fetches a source PDF, renders it at a quality picked from the page's
/// physical size and content, cuts a Leaflet-style tile pyramid and stores
/// it in S3 or S3-compatible storage.
#[derive(Parser, Debug, Clone)]
#[command(name = "floorplan-tiler")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "TILER_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "TILER_PORT")]
    pub port: u16,

    // =========================================================================
    // S3 Configuration
    // =========================================================================
    /// S3 bucket that receives the tile pyramids.
    #[arg(long, env = "TILER_S3_BUCKET")]
    pub s3_bucket: String,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "TILER_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "TILER_S3_REGION")]
    pub s3_region: String,

    // =========================================================================
    // Tiling Configuration
    // =========================================================================
    /// Tile edge length in pixels (128, 256, 512 or 1024).
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "TILER_TILE_SIZE")]
    pub tile_size: u32,

    /// Extra zoom levels beyond native resolution, for deep zoom.
    #[arg(long, default_value_t = DEFAULT_ZOOM_BOOST, env = "TILER_ZOOM_BOOST")]
    pub zoom_boost: u8,

    /// Lowest zoom level to generate.
    #[arg(long, default_value_t = 0, env = "TILER_MIN_ZOOM")]
    pub min_zoom: u8,

    /// Hard cap on the highest zoom level.
    #[arg(long, default_value_t = DEFAULT_MAX_ZOOM_LIMIT, env = "TILER_MAX_ZOOM_LIMIT")]
    pub max_zoom_limit: u8,

    /// Tile encoding format.
    #[arg(long, value_enum, default_value_t = TileFormatArg::Png, env = "TILER_TILE_FORMAT")]
    pub tile_format: TileFormatArg,

    /// JPEG quality for jpeg tiles (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "TILER_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Auto-crop uniform white margins before tiling.
    #[arg(long, default_value_t = true, env = "TILER_TRIM_MARGINS")]
    pub trim_margins: bool,

    /// Maximum preview image width in pixels.
    #[arg(long, default_value_t = PREVIEW_MAX_WIDTH, env = "TILER_PREVIEW_MAX_WIDTH")]
    pub preview_max_width: u32,

    // =========================================================================
    // Concurrency Configuration
    // =========================================================================
    /// Maximum number of concurrently processing jobs. Each active job
    /// holds a full-resolution raster in memory.
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_JOBS, env = "TILER_MAX_JOBS")]
    pub max_jobs: usize,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated). Unset allows any origin.
    #[arg(long, env = "TILER_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.s3_bucket.is_empty() {
            return Err("S3 bucket name is required. Set --s3-bucket or TILER_S3_BUCKET".to_string());
        }

        if !SUPPORTED_TILE_SIZES.contains(&self.tile_size) {
            return Err(format!(
                "tile_size must be one of {:?}, got {}",
                SUPPORTED_TILE_SIZES, self.tile_size
            ));
        }

        if self.min_zoom > self.max_zoom_limit {
            return Err(format!(
                "min_zoom ({}) must not exceed max_zoom_limit ({})",
                self.min_zoom, self.max_zoom_limit
            ));
        }

        if self.max_zoom_limit > 20 {
            return Err("max_zoom_limit must be at most 20".to_string());
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        if self.max_jobs == 0 {
            return Err("max_jobs must be greater than 0".to_string());
        }

        if self.preview_max_width == 0 {
            return Err("preview_max_width must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The tile format the pipeline should encode with.
    pub fn tile_format(&self) -> TileFormat {
        match self.tile_format {
            TileFormatArg::Png => TileFormat::Png,
            TileFormatArg::Jpeg => TileFormat::Jpeg {
                quality: self.jpeg_quality,
            },
        }
    }

    /// Assemble the tiling options handed to the job manager.
    pub fn tiler_options(&self) -> TilerOptions {
        TilerOptions {
            tile_size: self.tile_size,
            zoom_boost: self.zoom_boost,
            min_zoom: self.min_zoom,
            max_zoom_limit: self.max_zoom_limit,
            tile_format: self.tile_format(),
            trim_margins: self.trim_margins,
            preview_max_width: self.preview_max_width,
            max_concurrent_jobs: self.max_jobs,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
