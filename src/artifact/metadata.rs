//! The metadata descriptor persisted alongside every tile pyramid.
//!
//! The descriptor is an explicit, versioned schema validated both when it
//! is written and when it is read back. Viewers consume it to configure a
//! pixel-coordinate (Leaflet `L.CRS.Simple`) map: bounds and center are in
//! `[y, x]` pixel order.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MetadataError;
use crate::pyramid::{PyramidPlan, TileFormat};

/// Current descriptor schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// The durable descriptor for one floorplan artifact set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorplanMetadata {
    /// Schema version of this descriptor
    pub schema_version: u32,

    /// Caller-supplied floorplan identifier
    pub floorplan_id: String,

    /// Rendered raster width in pixels
    pub width: u32,

    /// Rendered raster height in pixels
    pub height: u32,

    /// Tile edge length in pixels
    pub tile_size: u32,

    /// Lowest generated zoom level
    pub min_zoom: u8,

    /// Highest generated zoom level
    pub max_zoom: u8,

    /// Every generated zoom level, ascending
    pub zoom_levels: Vec<u8>,

    /// Pixel-coordinate bounds, `[[0, 0], [height, width]]`
    pub bounds: [[u32; 2]; 2],

    /// Center of the plan in pixel coordinates, `[y, x]`
    pub center: [f64; 2],

    /// When the artifact set was created
    pub created_at: DateTime<Utc>,

    /// Tile file extension ("png" or "jpg")
    pub tile_format: String,

    /// Total number of tiles across all zoom levels
    pub total_tiles: u64,

    /// Effective render density in dots per inch
    pub dpi: u32,
}

impl FloorplanMetadata {
    /// Build the descriptor for a completed pyramid.
    pub fn from_plan(
        floorplan_id: impl Into<String>,
        plan: &PyramidPlan,
        tile_format: TileFormat,
        dpi: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            floorplan_id: floorplan_id.into(),
            width: plan.width,
            height: plan.height,
            tile_size: plan.tile_size,
            min_zoom: plan.min_zoom,
            max_zoom: plan.max_zoom,
            zoom_levels: plan.zoom_levels(),
            bounds: [[0, 0], [plan.height, plan.width]],
            center: [plan.height as f64 / 2.0, plan.width as f64 / 2.0],
            created_at,
            tile_format: tile_format.ext().to_string(),
            total_tiles: plan.total_tiles(),
            dpi,
        }
    }

    /// Validate schema invariants.
    ///
    /// Applied on both the write and the read path so a corrupt or
    /// hand-edited descriptor is rejected before it reaches a viewer.
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(MetadataError::UnsupportedVersion {
                found: self.schema_version,
                expected: SCHEMA_VERSION,
            });
        }

        let invalid = |reason: &str| MetadataError::Invalid {
            reason: reason.to_string(),
        };

        if self.floorplan_id.is_empty() {
            return Err(invalid("floorplan_id is empty"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(invalid("raster dimensions are zero"));
        }
        if self.tile_size == 0 {
            return Err(invalid("tile_size is zero"));
        }
        if self.min_zoom > self.max_zoom {
            return Err(invalid("min_zoom exceeds max_zoom"));
        }
        let expected_levels: Vec<u8> = (self.min_zoom..=self.max_zoom).collect();
        if self.zoom_levels != expected_levels {
            return Err(invalid("zoom_levels does not match the zoom range"));
        }
        if self.bounds != [[0, 0], [self.height, self.width]] {
            return Err(invalid("bounds do not match the raster dimensions"));
        }
        if self.total_tiles == 0 {
            return Err(invalid("total_tiles is zero"));
        }
        if self.tile_format != "png" && self.tile_format != "jpg" {
            return Err(invalid("tile_format must be png or jpg"));
        }
        Ok(())
    }

    /// Serialize to pretty JSON bytes, validating first.
    pub fn to_bytes(&self) -> Result<Bytes, MetadataError> {
        self.validate()?;
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| MetadataError::Serialize(e.to_string()))?;
        Ok(Bytes::from(json))
    }

    /// Parse and validate a stored descriptor.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MetadataError> {
        let metadata: Self = serde_json::from_slice(bytes)
            .map_err(|e| MetadataError::Deserialize(e.to_string()))?;
        metadata.validate()?;
        Ok(metadata)
    }
}
