//! Deterministic artifact key layout.
//!
//! Every object belonging to a floorplan lives under its id prefix. The
//! layout is fixed for viewer compatibility:
//!
//! ```text
//! {floorplan_id}/metadata.json
//! {floorplan_id}/preview.jpg
//! {floorplan_id}/{floorplan_id}.pdf
//! {floorplan_id}/tiles/{zoom}/{x}/{y}.{ext}
//! ```

use crate::error::JobError;

/// Key builder for one floorplan's artifact set.
#[derive(Debug, Clone)]
pub struct ArtifactKeys {
    floorplan_id: String,
}

impl ArtifactKeys {
    /// Create a key builder for the given floorplan id.
    pub fn new(floorplan_id: impl Into<String>) -> Self {
        Self {
            floorplan_id: floorplan_id.into(),
        }
    }

    /// The floorplan id this builder is scoped to.
    pub fn floorplan_id(&self) -> &str {
        &self.floorplan_id
    }

    /// Prefix covering every object of the artifact set, trailing slash
    /// included so `plan-2` never matches `plan-20/...`.
    pub fn prefix(&self) -> String {
        format!("{}/", self.floorplan_id)
    }

    /// Key of the metadata descriptor. Its existence is the
    /// duplicate-detection signal for the whole set.
    pub fn metadata(&self) -> String {
        format!("{}/metadata.json", self.floorplan_id)
    }

    /// Key of the preview image.
    pub fn preview(&self) -> String {
        format!("{}/preview.jpg", self.floorplan_id)
    }

    /// Key of the archived source PDF.
    pub fn source_pdf(&self) -> String {
        format!("{0}/{0}.pdf", self.floorplan_id)
    }

    /// Key of one tile.
    pub fn tile(&self, zoom: u8, x: u32, y: u32, ext: &str) -> String {
        format!("{}/tiles/{}/{}/{}.{}", self.floorplan_id, zoom, x, y, ext)
    }
}

/// Validate a caller-supplied floorplan id.
///
/// Ids become object-store path segments, so they must be non-empty and free
/// of separators or traversal sequences.
pub fn validate_floorplan_id(id: &str) -> Result<(), JobError> {
    if id.is_empty() {
        return Err(JobError::invalid("file_id must not be empty"));
    }
    if id.len() > 256 {
        return Err(JobError::invalid("file_id exceeds 256 characters"));
    }
    if id.contains('/') || id.contains('\\') {
        return Err(JobError::invalid("file_id must not contain path separators"));
    }
    if id == "." || id == ".." {
        return Err(JobError::invalid("file_id must not be a path traversal"));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' '))
    {
        return Err(JobError::invalid(
            "file_id may only contain alphanumerics, '-', '_', '.' and spaces",
        ));
    }
    Ok(())
}
