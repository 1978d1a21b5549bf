//! Artifact persistence.
//!
//! Writes tiles, the preview, the metadata descriptor and the archived
//! source PDF under the floorplan's key prefix. Each object is written
//! independently; there is no transaction across the set. A failure
//! mid-write leaves a partial set behind; the job surfaces it as `failed`
//! and the reaper can clean the orphans up.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::{JobError, StorageError};
use crate::pyramid::TileFormat;
use crate::store::{ArtifactKeys, ObjectStore, CONTENT_TYPE_JPEG, CONTENT_TYPE_JSON, CONTENT_TYPE_PDF};

use super::metadata::FloorplanMetadata;

/// Persists one floorplan's artifact set.
pub struct ArtifactWriter<S: ObjectStore> {
    store: Arc<S>,
    keys: ArtifactKeys,
    tile_format: TileFormat,
}

impl<S: ObjectStore> ArtifactWriter<S> {
    /// Create a writer scoped to one floorplan id.
    pub fn new(store: Arc<S>, floorplan_id: &str, tile_format: TileFormat) -> Self {
        Self {
            store,
            keys: ArtifactKeys::new(floorplan_id),
            tile_format,
        }
    }

    /// The key layout this writer targets.
    pub fn keys(&self) -> &ArtifactKeys {
        &self.keys
    }

    /// Persist a single encoded tile.
    pub async fn put_tile(
        &self,
        zoom: u8,
        x: u32,
        y: u32,
        data: Bytes,
    ) -> Result<(), StorageError> {
        let key = self.keys.tile(zoom, x, y, self.tile_format.ext());
        self.store
            .put_object(&key, data, self.tile_format.content_type())
            .await
    }

    /// Persist the preview image.
    pub async fn put_preview(&self, data: Bytes) -> Result<(), StorageError> {
        self.store
            .put_object(&self.keys.preview(), data, CONTENT_TYPE_JPEG)
            .await
    }

    /// Validate and persist the metadata descriptor.
    ///
    /// This is the last object written: its presence marks the artifact set
    /// complete and is the duplicate-detection signal for later
    /// submissions.
    pub async fn put_metadata(&self, metadata: &FloorplanMetadata) -> Result<(), JobError> {
        let bytes = metadata.to_bytes()?;
        self.store
            .put_object(&self.keys.metadata(), bytes, CONTENT_TYPE_JSON)
            .await?;
        Ok(())
    }

    /// Archive the original source PDF next to its tiles.
    pub async fn put_source_pdf(&self, data: Bytes) -> Result<(), StorageError> {
        self.store
            .put_object(&self.keys.source_pdf(), data, CONTENT_TYPE_PDF)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::metadata::FloorplanMetadata;
    use crate::pyramid::plan;
    use crate::store::MemoryObjectStore;
    use chrono::Utc;

    fn writer(store: Arc<MemoryObjectStore>) -> ArtifactWriter<MemoryObjectStore> {
        ArtifactWriter::new(store, "plan-1", TileFormat::Png)
    }

    #[tokio::test]
    async fn test_tile_keys_and_content_type() {
        let store = Arc::new(MemoryObjectStore::new());
        let writer = writer(store.clone());

        writer
            .put_tile(3, 2, 1, Bytes::from_static(b"tile"))
            .await
            .unwrap();

        assert!(store.object_exists("plan-1/tiles/3/2/1.png").await.unwrap());
        assert_eq!(
            store.content_type("plan-1/tiles/3/2/1.png").await.as_deref(),
            Some("image/png")
        );
    }

    #[tokio::test]
    async fn test_jpeg_writer_uses_jpg_extension() {
        let store = Arc::new(MemoryObjectStore::new());
        let writer =
            ArtifactWriter::new(store.clone(), "plan-1", TileFormat::Jpeg { quality: 85 });

        writer
            .put_tile(0, 0, 0, Bytes::from_static(b"tile"))
            .await
            .unwrap();

        assert!(store.object_exists("plan-1/tiles/0/0/0.jpg").await.unwrap());
        assert_eq!(
            store.content_type("plan-1/tiles/0/0/0.jpg").await.as_deref(),
            Some("image/jpeg")
        );
    }

    #[tokio::test]
    async fn test_metadata_preview_and_source_layout() {
        let store = Arc::new(MemoryObjectStore::new());
        let writer = writer(store.clone());

        let plan = plan(2048, 1024, 512, 0, 0, 12).unwrap();
        let metadata =
            FloorplanMetadata::from_plan("plan-1", &plan, TileFormat::Png, 288, Utc::now());

        writer.put_metadata(&metadata).await.unwrap();
        writer.put_preview(Bytes::from_static(b"jpeg")).await.unwrap();
        writer
            .put_source_pdf(Bytes::from_static(b"%PDF-1.7"))
            .await
            .unwrap();

        assert!(store.object_exists("plan-1/metadata.json").await.unwrap());
        assert!(store.object_exists("plan-1/preview.jpg").await.unwrap());
        assert!(store.object_exists("plan-1/plan-1.pdf").await.unwrap());
        assert_eq!(
            store.content_type("plan-1/plan-1.pdf").await.as_deref(),
            Some("application/pdf")
        );

        // The stored descriptor reads back validated
        let raw = store.get_object("plan-1/metadata.json").await.unwrap();
        let parsed = FloorplanMetadata::from_bytes(&raw).unwrap();
        assert_eq!(parsed, metadata);
    }

    #[tokio::test]
    async fn test_invalid_metadata_is_not_written() {
        let store = Arc::new(MemoryObjectStore::new());
        let writer = writer(store.clone());

        let plan = plan(2048, 1024, 512, 0, 0, 12).unwrap();
        let mut metadata =
            FloorplanMetadata::from_plan("plan-1", &plan, TileFormat::Png, 288, Utc::now());
        metadata.total_tiles = 0;

        assert!(writer.put_metadata(&metadata).await.is_err());
        assert!(!store.object_exists("plan-1/metadata.json").await.unwrap());
    }
}
