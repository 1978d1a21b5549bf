//! Object storage abstraction.
//!
//! The tiler treats its storage medium as a flat key-value byte store with
//! list/delete-by-prefix support. This trait is the seam between the pipeline
//! and the backend: S3 in production ([`S3ObjectStore`]), an in-memory map in
//! tests and local development ([`MemoryObjectStore`]).

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageError;

mod keys;
mod memory;
mod s3;

pub use keys::{validate_floorplan_id, ArtifactKeys};
pub use memory::MemoryObjectStore;
pub use s3::{create_s3_client, S3ObjectStore};

/// A flat key-value byte store.
///
/// Keys are `/`-separated paths. Writes overwrite silently (last writer
/// wins); there is no conditional-put primitive, which is why duplicate
/// detection upstream is probe-then-write with an accepted narrow race.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store an object under `key` with the given content type.
    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Fetch an object's bytes.
    ///
    /// Returns [`StorageError::NotFound`] if the key does not exist.
    async fn get_object(&self, key: &str) -> Result<Bytes, StorageError>;

    /// List all keys under a prefix. An absent prefix yields an empty list,
    /// not an error.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Delete a single object. Deleting an absent key is not an error.
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;

    /// Check whether an object exists without fetching its bytes.
    async fn object_exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// Content type for JSON metadata objects.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Content type for PNG tiles.
pub const CONTENT_TYPE_PNG: &str = "image/png";

/// Content type for JPEG tiles and previews.
pub const CONTENT_TYPE_JPEG: &str = "image/jpeg";

/// Content type for the archived source document.
pub const CONTENT_TYPE_PDF: &str = "application/pdf";
