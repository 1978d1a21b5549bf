use thiserror::Error;

/// Errors from the object storage backend.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Object not found
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Errors while retrieving the source document.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The source URL could not be parsed
    #[error("Invalid source URL: {0}")]
    InvalidUrl(String),

    /// The request failed before a response was received
    #[error("Request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status
    #[error("Source fetch returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },
}

/// Errors while decoding the source PDF into a raster.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// The byte stream is not a readable PDF
    #[error("Failed to open PDF: {0}")]
    Open(String),

    /// The document contains no pages
    #[error("PDF contains no pages")]
    EmptyDocument,

    /// Rasterization failed
    #[error("Failed to render PDF page: {0}")]
    Render(String),
}

/// Errors from pyramid planning and tile extraction.
#[derive(Debug, Clone, Error)]
pub enum PyramidError {
    /// Degenerate raster dimensions (fatal, not retried)
    #[error("Cannot build a pyramid from a {width}x{height} raster")]
    EmptyRaster { width: u32, height: u32 },

    /// Tile size must be non-zero
    #[error("Invalid tile size: {0}")]
    InvalidTileSize(u32),

    /// Requested tile lies outside the planned grid
    #[error("Tile ({x}, {y}) at zoom {zoom} is outside the planned grid")]
    TileOutOfGrid { zoom: u8, x: u32, y: u32 },

    /// Tile or preview encoding failed
    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// Errors around the metadata descriptor.
#[derive(Debug, Clone, Error)]
pub enum MetadataError {
    /// Serialization to JSON failed
    #[error("Failed to serialize metadata: {0}")]
    Serialize(String),

    /// The stored descriptor is not valid JSON
    #[error("Failed to parse metadata: {0}")]
    Deserialize(String),

    /// The descriptor violates the schema
    #[error("Invalid metadata: {reason}")]
    Invalid { reason: String },

    /// The descriptor was written by an incompatible schema version
    #[error("Unsupported metadata schema version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Errors surfaced by the job manager.
///
/// `InvalidRequest` and `NotFound` map to client-visible responses; the
/// remaining variants are fatal to an individual job and recorded on its
/// `failed` status, never propagated as a service failure.
#[derive(Debug, Clone, Error)]
pub enum JobError {
    /// Bad submission input, rejected before a job is created
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Unknown job id on a status lookup
    #[error("Job not found: {job_id}")]
    NotFound { job_id: String },

    /// Source retrieval failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// PDF decoding failed
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Pyramid planning or tile extraction failed
    #[error(transparent)]
    Pyramid(#[from] PyramidError),

    /// Artifact persistence failed; already-written tiles are orphaned
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The metadata descriptor could not be produced or read back
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl JobError {
    /// Shorthand for a validation failure.
    pub fn invalid(reason: impl Into<String>) -> Self {
        JobError::InvalidRequest {
            reason: reason.into(),
        }
    }
}
