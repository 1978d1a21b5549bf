//! # Floorplan Tiler
//!
//! A service that converts PDF floorplans into zoomable tile pyramids for
//! pixel-coordinate map viewers (Leaflet `L.CRS.Simple` and friends).
//!
//! Each conversion runs as an asynchronous job: the source PDF is fetched,
//! rendered at a quality picked from the page's physical size and content
//! class, cut into a dense tile pyramid with transparent edge padding, and
//! persisted to object storage together with a preview image, a versioned
//! metadata descriptor and the archived source.
//!
//! ## Architecture
//!
//! - [`source`] - Source fetching and PDF rasterization seams
//! - [`pyramid`] - Quality selection, zoom planning, tile extraction
//! - [`store`] - Object storage abstraction (S3 + in-memory)
//! - [`artifact`] - Metadata descriptor, artifact writer and reaper
//! - [`job`] - Job state machine and pipeline orchestration
//! - [`server`] - Axum HTTP surface
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use floorplan_tiler::{
//!     ArtifactReaper, AppState, HttpSourceFetcher, JobManager, MemoryObjectStore,
//!     MupdfRenderer, RouterConfig, TilerOptions, create_router,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(MemoryObjectStore::new());
//!     let manager = JobManager::new(
//!         store.clone(),
//!         Arc::new(HttpSourceFetcher::new()),
//!         Arc::new(MupdfRenderer::new()),
//!         TilerOptions::default(),
//!     );
//!     let reaper = ArtifactReaper::new(store);
//!
//!     let router = create_router(AppState::new(manager, reaper), RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod artifact;
pub mod config;
pub mod error;
pub mod job;
pub mod pyramid;
pub mod server;
pub mod source;
pub mod store;

// Re-export commonly used types
pub use artifact::{ArtifactReaper, ArtifactWriter, DeleteOutcome, DeleteReport, FloorplanMetadata};
pub use config::Config;
pub use error::{FetchError, JobError, MetadataError, PyramidError, RenderError, StorageError};
pub use job::{
    InMemoryJobStore, Job, JobManager, JobResult, JobStatus, JobStore, SubmitOutcome, TilerOptions,
};
pub use pyramid::{PyramidPlan, QualityProfile, TileFormat, ZoomLevel};
pub use server::{create_router, AppState, RouterConfig};
pub use source::{HttpSourceFetcher, MupdfRenderer, PageInfo, PdfRenderer, SourceFetcher};
pub use store::{
    create_s3_client, ArtifactKeys, MemoryObjectStore, ObjectStore, S3ObjectStore,
};
