//! Job orchestration.
//!
//! The manager owns the state machine for conversion requests: it validates
//! submissions, short-circuits duplicates against the artifact store, and
//! runs each accepted job on its own worker task through the
//! fetch → probe → render → plan → tile → persist pipeline.
//!
//! Concurrency is bounded by a semaphore sized from configuration; each
//! active job holds a full-resolution raster (tens to hundreds of
//! megabytes), which is dropped as soon as its pipeline returns. No step
//! carries a timeout or cancellation token; a stuck fetch blocks its
//! worker until the process ends.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use image::RgbaImage;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::artifact::{ArtifactWriter, FloorplanMetadata};
use crate::error::{JobError, PyramidError, StorageError};
use crate::pyramid::{
    self, extract_encoded, preview, trim_margins, PyramidPlan, TileFormat, ZoomLevel,
    PREVIEW_MAX_WIDTH, TRIM_PADDING, TRIM_TOLERANCE,
};
use crate::source::{parse_source_url, PdfRenderer, SourceFetcher};
use crate::store::{validate_floorplan_id, ArtifactKeys, ObjectStore};

use super::store::{InMemoryJobStore, JobStore, JobUpdate};
use super::{Job, JobResult, JobStatus};

// =============================================================================
// Options
// =============================================================================

/// Default tile edge length.
pub const DEFAULT_TILE_SIZE: u32 = 512;

/// Default extra zoom levels above native resolution.
pub const DEFAULT_ZOOM_BOOST: u8 = 3;

/// Default cap on the highest zoom level.
pub const DEFAULT_MAX_ZOOM_LIMIT: u8 = 12;

/// Default number of concurrently processing jobs.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 2;

/// Tiling policy shared by every job of one manager.
#[derive(Debug, Clone, Copy)]
pub struct TilerOptions {
    /// Tile edge length in pixels
    pub tile_size: u32,

    /// Extra zoom levels above native resolution (deep zoom)
    pub zoom_boost: u8,

    /// Lowest zoom level to generate
    pub min_zoom: u8,

    /// Hard cap on the highest zoom level
    pub max_zoom_limit: u8,

    /// Tile encoding policy
    pub tile_format: TileFormat,

    /// Auto-crop uniform white margins before tiling
    pub trim_margins: bool,

    /// Maximum preview width in pixels
    pub preview_max_width: u32,

    /// Concurrency ceiling for processing jobs
    pub max_concurrent_jobs: usize,
}

impl Default for TilerOptions {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            zoom_boost: DEFAULT_ZOOM_BOOST,
            min_zoom: 0,
            max_zoom_limit: DEFAULT_MAX_ZOOM_LIMIT,
            tile_format: TileFormat::Png,
            trim_margins: true,
            preview_max_width: PREVIEW_MAX_WIDTH,
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
        }
    }
}

// =============================================================================
// Submission outcome
// =============================================================================

/// Result of a submission.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// A new job was created and queued
    Accepted { job_id: String },

    /// An artifact set already exists for this file id; no job was created
    /// and the source was not touched
    Duplicate(FloorplanMetadata),
}

// =============================================================================
// Job manager
// =============================================================================

/// Everything a worker task needs, cloned per job.
struct PipelineContext<S: ObjectStore> {
    store: Arc<S>,
    jobs: Arc<dyn JobStore>,
    fetcher: Arc<dyn SourceFetcher>,
    renderer: Arc<dyn PdfRenderer>,
    options: TilerOptions,
}

impl<S: ObjectStore> Clone for PipelineContext<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            jobs: Arc::clone(&self.jobs),
            fetcher: Arc::clone(&self.fetcher),
            renderer: Arc::clone(&self.renderer),
            options: self.options,
        }
    }
}

/// Owns the conversion-job state machine.
pub struct JobManager<S: ObjectStore + 'static> {
    ctx: PipelineContext<S>,
    permits: Arc<Semaphore>,
}

impl<S: ObjectStore + 'static> JobManager<S> {
    /// Create a manager with a process-local in-memory job store.
    pub fn new(
        store: Arc<S>,
        fetcher: Arc<dyn SourceFetcher>,
        renderer: Arc<dyn PdfRenderer>,
        options: TilerOptions,
    ) -> Self {
        Self::with_job_store(
            store,
            Arc::new(InMemoryJobStore::new()),
            fetcher,
            renderer,
            options,
        )
    }

    /// Create a manager over an explicit job store implementation.
    pub fn with_job_store(
        store: Arc<S>,
        jobs: Arc<dyn JobStore>,
        fetcher: Arc<dyn SourceFetcher>,
        renderer: Arc<dyn PdfRenderer>,
        options: TilerOptions,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(options.max_concurrent_jobs.max(1)));
        Self {
            ctx: PipelineContext {
                store,
                jobs,
                fetcher,
                renderer,
                options,
            },
            permits,
        }
    }

    /// The tiling options this manager applies to every job.
    pub fn options(&self) -> &TilerOptions {
        &self.ctx.options
    }

    /// Submit a conversion request.
    ///
    /// Validates the inputs, performs the duplicate probe against the
    /// artifact store (exactly once, before admission), and either returns
    /// the existing descriptor or spawns a worker for a freshly queued job.
    ///
    /// # Errors
    ///
    /// [`JobError::InvalidRequest`] for malformed inputs; these never
    /// enter the state machine. Storage errors from the duplicate probe
    /// propagate as-is.
    pub async fn submit(&self, file_url: &str, file_id: &str) -> Result<SubmitOutcome, JobError> {
        validate_floorplan_id(file_id)?;
        let url = parse_source_url(file_url).map_err(|e| JobError::invalid(e.to_string()))?;

        // One existence probe per submission. Two submissions racing past
        // this point can both run; deterministic keys make the duplicate
        // writes converge, so the race is accepted rather than locked out.
        let keys = ArtifactKeys::new(file_id);
        match self.ctx.store.get_object(&keys.metadata()).await {
            Ok(raw) => {
                let metadata = FloorplanMetadata::from_bytes(&raw)?;
                info!(file_id, "duplicate submission, returning existing artifact set");
                return Ok(SubmitOutcome::Duplicate(metadata));
            }
            Err(StorageError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let job_id = Uuid::new_v4().to_string();
        self.ctx.jobs.insert(Job::new(&job_id)).await;
        info!(%job_id, file_id, file_url, "job accepted");

        self.spawn_worker(job_id.clone(), url, file_id.to_string());

        Ok(SubmitOutcome::Accepted { job_id })
    }

    /// Snapshot a job's current record.
    ///
    /// Reads only the manager's own store; status is never reconstructed
    /// from artifact storage, so records lost to a restart stay unknown.
    pub async fn status(&self, job_id: &str) -> Result<Job, JobError> {
        self.ctx
            .jobs
            .get(job_id)
            .await
            .ok_or_else(|| JobError::NotFound {
                job_id: job_id.to_string(),
            })
    }

    fn spawn_worker(&self, job_id: String, url: Url, file_id: String) {
        let ctx = self.ctx.clone();
        let permits = Arc::clone(&self.permits);

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!(%job_id, "worker pool closed before job started");
                    ctx.jobs
                        .apply(
                            &job_id,
                            JobUpdate::status(JobStatus::Failed)
                                .with_message("Worker pool shut down"),
                        )
                        .await;
                    return;
                }
            };

            ctx.jobs
                .apply(
                    &job_id,
                    JobUpdate::status(JobStatus::Processing).with_message("Processing started"),
                )
                .await;

            match run_pipeline(&ctx, &job_id, &url, &file_id).await {
                Ok(result) => {
                    info!(
                        %job_id,
                        %file_id,
                        total_tiles = result.total_tiles,
                        max_zoom = result.max_zoom,
                        "job completed"
                    );
                    ctx.jobs
                        .apply(
                            &job_id,
                            JobUpdate::status(JobStatus::Completed)
                                .with_progress(100)
                                .with_message("Processing completed successfully")
                                .with_result(result),
                        )
                        .await;
                }
                Err(e) => {
                    // Tiles already written by this run stay behind; the
                    // reaper can clean them up under the file id prefix.
                    error!(%job_id, %file_id, error = %e, "job failed");
                    ctx.jobs
                        .apply(
                            &job_id,
                            JobUpdate::status(JobStatus::Failed).with_message(e.to_string()),
                        )
                        .await;
                }
            }
        });
    }
}

// =============================================================================
// Pipeline
// =============================================================================

async fn report(jobs: &Arc<dyn JobStore>, job_id: &str, progress: u8, message: String) {
    jobs.apply(job_id, JobUpdate::progress(progress, message)).await;
}

/// Run one conversion from source URL to persisted artifact set.
///
/// Progress milestones follow the level loop: 0-30 covers fetch, render and
/// planning, 30-85 the tile levels (proportional to tiles written, ascending
/// zoom so progress is monotonic), the remainder preview, metadata and
/// source archival.
async fn run_pipeline<S: ObjectStore>(
    ctx: &PipelineContext<S>,
    job_id: &str,
    url: &Url,
    file_id: &str,
) -> Result<JobResult, JobError> {
    let options = ctx.options;

    report(&ctx.jobs, job_id, 5, "Downloading source PDF".to_string()).await;
    let pdf = ctx.fetcher.fetch(url).await?;
    report(
        &ctx.jobs,
        job_id,
        10,
        format!("Downloaded {} bytes, probing page", pdf.len()),
    )
    .await;

    let info = ctx.renderer.probe(pdf.clone()).await?;
    let profile = pyramid::select(
        info.width_in,
        info.height_in,
        info.has_text_layer,
        pdf.len() as u64,
    );
    if info.page_count > 1 {
        warn!(
            job_id,
            pages = info.page_count,
            "multi-page document, tiling first page only"
        );
    }
    report(
        &ctx.jobs,
        job_id,
        15,
        format!("Rendering at {} dpi", profile.effective_dpi),
    )
    .await;

    let mut raster = ctx.renderer.render(pdf.clone(), profile.scale_factor).await?;
    report(
        &ctx.jobs,
        job_id,
        20,
        format!("Rendered {}x{} raster", raster.width(), raster.height()),
    )
    .await;

    if options.trim_margins {
        raster = run_blocking(move || trim_margins(&raster, TRIM_TOLERANCE, TRIM_PADDING)).await?;
        report(
            &ctx.jobs,
            job_id,
            25,
            format!("Trimmed margins to {}x{}", raster.width(), raster.height()),
        )
        .await;
    }

    let plan = pyramid::plan(
        raster.width(),
        raster.height(),
        options.tile_size,
        options.zoom_boost,
        options.min_zoom,
        options.max_zoom_limit,
    )?;
    let total_tiles = plan.total_tiles();
    report(
        &ctx.jobs,
        job_id,
        30,
        format!(
            "Generating {} zoom levels ({}-{}), {} tiles",
            plan.levels.len(),
            plan.min_zoom,
            plan.max_zoom,
            total_tiles
        ),
    )
    .await;

    let writer = ArtifactWriter::new(Arc::clone(&ctx.store), file_id, options.tile_format);

    // The raster is shared read-only with the per-level encode tasks and
    // dropped with this scope once the pyramid is done.
    let raster = Arc::new(raster);
    let mut tiles_done = 0u64;

    for level in &plan.levels {
        let encoded = encode_level(
            Arc::clone(&raster),
            plan.clone(),
            *level,
            options.tile_format,
        )
        .await?;

        for (x, y, data) in encoded {
            writer.put_tile(level.zoom, x, y, data).await?;
        }

        tiles_done += level.tile_count();
        let progress = 30 + ((tiles_done * 55) / total_tiles.max(1)) as u8;
        report(
            &ctx.jobs,
            job_id,
            progress,
            format!(
                "Zoom level {} complete ({}/{} tiles)",
                level.zoom, tiles_done, total_tiles
            ),
        )
        .await;
    }

    report(&ctx.jobs, job_id, 90, "Generating preview image".to_string()).await;
    let preview_raster = Arc::clone(&raster);
    let preview_width = options.preview_max_width;
    let preview_jpeg = run_blocking(move || preview(&preview_raster, preview_width)).await??;
    writer.put_preview(preview_jpeg).await?;

    let metadata = FloorplanMetadata::from_plan(
        file_id,
        &plan,
        options.tile_format,
        profile.effective_dpi,
        Utc::now(),
    );
    writer.put_metadata(&metadata).await?;

    report(&ctx.jobs, job_id, 95, "Archiving source PDF".to_string()).await;
    writer.put_source_pdf(pdf).await?;

    Ok(JobResult {
        floorplan_id: file_id.to_string(),
        width: plan.width,
        height: plan.height,
        tile_size: plan.tile_size,
        min_zoom: plan.min_zoom,
        max_zoom: plan.max_zoom,
        total_tiles,
        dpi: profile.effective_dpi,
    })
}

/// Extract and encode every tile of one zoom level on a blocking thread.
///
/// Tiles of a level share nothing but the read-only raster, so the whole
/// level is handed to one blocking task to keep the async workers free.
async fn encode_level(
    raster: Arc<RgbaImage>,
    plan: PyramidPlan,
    level: ZoomLevel,
    format: TileFormat,
) -> Result<Vec<(u32, u32, Bytes)>, PyramidError> {
    run_blocking(move || {
        let mut tiles = Vec::with_capacity(level.tile_count() as usize);
        for y in 0..level.tiles_y {
            for x in 0..level.tiles_x {
                let data = extract_encoded(&raster, level.zoom, x, y, &plan, format)?;
                tiles.push((x, y, data));
            }
        }
        Ok(tiles)
    })
    .await?
}

async fn run_blocking<T, F>(f: F) -> Result<T, PyramidError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PyramidError::Encode(format!("blocking task panicked: {e}")))
}

// =============================================================================
// Tests
// =============================================================================
