//! End-to-end pipeline tests against the in-memory object store.
//!
//! These drive the public surface the way a deployment would: submit a
//! conversion, poll it to completion, inspect the persisted artifact set,
//! exercise duplicate short-circuiting and deletion, and poke the HTTP
//! router.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use bytes::Bytes;
use http_body_util::BodyExt;
use image::{Rgba, RgbaImage};
use tower::ServiceExt;
use url::Url;

use floorplan_tiler::{
    create_router, AppState, ArtifactReaper, FetchError, FloorplanMetadata, Job, JobManager,
    JobStatus, MemoryObjectStore, PageInfo, PdfRenderer, RenderError, RouterConfig, SourceFetcher,
    SubmitOutcome, TileFormat, TilerOptions,
};

const PDF_PAYLOAD: &[u8] = b"%PDF-1.7 stub floorplan";

/// Fetcher returning a fixed payload, counting calls.
struct CountingFetcher {
    calls: AtomicUsize,
}

impl CountingFetcher {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceFetcher for CountingFetcher {
    async fn fetch(&self, _url: &Url) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::from_static(PDF_PAYLOAD))
    }
}

/// Renderer producing a bordered test raster, counting calls.
struct StubRenderer {
    width: u32,
    height: u32,
    renders: AtomicUsize,
}

impl StubRenderer {
    fn new(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            width,
            height,
            renders: AtomicUsize::new(0),
        })
    }

    fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PdfRenderer for StubRenderer {
    async fn probe(&self, _pdf: Bytes) -> Result<PageInfo, RenderError> {
        Ok(PageInfo {
            width_in: 30.0,
            height_in: 20.0,
            page_count: 1,
            has_text_layer: true,
        })
    }

    async fn render(&self, _pdf: Bytes, _scale: f32) -> Result<RgbaImage, RenderError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        let mut raster = RgbaImage::from_pixel(self.width, self.height, Rgba([250, 250, 250, 255]));
        // Dark frame so the content reaches every edge and trimming is a no-op
        for x in 0..self.width {
            raster.put_pixel(x, 0, Rgba([20, 20, 20, 255]));
            raster.put_pixel(x, self.height - 1, Rgba([20, 20, 20, 255]));
        }
        for y in 0..self.height {
            raster.put_pixel(0, y, Rgba([20, 20, 20, 255]));
            raster.put_pixel(self.width - 1, y, Rgba([20, 20, 20, 255]));
        }
        Ok(raster)
    }
}

fn options() -> TilerOptions {
    TilerOptions {
        tile_size: 256,
        zoom_boost: 1,
        min_zoom: 0,
        max_zoom_limit: 12,
        tile_format: TileFormat::Png,
        trim_margins: true,
        preview_max_width: 200,
        max_concurrent_jobs: 2,
    }
}

struct Harness {
    store: Arc<MemoryObjectStore>,
    fetcher: Arc<CountingFetcher>,
    renderer: Arc<StubRenderer>,
    manager: Arc<JobManager<MemoryObjectStore>>,
    reaper: Arc<ArtifactReaper<MemoryObjectStore>>,
}

fn harness(raster_width: u32, raster_height: u32) -> Harness {
    let store = Arc::new(MemoryObjectStore::new());
    let fetcher = CountingFetcher::new();
    let renderer = StubRenderer::new(raster_width, raster_height);
    let manager = Arc::new(JobManager::new(
        store.clone(),
        fetcher.clone(),
        renderer.clone(),
        options(),
    ));
    let reaper = Arc::new(ArtifactReaper::new(store.clone()));
    Harness {
        store,
        fetcher,
        renderer,
        manager,
        reaper,
    }
}

async fn submit_and_wait(harness: &Harness, url: &str, file_id: &str) -> Job {
    let outcome = harness.manager.submit(url, file_id).await.unwrap();
    let SubmitOutcome::Accepted { job_id } = outcome else {
        panic!("expected a fresh job for {file_id}");
    };
    wait_terminal(&harness.manager, &job_id).await
}

async fn wait_terminal(manager: &JobManager<MemoryObjectStore>, job_id: &str) -> Job {
    for _ in 0..1000 {
        let job = manager.status(job_id).await.unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {job_id} never reached a terminal state");
}

// =============================================================================
// Pipeline
// =============================================================================

#[tokio::test]
async fn test_conversion_produces_complete_artifact_set() {
    let harness = harness(1100, 800);
    let job = submit_and_wait(&harness, "https://example.com/plan.pdf", "plan-1").await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    let result = job.result.expect("completed job carries a result");
    assert_eq!(result.floorplan_id, "plan-1");
    assert_eq!((result.width, result.height), (1100, 800));

    // Fixed key layout
    let store = &harness.store;
    assert!(store.object_exists("plan-1/metadata.json").await.unwrap());
    assert!(store.object_exists("plan-1/preview.jpg").await.unwrap());
    assert!(store.object_exists("plan-1/plan-1.pdf").await.unwrap());

    // The stored descriptor validates and agrees with the actual tiles
    let raw = store.get_object("plan-1/metadata.json").await.unwrap();
    let metadata = FloorplanMetadata::from_bytes(&raw).unwrap();
    assert_eq!(metadata.floorplan_id, "plan-1");
    assert_eq!(metadata.bounds, [[0, 0], [800, 1100]]);
    assert_eq!(metadata.tile_format, "png");

    let tiles = store.list_objects("plan-1/tiles/").await.unwrap();
    assert_eq!(tiles.len() as u64, metadata.total_tiles);
    assert_eq!(metadata.total_tiles, result.total_tiles);

    // Max-zoom grid covers the raster: ceil(1100/256) x ceil(800/256)
    let max_zoom_tiles = store
        .list_objects(&format!("plan-1/tiles/{}/", metadata.max_zoom))
        .await
        .unwrap();
    assert_eq!(max_zoom_tiles.len(), 5 * 4);

    // The archived source is byte-identical to what was fetched
    let pdf = store.get_object("plan-1/plan-1.pdf").await.unwrap();
    assert_eq!(&pdf[..], PDF_PAYLOAD);
}

#[tokio::test]
async fn test_every_planned_tile_is_dense_and_decodable() {
    let harness = harness(600, 600);
    let job = submit_and_wait(&harness, "https://example.com/plan.pdf", "plan-d").await;
    let result = job.result.unwrap();

    let tiles = harness.store.list_objects("plan-d/tiles/").await.unwrap();
    assert_eq!(tiles.len() as u64, result.total_tiles);

    for key in tiles {
        let data = harness.store.get_object(&key).await.unwrap();
        let decoded = image::load_from_memory(&data).unwrap();
        // Every tile, edge tiles included, has the exact tile size
        assert_eq!((decoded.width(), decoded.height()), (256, 256));
    }
}

#[tokio::test]
async fn test_progress_is_monotonic() {
    let harness = harness(1100, 800);
    let SubmitOutcome::Accepted { job_id } = harness
        .manager
        .submit("https://example.com/plan.pdf", "plan-p")
        .await
        .unwrap()
    else {
        panic!("expected acceptance");
    };

    let mut observed = Vec::new();
    loop {
        let job = harness.manager.status(&job_id).await.unwrap();
        observed.push(job.progress);
        if job.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    assert!(observed.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*observed.last().unwrap(), 100);
}

#[tokio::test]
async fn test_duplicate_submission_skips_fetch_and_render() {
    let harness = harness(600, 400);
    submit_and_wait(&harness, "https://example.com/plan.pdf", "plan-dup").await;

    assert_eq!(harness.fetcher.calls(), 1);
    assert_eq!(harness.renderer.renders(), 1);

    let outcome = harness
        .manager
        .submit("https://example.com/plan.pdf", "plan-dup")
        .await
        .unwrap();

    let SubmitOutcome::Duplicate(metadata) = outcome else {
        panic!("expected the duplicate short-circuit");
    };
    assert_eq!(metadata.floorplan_id, "plan-dup");

    // The source was not re-read, the raster not re-rendered
    assert_eq!(harness.fetcher.calls(), 1);
    assert_eq!(harness.renderer.renders(), 1);
}

#[tokio::test]
async fn test_failed_persistence_leaves_cleanable_orphans() {
    let harness = harness(1100, 800);

    // The max-zoom level is written last (ascending order); poisoning it
    // fails the job after the lower levels already landed.
    harness.store.poison_puts("plan-f/tiles/4/").await;

    let SubmitOutcome::Accepted { job_id } = harness
        .manager
        .submit("https://example.com/plan.pdf", "plan-f")
        .await
        .unwrap()
    else {
        panic!("expected acceptance");
    };

    let job = wait_terminal(&harness.manager, &job_id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result.is_none());

    // No rollback: earlier levels remain as orphans, no metadata was written
    let orphans = harness.store.list_objects("plan-f/").await.unwrap();
    assert!(!orphans.is_empty());
    assert!(!harness
        .store
        .object_exists("plan-f/metadata.json")
        .await
        .unwrap());

    // A resubmission is not short-circuited (no metadata), and the orphans
    // are cleanable through the reaper
    let outcome = harness
        .manager
        .submit("https://example.com/plan.pdf", "plan-f")
        .await
        .unwrap();
    let SubmitOutcome::Accepted { job_id: rerun_id } = outcome else {
        panic!("expected the failed run to be retryable");
    };
    // Let the rerun fail too before reaping, so no writer races the delete
    wait_terminal(&harness.manager, &rerun_id).await;

    let cleanup = harness.reaper.delete_one("plan-f").await;
    assert!(cleanup.success);
    assert!(cleanup.deleted_count > 0);
    assert!(harness.store.list_objects("plan-f/").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_after_completion_empties_prefix() {
    let harness = harness(600, 400);
    submit_and_wait(&harness, "https://example.com/plan.pdf", "plan-del").await;

    let before = harness.store.list_objects("plan-del/").await.unwrap();
    assert!(!before.is_empty());

    let outcome = harness.reaper.delete_one("plan-del").await;
    assert!(outcome.success);
    assert_eq!(outcome.deleted_count, before.len());
    assert!(harness
        .store
        .list_objects("plan-del/")
        .await
        .unwrap()
        .is_empty());

    // Deleting again reports zero with success
    let again = harness.reaper.delete_one("plan-del").await;
    assert!(again.success);
    assert_eq!(again.deleted_count, 0);
}

#[tokio::test]
async fn test_delete_many_reports_per_id() {
    let harness = harness(600, 400);
    submit_and_wait(&harness, "https://example.com/a.pdf", "plan-a").await;
    submit_and_wait(&harness, "https://example.com/b.pdf", "plan-b").await;
    harness.store.poison_deletes("plan-b/").await;

    let report = harness
        .reaper
        .delete_many(&[
            "plan-a".to_string(),
            "plan-b".to_string(),
            "plan-missing".to_string(),
        ])
        .await;

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.succeeded, 2); // plan-a and the missing id
    assert_eq!(report.failed, 1);

    assert!(report.results[0].success);
    assert!(report.results[0].deleted_count > 0);
    assert!(!report.results[1].success);
    assert!(report.results[2].success);
    assert_eq!(report.results[2].deleted_count, 0);
}

// =============================================================================
// HTTP surface
// =============================================================================

fn router(harness: &Harness) -> axum::Router {
    let state = AppState {
        manager: harness.manager.clone(),
        reaper: harness.reaper.clone(),
    };
    create_router(state, RouterConfig::new().with_tracing(false))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_http_health() {
    let harness = harness(600, 400);
    let app = router(&harness);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_http_submit_poll_and_delete() {
    let harness = harness(600, 400);
    let app = router(&harness);

    // Submit
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/floorplans")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"file_url": "https://example.com/plan.pdf", "file_id": "plan-h"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    let job_id = json["job_id"].as_str().unwrap().to_string();
    assert_eq!(json["status"], "queued");
    assert_eq!(json["status_url"], format!("/api/jobs/{job_id}"));

    wait_terminal(&harness.manager, &job_id).await;

    // Poll
    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/api/jobs/{job_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "completed");
    assert_eq!(json["progress"], 100);
    assert_eq!(json["result"]["floorplan_id"], "plan-h");

    // Duplicate submission answers 200 with the descriptor
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/floorplans")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"file_url": "https://example.com/plan.pdf", "file_id": "plan-h"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["duplicate"], true);
    assert_eq!(json["metadata"]["floorplan_id"], "plan-h");

    // Delete
    let response = app
        .clone()
        .oneshot(
            Request::delete("/api/floorplans/plan-h")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert!(json["deleted_count"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_http_validation_and_not_found() {
    let harness = harness(600, 400);
    let app = router(&harness);

    // Malformed file_id
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/floorplans")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"file_url": "https://example.com/p.pdf", "file_id": "a/b"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_request");

    // Malformed URL
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/floorplans")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"file_url": "not a url", "file_id": "ok"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown job
    let response = app
        .clone()
        .oneshot(
            Request::get("/api/jobs/00000000-0000-0000-0000-000000000000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "not_found");

    // Bulk delete with empty id list
    let response = app
        .oneshot(
            Request::post("/api/floorplans/delete")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"file_ids": []}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_http_bulk_delete() {
    let harness = harness(600, 400);
    submit_and_wait(&harness, "https://example.com/a.pdf", "plan-x").await;
    let app = router(&harness);

    let response = app
        .oneshot(
            Request::post("/api/floorplans/delete")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"file_ids": ["plan-x", "plan-y"]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["succeeded"], 2);
    assert_eq!(json["failed"], 0);
    assert_eq!(json["results"][0]["file_id"], "plan-x");
    assert!(json["results"][0]["deleted_count"].as_u64().unwrap() > 0);
    assert_eq!(json["results"][1]["deleted_count"], 0);
}
