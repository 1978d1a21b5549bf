//! Floorplan Tiler - PDF floorplan to tile pyramid conversion service.
//!
//! This binary wires the S3 store, the MuPDF renderer and the HTTP surface
//! together and starts the server.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use floorplan_tiler::{
    config::Config,
    create_s3_client,
    server::{create_router, AppState, RouterConfig},
    ArtifactReaper, HttpSourceFetcher, JobManager, MupdfRenderer, S3ObjectStore,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Configuration:");
    info!("  S3 bucket: {}", config.s3_bucket);
    if let Some(ref endpoint) = config.s3_endpoint {
        info!("  S3 endpoint: {}", endpoint);
    }
    info!("  S3 region: {}", config.s3_region);
    info!(
        "  Tiling: {}px {} tiles, zoom boost +{}, max zoom {}",
        config.tile_size,
        config.tile_format(),
        config.zoom_boost,
        config.max_zoom_limit
    );
    info!("  Concurrency: {} job(s)", config.max_jobs);

    // Create the S3 client and verify the bucket is reachable before
    // accepting work
    let s3_client = create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await;

    info!("Connecting to S3...");
    if let Err(e) = test_s3_connection(&s3_client, &config.s3_bucket).await {
        error!("  Failed to connect to S3: {}", e);
        error!("");
        error!("  Please check:");
        error!("    - Your AWS credentials are configured correctly");
        error!(
            "    - The bucket '{}' exists and is accessible",
            config.s3_bucket
        );
        error!("    - The S3 endpoint is correct (if using MinIO/custom S3)");
        return ExitCode::FAILURE;
    }
    info!("  Connected successfully");

    // Wire the core services
    let store = Arc::new(S3ObjectStore::new(s3_client, config.s3_bucket.clone()));
    let manager = JobManager::new(
        Arc::clone(&store),
        Arc::new(HttpSourceFetcher::new()),
        Arc::new(MupdfRenderer::new()),
        config.tiler_options(),
    );
    let reaper = ArtifactReaper::new(store);

    let mut router_config = RouterConfig::new().with_tracing(!config.no_tracing);
    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    let router = create_router(AppState::new(manager, reaper), router_config);

    let addr = config.bind_address();
    info!("");
    info!("Server listening on http://{}", addr);
    info!("  Submit:  curl -X POST http://{}/api/floorplans \\", addr);
    info!("             -H 'Content-Type: application/json' \\");
    info!("             -d '{{\"file_url\": \"https://...\", \"file_id\": \"plan-1\"}}'");
    info!("  Status:  curl http://{}/api/jobs/<job_id>", addr);
    info!("  Health:  curl http://{}/health", addr);
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Verify the bucket answers a minimal list request.
async fn test_s3_connection(client: &aws_sdk_s3::Client, bucket: &str) -> Result<(), String> {
    client
        .list_objects_v2()
        .bucket(bucket)
        .max_keys(1)
        .send()
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "floorplan_tiler=debug,tower_http=debug"
    } else {
        "floorplan_tiler=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
