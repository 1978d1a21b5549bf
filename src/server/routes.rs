//! Router configuration for the floorplan tiler.
//!
//! # Route Structure
//!
//! ```text
//! /health                        - Health check
//! /api/floorplans                - POST: submit a conversion
//! /api/floorplans/delete         - POST: bulk delete
//! /api/floorplans/{file_id}      - DELETE: delete one artifact set
//! /api/jobs/{job_id}             - GET: poll a job
//! ```

use std::time::Duration;

use axum::{
    routing::{delete, get, post},
    Router,
};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    delete_floorplan_handler, delete_floorplans_handler, health_handler, job_status_handler,
    submit_floorplan_handler, AppState,
};
use crate::store::ObjectStore;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a configuration with defaults: any origin, tracing on.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router.
pub fn create_router<S>(state: AppState<S>, config: RouterConfig) -> Router
where
    S: ObjectStore + 'static,
{
    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/api/floorplans", post(submit_floorplan_handler::<S>))
        .route(
            "/api/floorplans/delete",
            post(delete_floorplans_handler::<S>),
        )
        .route(
            "/api/floorplans/{file_id}",
            delete(delete_floorplan_handler::<S>),
        )
        .route("/api/jobs/{job_id}", get(job_status_handler::<S>))
        .with_state(state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_config_defaults() {
        let config = RouterConfig::new();
        assert!(config.cors_origins.is_none());
        assert!(config.enable_tracing);
    }

    #[test]
    fn test_router_config_builder() {
        let config = RouterConfig::new()
            .with_cors_origins(vec!["https://example.com".to_string()])
            .with_tracing(false);

        assert_eq!(
            config.cors_origins,
            Some(vec!["https://example.com".to_string()])
        );
        assert!(!config.enable_tracing);
    }

    #[test]
    fn test_build_cors_layer_variants() {
        // Any origin, specific origins, and empty origins must all build
        let _any = build_cors_layer(&RouterConfig::new());
        let _specific = build_cors_layer(
            &RouterConfig::new().with_cors_origins(vec!["https://example.com".to_string()]),
        );
        let _empty = build_cors_layer(&RouterConfig::new().with_cors_origins(vec![]));
    }
}
