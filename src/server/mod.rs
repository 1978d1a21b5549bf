//! Axum HTTP surface over the conversion core.

pub mod handlers;
pub mod routes;

pub use handlers::{
    delete_floorplan_handler, delete_floorplans_handler, health_handler, job_status_handler,
    submit_floorplan_handler, AppState, DeleteFloorplansRequest, DuplicateResponse, ErrorResponse,
    HealthResponse, ProcessFloorplanRequest, SubmitResponse,
};
pub use routes::{create_router, RouterConfig};
