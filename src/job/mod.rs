//! Conversion job domain types.
//!
//! A job tracks one submission through `queued → processing → completed |
//! failed`. Records live only in the process-local job store; they are
//! mutated exclusively by the job manager and become immutable once a
//! terminal state is reached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod manager;
pub mod store;

pub use manager::{JobManager, SubmitOutcome, TilerOptions};
pub use store::{InMemoryJobStore, JobStore, JobUpdate};

/// Lifecycle state of a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, waiting for a worker slot
    Queued,

    /// A worker is converting the source
    Processing,

    /// Artifact set fully persisted; terminal
    Completed,

    /// Conversion aborted; terminal. Partial artifacts may remain.
    Failed,
}

impl JobStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Summary attached to a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    /// Identifier of the produced artifact set
    pub floorplan_id: String,

    /// Rendered raster width in pixels
    pub width: u32,

    /// Rendered raster height in pixels
    pub height: u32,

    /// Tile edge length in pixels
    pub tile_size: u32,

    /// Lowest generated zoom level
    pub min_zoom: u8,

    /// Highest generated zoom level
    pub max_zoom: u8,

    /// Tiles persisted across all levels
    pub total_tiles: u64,

    /// Effective render density
    pub dpi: u32,
}

/// One conversion job's record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Opaque unique token handed back to the caller
    pub job_id: String,

    /// Current lifecycle state
    pub status: JobStatus,

    /// Completion estimate, 0-100, monotonically non-decreasing
    pub progress: u8,

    /// Human-readable description of the current step or failure
    pub message: String,

    /// When the job was accepted
    pub created_at: DateTime<Utc>,

    /// When the record last changed
    pub updated_at: DateTime<Utc>,

    /// Present once the job completes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
}

impl Job {
    /// Create a freshly queued job record.
    pub fn new(job_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.into(),
            status: JobStatus::Queued,
            progress: 0,
            message: "Job queued for processing".to_string(),
            created_at: now,
            updated_at: now,
            result: None,
        }
    }
}
