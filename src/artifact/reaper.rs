//! Artifact deletion.
//!
//! Deletion is "list every key under the prefix, delete each, count". A
//! missing prefix is not an error: there is simply nothing to delete.
//! Bulk deletion treats each id independently: one id failing never aborts
//! the rest, and the aggregate report carries per-id results plus combined
//! totals.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::store::{ArtifactKeys, ObjectStore};

/// Result of deleting one floorplan's artifact set.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    /// The floorplan id the deletion targeted
    pub file_id: String,

    /// Number of objects actually deleted
    pub deleted_count: usize,

    /// Whether every listed object was deleted
    pub success: bool,

    /// First error encountered, when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate result of a bulk deletion.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteReport {
    /// Per-id outcomes, in request order
    pub results: Vec<DeleteOutcome>,

    /// Ids whose deletion fully succeeded
    pub succeeded: usize,

    /// Ids that hit at least one error
    pub failed: usize,

    /// Objects deleted across all ids
    pub total_deleted: usize,
}

/// Deletes floorplan artifact sets from the object store.
pub struct ArtifactReaper<S: ObjectStore> {
    store: Arc<S>,
}

impl<S: ObjectStore> ArtifactReaper<S> {
    /// Create a reaper over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Delete every object under one floorplan's prefix.
    ///
    /// A floorplan with no stored objects reports `deleted_count = 0` with
    /// `success = true`. Listing failures and per-object delete failures
    /// are captured in the outcome, never propagated as an `Err`; the
    /// caller always gets a report.
    pub async fn delete_one(&self, file_id: &str) -> DeleteOutcome {
        let keys = ArtifactKeys::new(file_id);

        let listed = match self.store.list_objects(&keys.prefix()).await {
            Ok(listed) => listed,
            Err(e) => {
                warn!(file_id, error = %e, "failed to list artifact objects");
                return DeleteOutcome {
                    file_id: file_id.to_string(),
                    deleted_count: 0,
                    success: false,
                    error: Some(e.to_string()),
                };
            }
        };

        let mut deleted = 0usize;
        let mut first_error: Option<String> = None;

        for key in &listed {
            match self.store.delete_object(key).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    warn!(file_id, key, error = %e, "failed to delete artifact object");
                    if first_error.is_none() {
                        first_error = Some(e.to_string());
                    }
                }
            }
        }

        let success = first_error.is_none();
        info!(file_id, deleted, listed = listed.len(), success, "artifact deletion finished");

        DeleteOutcome {
            file_id: file_id.to_string(),
            deleted_count: deleted,
            success,
            error: first_error,
        }
    }

    /// Delete several floorplans, each independently.
    pub async fn delete_many(&self, file_ids: &[String]) -> DeleteReport {
        let mut results = Vec::with_capacity(file_ids.len());
        for file_id in file_ids {
            results.push(self.delete_one(file_id).await);
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        let failed = results.len() - succeeded;
        let total_deleted = results.iter().map(|r| r.deleted_count).sum();

        DeleteReport {
            results,
            succeeded,
            failed,
            total_deleted,
        }
    }
}
