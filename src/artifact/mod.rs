//! Durable artifact handling: the metadata descriptor, the writer that
//! persists a pyramid and the reaper that deletes one.

pub mod metadata;
pub mod reaper;
pub mod writer;

pub use metadata::{FloorplanMetadata, SCHEMA_VERSION};
pub use reaper::{ArtifactReaper, DeleteOutcome, DeleteReport};
pub use writer::ArtifactWriter;
