//! Read access to the relational metadata catalog, and resolution of
//! catalog rows into physical chunk and volume locations.
//!
//! The catalog is the system of record for where every job's chunks live,
//! which chunks a verification pass has marked bad, and each job's
//! verification status. The harness only reads it; verification itself is
//! the component that writes.

use std::collections::BTreeSet;

use chunkfault_error::Result;
use chunkfault_types::{ChunkId, ChunkRow, CopyId, JobId, StoreId, VerificationStatusCode};

mod resolver;
mod sqlite;

pub use resolver::{resolve_chunks, resolve_volumes, unprotect_volumes};
pub use sqlite::SqliteCatalog;

/// A chunk marked bad, keyed by chunk and the deduplication store that
/// dropped it.
pub type DroppedChunk = (ChunkId, StoreId);

/// Queries the harness needs against the metadata catalog.
pub trait MetadataCatalog {
    /// All chunk locations holding data written by `job` on `copy`.
    fn chunks_for_job(&self, job: JobId, copy: CopyId) -> Result<Vec<ChunkRow>>;

    /// Chunks currently marked bad for any of the given stores.
    fn dropped_chunks(&self, stores: &[StoreId]) -> Result<BTreeSet<DroppedChunk>>;

    /// Every verification status code recorded for `job`. A job carries one
    /// row per phase, so several codes can come back.
    fn verification_statuses(&self, job: JobId) -> Result<Vec<VerificationStatusCode>>;
}
