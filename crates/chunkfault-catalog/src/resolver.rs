//! Resolve catalog rows to physical locations on the storage node.

use std::collections::BTreeSet;

use chunkfault_error::{HarnessError, Result};
use chunkfault_fs::StorageNodeFs;
use chunkfault_types::{ChunkLocation, CopyId, JobId, VolumeLocation};
use tracing::info;

use crate::MetadataCatalog;

/// Resolve the physical chunk locations for every job, in catalog order.
///
/// A job with zero chunks is a setup inconsistency (the job completed, so
/// its data must be somewhere) and aborts resolution.
pub fn resolve_chunks<C: MetadataCatalog>(
    catalog: &C,
    jobs: &[JobId],
    copy: CopyId,
) -> Result<Vec<ChunkLocation>> {
    let mut locations = Vec::new();
    for &job in jobs {
        let rows = catalog.chunks_for_job(job, copy)?;
        if rows.is_empty() {
            return Err(HarnessError::Resolution(format!(
                "job {job} has no chunks on copy {copy}"
            )));
        }
        info!(%job, chunks = rows.len(), "resolved chunk locations");
        locations.extend(rows.iter().map(|row| ChunkLocation::from_row(row, job)));
    }
    Ok(locations)
}

/// The distinct volumes containing the given chunks, each named after its
/// directory and deduplicated by path.
pub fn resolve_volumes(chunks: &[ChunkLocation]) -> BTreeSet<VolumeLocation> {
    chunks
        .iter()
        .filter_map(|chunk| {
            let path = chunk.volume_path()?;
            let name = path.file_name()?.to_string_lossy().into_owned();
            Some(VolumeLocation {
                name,
                path: path.to_path_buf(),
            })
        })
        .collect()
}

/// Neutralize delete-protection on every volume so injected deletions take
/// effect. Must run before any destructive scenario.
pub fn unprotect_volumes<F: StorageNodeFs>(
    fs: &F,
    volumes: &BTreeSet<VolumeLocation>,
) -> Result<()> {
    for volume in volumes {
        fs.allow_delete(&volume.path)?;
        info!(volume = %volume.name, "delete protection lifted");
    }
    Ok(())
}
