//! Target selection: which chunks (or volumes) a scenario injects into.
//!
//! A chunk is eligible when its segment index still exists on disk and it
//! is not already in the bad-chunk table: a chunk destroyed or marked by an
//! earlier scenario is not a valid injection target. Random choices come
//! from a seeded generator so a run is reproducible from its seed.

use std::collections::BTreeSet;

use chunkfault_error::{HarnessError, Result};
use chunkfault_fs::StorageNodeFs;
use chunkfault_types::{ChunkId, ChunkLocation, JobId, SFILE_INDEX_NAME, VolumeLocation};
use rand::Rng;
use rand::rngs::StdRng;
use tracing::info;

use crate::scenario::SelectionPolicy;

/// The targets one scenario operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Selected chunks, in selection order. For volume-scoped policies this
    /// is every chunk inside the selected volumes.
    pub chunks: Vec<ChunkLocation>,
    /// Selected volumes. Empty unless the policy is volume-scoped.
    pub volumes: Vec<VolumeLocation>,
}

impl Selection {
    /// The distinct jobs whose chunks were selected, in id order.
    pub fn affected_jobs(&self) -> Vec<JobId> {
        let jobs: BTreeSet<JobId> = self.chunks.iter().map(|c| c.job).collect();
        jobs.into_iter().collect()
    }
}

/// Apply a selection policy over the resolved chunk set. `already_dropped`
/// holds the chunk ids the bad-chunk table carried before this scenario.
pub fn select_targets<F: StorageNodeFs>(
    fs: &F,
    chunks: &[ChunkLocation],
    policy: SelectionPolicy,
    already_dropped: &BTreeSet<ChunkId>,
    rng: &mut StdRng,
) -> Result<Selection> {
    let eligible: Vec<&ChunkLocation> = chunks
        .iter()
        .filter(|chunk| {
            !already_dropped.contains(&chunk.id)
                && fs.file_exists(&chunk.path.join(SFILE_INDEX_NAME))
        })
        .collect();
    info!(total = chunks.len(), eligible = eligible.len(), %policy, "selecting targets");

    match policy {
        SelectionPolicy::RandomN { n } => {
            if eligible.len() < n {
                return Err(HarnessError::Resolution(format!(
                    "policy {policy} needs {n} eligible chunks, only {} remain",
                    eligible.len()
                )));
            }
            let mut picked_idx = BTreeSet::new();
            let mut picked = Vec::with_capacity(n);
            while picked.len() < n {
                let idx = rng.gen_range(0..eligible.len());
                if picked_idx.insert(idx) {
                    picked.push(eligible[idx].clone());
                }
            }
            Ok(Selection {
                chunks: picked,
                volumes: Vec::new(),
            })
        }
        SelectionPolicy::AllWithExistingMember => Ok(Selection {
            chunks: eligible.into_iter().cloned().collect(),
            volumes: Vec::new(),
        }),
        SelectionPolicy::VolumeScoped { limit } => {
            let volumes: Vec<VolumeLocation> = eligible
                .iter()
                .filter_map(|chunk| {
                    let path = chunk.volume_path()?;
                    Some(VolumeLocation {
                        name: path.file_name()?.to_string_lossy().into_owned(),
                        path: path.to_path_buf(),
                    })
                })
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            if volumes.is_empty() {
                return Err(HarnessError::Resolution(
                    "no volume with eligible chunks remains".to_owned(),
                ));
            }

            let mut picked_volumes = Vec::new();
            let mut picked_idx = BTreeSet::new();
            while picked_volumes.len() < limit.min(volumes.len()) {
                let idx = rng.gen_range(0..volumes.len());
                if picked_idx.insert(idx) {
                    picked_volumes.push(volumes[idx].clone());
                }
            }

            let selected_chunks = eligible
                .into_iter()
                .filter(|chunk| {
                    chunk
                        .volume_path()
                        .is_some_and(|p| picked_volumes.iter().any(|v| v.path == p))
                })
                .cloned()
                .collect();
            Ok(Selection {
                chunks: selected_chunks,
                volumes: picked_volumes,
            })
        }
    }
}
