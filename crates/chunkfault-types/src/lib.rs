//! Core identifiers and the on-disk naming convention of the chunk store.
//!
//! A deduplicated chunk store lays immutable chunks out as directories under
//! a mount path:
//!
//! ```text
//! <mount_folder>/<mount_path_name>/CV_MAGNETIC/<volume_name>/CHUNK_<chunk_id>/
//!     SFILE_CONTAINER_001          data segment
//!     SFILE_CONTAINER_002          data segment
//!     SFILE_CONTAINER.idx          segment index (verification control file)
//!     CHUNK_META_DATA_<chunk_id>   per-chunk metadata
//! ```
//!
//! Everything in this crate is a pure value: path derivation is
//! deterministic and reproducible for a given catalog row.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Fixed subdirectory interposed between the mount path and its volumes.
pub const MAGNETIC_SUBDIR: &str = "CV_MAGNETIC";

/// Prefix of chunk directory names (`CHUNK_<chunk_id>`).
pub const CHUNK_DIR_PREFIX: &str = "CHUNK_";

/// Prefix of data-segment files inside a chunk (`SFILE_CONTAINER_<nnn>`).
pub const SFILE_MEMBER_PREFIX: &str = "SFILE_CONTAINER_";

/// The segment index file. Its presence marks a fully formed chunk, and the
/// verification pass reads it first.
pub const SFILE_INDEX_NAME: &str = "SFILE_CONTAINER.idx";

/// Prefix of the per-chunk metadata file; the chunk id is appended to form
/// the full name (`CHUNK_META_DATA_<chunk_id>`).
pub const CHUNK_METADATA_PREFIX: &str = "CHUNK_META_DATA_";

// ── Identifiers ─────────────────────────────────────────────────────────

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

id_newtype!(
    /// Identifier of a completed write (backup) job.
    JobId
);
id_newtype!(
    /// Opaque, lifetime-stable identifier of one chunk.
    ChunkId
);
id_newtype!(
    /// Identifier of a deduplication store (the index that tracks
    /// unique-block references for one policy copy).
    StoreId
);
id_newtype!(
    /// Identifier of a policy copy holding the jobs' data.
    CopyId
);

// ── Catalog rows and derived locations ──────────────────────────────────

/// One row of the catalog's chunk-location answer for a job + copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRow {
    pub mount_folder: String,
    pub mount_path_name: String,
    pub volume_name: String,
    pub chunk_id: ChunkId,
}

impl ChunkRow {
    /// Derive the physical chunk directory path. Pure and stable: the same
    /// row always yields the same path.
    pub fn chunk_path(&self) -> PathBuf {
        Path::new(&self.mount_folder)
            .join(&self.mount_path_name)
            .join(MAGNETIC_SUBDIR)
            .join(&self.volume_name)
            .join(chunk_dir_name(self.chunk_id))
    }

    /// Derive the physical volume directory path (the chunk path's parent).
    pub fn volume_path(&self) -> PathBuf {
        Path::new(&self.mount_folder)
            .join(&self.mount_path_name)
            .join(MAGNETIC_SUBDIR)
            .join(&self.volume_name)
    }
}

/// A chunk resolved to its physical location, tagged with the job that
/// wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkLocation {
    pub id: ChunkId,
    pub job: JobId,
    pub path: PathBuf,
}

impl ChunkLocation {
    pub fn from_row(row: &ChunkRow, job: JobId) -> Self {
        Self {
            id: row.chunk_id,
            job,
            path: row.chunk_path(),
        }
    }

    /// The containing volume path, by stripping the `CHUNK_<id>` suffix.
    pub fn volume_path(&self) -> Option<&Path> {
        self.path.parent()
    }

    /// Name of this chunk's per-chunk metadata file.
    pub fn metadata_file_name(&self) -> String {
        format!("{CHUNK_METADATA_PREFIX}{}", self.id)
    }
}

/// A volume (logical grouping of chunks on one mount path), resolved to its
/// physical location. Ordered so volume sets iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VolumeLocation {
    pub name: String,
    pub path: PathBuf,
}

// ── Naming helpers ──────────────────────────────────────────────────────

/// Directory name for a chunk id (`CHUNK_<id>`).
pub fn chunk_dir_name(id: ChunkId) -> String {
    format!("{CHUNK_DIR_PREFIX}{id}")
}

/// True for data-segment member files (`SFILE_CONTAINER_<nnn>`); the
/// segment index file does not match.
pub fn is_sfile_member(file_name: &str) -> bool {
    file_name.starts_with(SFILE_MEMBER_PREFIX)
}

// ── Verification status codes ───────────────────────────────────────────

/// Per-job data-verification status code as recorded by the catalog.
///
/// The catalog stores one row per job phase, so a single job can carry
/// several distinct codes after a verification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationStatusCode(pub i64);

impl VerificationStatusCode {
    /// Job not yet picked for verification.
    pub const NOT_PICKED: Self = Self(0);
    /// Verification succeeded.
    pub const SUCCESS: Self = Self(5);
    /// Verification failed.
    pub const FAILED: Self = Self(6);

    pub const fn is_failed(self) -> bool {
        self.0 == Self::FAILED.0
    }
}

impl std::fmt::Display for VerificationStatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> ChunkRow {
        ChunkRow {
            mount_folder: "/mnt/store1".to_owned(),
            mount_path_name: "LIB_42".to_owned(),
            volume_name: "V_1007".to_owned(),
            chunk_id: ChunkId(5513),
        }
    }

    #[test]
    fn chunk_path_follows_naming_convention() {
        assert_eq!(
            row().chunk_path(),
            PathBuf::from("/mnt/store1/LIB_42/CV_MAGNETIC/V_1007/CHUNK_5513")
        );
    }

    #[test]
    fn volume_path_is_chunk_path_parent() {
        let r = row();
        assert_eq!(r.chunk_path().parent().unwrap(), r.volume_path());
    }

    #[test]
    fn sfile_member_classification() {
        assert!(is_sfile_member("SFILE_CONTAINER_001"));
        assert!(is_sfile_member("SFILE_CONTAINER_042"));
        assert!(!is_sfile_member(SFILE_INDEX_NAME));
        assert!(!is_sfile_member("CHUNK_META_DATA_5513"));
    }

    #[test]
    fn metadata_file_name_appends_chunk_id() {
        let loc = ChunkLocation::from_row(&row(), JobId(9));
        assert_eq!(loc.metadata_file_name(), "CHUNK_META_DATA_5513");
    }

    #[test]
    fn status_code_classes() {
        assert!(VerificationStatusCode::FAILED.is_failed());
        assert!(!VerificationStatusCode::SUCCESS.is_failed());
        assert!(!VerificationStatusCode::NOT_PICKED.is_failed());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn chunk_path_is_stable_and_parented_by_volume(
                mount in "[a-zA-Z0-9_]{1,12}",
                library in "[a-zA-Z0-9_]{1,12}",
                volume in "[a-zA-Z0-9_]{1,12}",
                chunk in any::<u64>(),
            ) {
                let r = ChunkRow {
                    mount_folder: format!("/mnt/{mount}"),
                    mount_path_name: library,
                    volume_name: volume,
                    chunk_id: ChunkId(chunk),
                };
                prop_assert_eq!(r.chunk_path(), r.chunk_path());
                let chunk_path = r.chunk_path();
                let volume_path = r.volume_path();
                prop_assert_eq!(chunk_path.parent(), Some(volume_path.as_path()));
                let dir_name = chunk_dir_name(ChunkId(chunk));
                prop_assert_eq!(
                    chunk_path.file_name().and_then(|n| n.to_str()),
                    Some(dir_name.as_str())
                );
            }
        }
    }
}
