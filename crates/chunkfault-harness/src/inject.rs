//! Fault injection against the chunk store's on-disk layout.
//!
//! Every mutation is recorded as an [`InjectionReport`] carrying the target
//! path and the SHA-256 of the bytes it replaced, so a run can show exactly
//! what was destroyed.

use std::path::{Path, PathBuf};

use chunkfault_error::{HarnessError, Result};
use chunkfault_fs::StorageNodeFs;
use chunkfault_types::{ChunkLocation, SFILE_INDEX_NAME, VolumeLocation, is_sfile_member};
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::scenario::{FaultScenario, MemberPick};
use crate::select::Selection;

/// Marker payload written over corrupted files. The target chunk id is
/// appended so each corrupted file differs from the others.
pub const CORRUPTION_MARKER: &str = "This file has been corrupted";

/// What the injector did to one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionOp {
    DeleteFile,
    DeleteDir,
    Overwrite,
    Truncate,
}

/// One applied fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionReport {
    pub scenario: String,
    pub op: InjectionOp,
    pub target: PathBuf,
    /// SHA-256 of the target's previous contents. `None` for directory
    /// targets.
    pub sha256_before: Option<String>,
}

/// Apply `scenario` to every selected target.
pub fn inject<F: StorageNodeFs>(
    fs: &F,
    scenario: FaultScenario,
    selection: &Selection,
    rng: &mut StdRng,
) -> Result<Vec<InjectionReport>> {
    let mut reports = Vec::new();
    match scenario {
        FaultScenario::VolumeMissing => {
            for volume in &selection.volumes {
                reports.push(delete_volume(fs, scenario, volume)?);
            }
        }
        _ => {
            for chunk in &selection.chunks {
                reports.push(inject_into_chunk(fs, scenario, chunk, rng)?);
            }
        }
    }
    Ok(reports)
}

fn inject_into_chunk<F: StorageNodeFs>(
    fs: &F,
    scenario: FaultScenario,
    chunk: &ChunkLocation,
    rng: &mut StdRng,
) -> Result<InjectionReport> {
    let report = match scenario {
        FaultScenario::SfileCorrupted { pick } => {
            let target = pick_member(fs, chunk, pick, rng)?;
            overwrite(fs, scenario, &target, &corrupt_payload(chunk))?
        }
        FaultScenario::SfileMissing { pick } => {
            let target = pick_member(fs, chunk, pick, rng)?;
            delete_file(fs, scenario, &target)?
        }
        FaultScenario::SfileTruncated { pick } => {
            let target = pick_member(fs, chunk, pick, rng)?;
            truncate(fs, scenario, &target)?
        }
        FaultScenario::ChunkMissing => delete_dir(fs, scenario, &chunk.path)?,
        FaultScenario::SfileIndexCorrupted => {
            let target = existing_file(fs, chunk.path.join(SFILE_INDEX_NAME))?;
            overwrite(fs, scenario, &target, &corrupt_payload(chunk))?
        }
        FaultScenario::SfileIndexMissing => {
            let target = existing_file(fs, chunk.path.join(SFILE_INDEX_NAME))?;
            delete_file(fs, scenario, &target)?
        }
        FaultScenario::ChunkMetadataCorrupted => {
            let target = existing_file(fs, chunk.path.join(chunk.metadata_file_name()))?;
            overwrite(fs, scenario, &target, &corrupt_payload(chunk))?
        }
        FaultScenario::ChunkMetadataMissing => {
            let target = existing_file(fs, chunk.path.join(chunk.metadata_file_name()))?;
            delete_file(fs, scenario, &target)?
        }
        FaultScenario::VolumeMissing => {
            return Err(HarnessError::Internal(
                "volume faults take volume targets, not chunks".to_owned(),
            ));
        }
    };
    Ok(report)
}

fn corrupt_payload(chunk: &ChunkLocation) -> Vec<u8> {
    format!("{CORRUPTION_MARKER}\n{}\n", chunk.id).into_bytes()
}

/// Pick one data-segment member of the chunk, by position or seeded choice.
/// Members sort by name, which matches their creation order.
fn pick_member<F: StorageNodeFs>(
    fs: &F,
    chunk: &ChunkLocation,
    pick: MemberPick,
    rng: &mut StdRng,
) -> Result<PathBuf> {
    let mut members: Vec<String> = fs
        .list_files(&chunk.path)?
        .into_iter()
        .filter(|name| is_sfile_member(name))
        .collect();
    members.sort();
    if members.is_empty() {
        return Err(HarnessError::TargetMissing {
            path: chunk.path.clone(),
        });
    }

    let idx = match pick {
        MemberPick::First => 0,
        MemberPick::Last => members.len() - 1,
        MemberPick::Random => rng.gen_range(0..members.len()),
    };
    Ok(chunk.path.join(&members[idx]))
}

fn existing_file<F: StorageNodeFs>(fs: &F, path: PathBuf) -> Result<PathBuf> {
    if fs.file_exists(&path) {
        Ok(path)
    } else {
        Err(HarnessError::TargetMissing { path })
    }
}

/// Read a target that selection said exists. A target that vanished in the
/// meantime is an ordering bug, not a storage failure.
fn read_existing<F: StorageNodeFs>(fs: &F, target: &Path) -> Result<Vec<u8>> {
    match fs.read_file(target) {
        Ok(bytes) => Ok(bytes),
        Err(HarnessError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(HarnessError::TargetMissing {
                path: target.to_path_buf(),
            })
        }
        Err(err) => Err(err),
    }
}

fn overwrite<F: StorageNodeFs>(
    fs: &F,
    scenario: FaultScenario,
    target: &Path,
    payload: &[u8],
) -> Result<InjectionReport> {
    let before = read_existing(fs, target)?;
    fs.write_file(target, payload)?;
    info!(scenario = %scenario, target = %target.display(), "overwrote file");
    Ok(InjectionReport {
        scenario: scenario.label().to_owned(),
        op: InjectionOp::Overwrite,
        target: target.to_path_buf(),
        sha256_before: Some(sha256_hex(&before)),
    })
}

fn truncate<F: StorageNodeFs>(
    fs: &F,
    scenario: FaultScenario,
    target: &Path,
) -> Result<InjectionReport> {
    let before = read_existing(fs, target)?;
    fs.write_file(target, &[])?;
    info!(
        scenario = %scenario,
        target = %target.display(),
        from = before.len(),
        "truncated file to zero length"
    );
    Ok(InjectionReport {
        scenario: scenario.label().to_owned(),
        op: InjectionOp::Truncate,
        target: target.to_path_buf(),
        sha256_before: Some(sha256_hex(&before)),
    })
}

fn delete_file<F: StorageNodeFs>(
    fs: &F,
    scenario: FaultScenario,
    target: &Path,
) -> Result<InjectionReport> {
    let before = read_existing(fs, target)?;
    fs.delete_file(target)?;
    info!(scenario = %scenario, target = %target.display(), "deleted file");
    Ok(InjectionReport {
        scenario: scenario.label().to_owned(),
        op: InjectionOp::DeleteFile,
        target: target.to_path_buf(),
        sha256_before: Some(sha256_hex(&before)),
    })
}

fn delete_dir<F: StorageNodeFs>(
    fs: &F,
    scenario: FaultScenario,
    target: &Path,
) -> Result<InjectionReport> {
    if !fs.dir_exists(target) {
        return Err(HarnessError::TargetMissing {
            path: target.to_path_buf(),
        });
    }
    fs.delete_dir(target)?;
    info!(scenario = %scenario, target = %target.display(), "deleted directory");
    Ok(InjectionReport {
        scenario: scenario.label().to_owned(),
        op: InjectionOp::DeleteDir,
        target: target.to_path_buf(),
        sha256_before: None,
    })
}

fn delete_volume<F: StorageNodeFs>(
    fs: &F,
    scenario: FaultScenario,
    volume: &VolumeLocation,
) -> Result<InjectionReport> {
    delete_dir(fs, scenario, &volume.path)
}

/// Lowercase hex SHA-256 digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0F)]));
    }
    out
}
