//! Fault scenarios and the expectations attached to them.
//!
//! A scenario pairs a concrete on-disk fault with a selection policy and
//! the state the catalog must show after a verification pass. The built-in
//! catalog covers every file class of a chunk: data segments, the segment
//! index, the chunk directory, the volume directory, and per-chunk
//! metadata.

use serde::{Deserialize, Serialize};

/// Which data-segment member of a chunk the injector targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberPick {
    First,
    Last,
    /// Seeded choice among the chunk's members.
    Random,
}

/// A concrete fault to inject into each selected target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fault", rename_all = "snake_case")]
pub enum FaultScenario {
    /// Overwrite one data segment with a corruption marker.
    SfileCorrupted { pick: MemberPick },
    /// Delete one data segment.
    SfileMissing { pick: MemberPick },
    /// Cut one data segment to zero length.
    SfileTruncated { pick: MemberPick },
    /// Delete the whole chunk directory.
    ChunkMissing,
    /// Delete the whole volume directory.
    VolumeMissing,
    /// Overwrite the segment index with a corruption marker.
    SfileIndexCorrupted,
    /// Delete the segment index.
    SfileIndexMissing,
    /// Overwrite the per-chunk metadata file.
    ChunkMetadataCorrupted,
    /// Delete the per-chunk metadata file.
    ChunkMetadataMissing,
}

impl FaultScenario {
    /// Stable human label, used in logs, reports and failure messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::SfileCorrupted { .. } => "sfile corrupted",
            Self::SfileMissing { .. } => "sfile missing",
            Self::SfileTruncated { .. } => "sfile truncated",
            Self::ChunkMissing => "chunk missing",
            Self::VolumeMissing => "volume missing",
            Self::SfileIndexCorrupted => "sfile index corrupted",
            Self::SfileIndexMissing => "sfile index missing",
            Self::ChunkMetadataCorrupted => "chunk metadata corrupted",
            Self::ChunkMetadataMissing => "chunk metadata missing",
        }
    }

    /// True for faults that destroy payload data and must make verification
    /// drop the affected chunks.
    pub fn is_destructive(self) -> bool {
        matches!(
            self,
            Self::SfileCorrupted { .. }
                | Self::SfileMissing { .. }
                | Self::SfileTruncated { .. }
                | Self::ChunkMissing
                | Self::VolumeMissing
        )
    }
}

impl std::fmt::Display for FaultScenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How injection targets are chosen from the resolved chunk set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// `n` distinct chunks chosen by seeded sampling among eligible chunks.
    /// Hard error when fewer than `n` chunks are eligible.
    RandomN { n: usize },
    /// Every chunk whose segment index exists on disk.
    AllWithExistingMember,
    /// Up to `limit` whole volumes, with every chunk they contain.
    VolumeScoped { limit: usize },
}

impl std::fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RandomN { n } => write!(f, "random_{n}"),
            Self::AllWithExistingMember => f.write_str("all_with_existing_member"),
            Self::VolumeScoped { limit } => write!(f, "volume_scoped_{limit}"),
        }
    }
}

/// Required bad-chunk marking after the verification pass, over the
/// scenario's selected chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarkingClass {
    /// Every selected chunk is in the bad-chunk table.
    AllMarked,
    /// No selected chunk is in the bad-chunk table.
    NoneMarked,
    /// Some but not all selected chunks are marked. Never expected, only
    /// observed; it always fails validation.
    Partial,
}

impl std::fmt::Display for MarkingClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::AllMarked => "ALL_MARKED",
            Self::NoneMarked => "NONE_MARKED",
            Self::Partial => "PARTIAL",
        })
    }
}

/// Required verification status across the jobs whose chunks were selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusExpectation {
    /// Every affected job must carry a failed status.
    AllFailed,
    /// No affected job may carry a failed status.
    AllSucceeded,
    /// Either outcome is acceptable.
    DontCare,
}

/// The post-verification state a scenario must produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
    pub marking: MarkingClass,
    pub status: StatusExpectation,
}

/// One entry of a run: the fault, how targets are picked, and what must be
/// true afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub scenario: FaultScenario,
    pub policy: SelectionPolicy,
    pub expectation: Expectation,
}

/// The built-in scenario catalog.
///
/// Destructive faults on payload data must be caught and fail verification.
/// Faults on regenerable control files (segment index) and on per-chunk
/// metadata must be tolerated without marking chunks bad; a missing index
/// additionally leaves the job status unconstrained because the engine may
/// either rebuild it silently or re-verify the affected jobs.
pub fn builtin_catalog() -> Vec<ScenarioSpec> {
    use FaultScenario as F;
    use MarkingClass as M;
    use StatusExpectation as S;

    let random4 = SelectionPolicy::RandomN { n: 4 };
    let spec = |scenario, policy, marking, status| ScenarioSpec {
        scenario,
        policy,
        expectation: Expectation { marking, status },
    };

    vec![
        spec(
            F::SfileCorrupted {
                pick: MemberPick::Random,
            },
            random4,
            M::AllMarked,
            S::AllFailed,
        ),
        spec(
            F::SfileMissing {
                pick: MemberPick::First,
            },
            random4,
            M::AllMarked,
            S::AllFailed,
        ),
        spec(
            F::SfileTruncated {
                pick: MemberPick::Last,
            },
            random4,
            M::AllMarked,
            S::AllFailed,
        ),
        spec(F::ChunkMissing, random4, M::AllMarked, S::AllFailed),
        spec(
            F::VolumeMissing,
            SelectionPolicy::VolumeScoped { limit: 1 },
            M::AllMarked,
            S::AllFailed,
        ),
        spec(
            F::SfileIndexCorrupted,
            random4,
            M::NoneMarked,
            S::AllSucceeded,
        ),
        spec(F::SfileIndexMissing, random4, M::NoneMarked, S::DontCare),
        spec(
            F::ChunkMetadataCorrupted,
            random4,
            M::NoneMarked,
            S::AllSucceeded,
        ),
        spec(
            F::ChunkMetadataMissing,
            random4,
            M::NoneMarked,
            S::AllSucceeded,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_covers_every_fault_exactly_once() {
        let catalog = builtin_catalog();
        assert_eq!(catalog.len(), 9);
        let labels: std::collections::BTreeSet<_> =
            catalog.iter().map(|s| s.scenario.label()).collect();
        assert_eq!(labels.len(), 9, "duplicate fault in catalog");
    }

    #[test]
    fn destructive_faults_expect_all_marked_and_failed() {
        for spec in builtin_catalog() {
            if spec.scenario.is_destructive() {
                assert_eq!(spec.expectation.marking, MarkingClass::AllMarked, "{}", spec.scenario);
                assert_eq!(
                    spec.expectation.status,
                    StatusExpectation::AllFailed,
                    "{}",
                    spec.scenario
                );
            } else {
                assert_eq!(spec.expectation.marking, MarkingClass::NoneMarked, "{}", spec.scenario);
            }
        }
    }

    #[test]
    fn scenario_serde_uses_tagged_form() {
        let json = serde_json::to_string(&FaultScenario::SfileMissing {
            pick: MemberPick::First,
        })
        .expect("serialize");
        assert_eq!(json, r#"{"fault":"sfile_missing","pick":"first"}"#);
    }
}
