//! Post-verification validation: compare the catalog's state against each
//! scenario's expectation.
//!
//! Marking is classified over the scenario's selected chunks only, relative
//! to a baseline snapshot of the drop table taken before injection. Drop
//! marks persist across passes, so the diff is what this pass contributed.

use std::collections::BTreeSet;

use chunkfault_catalog::DroppedChunk;
use chunkfault_error::{HarnessError, Result, ScenarioFailure};
use chunkfault_types::{ChunkLocation, JobId, VerificationStatusCode};
use tracing::info;

use crate::scenario::{Expectation, MarkingClass, StatusExpectation};

/// Classify how the selected chunks show up in the drop table after the
/// pass. Chunks dropped before the baseline do not count.
pub fn classify_marking(
    selected: &[ChunkLocation],
    baseline: &BTreeSet<DroppedChunk>,
    after: &BTreeSet<DroppedChunk>,
) -> MarkingClass {
    let newly_dropped: BTreeSet<_> = after
        .difference(baseline)
        .map(|(chunk, _store)| *chunk)
        .collect();
    let marked = selected
        .iter()
        .filter(|chunk| newly_dropped.contains(&chunk.id))
        .count();

    if marked == selected.len() && !selected.is_empty() {
        MarkingClass::AllMarked
    } else if marked == 0 {
        MarkingClass::NoneMarked
    } else {
        MarkingClass::Partial
    }
}

/// Per-job status verdicts for the jobs a scenario touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobVerdict {
    pub job: JobId,
    pub failed: bool,
}

/// A job counts as failed when any of its verification status rows carries
/// the failed code.
pub fn job_verdicts(
    statuses: &[(JobId, Vec<VerificationStatusCode>)],
) -> Vec<JobVerdict> {
    statuses
        .iter()
        .map(|(job, codes)| JobVerdict {
            job: *job,
            failed: codes.iter().any(|code| code.is_failed()),
        })
        .collect()
}

/// Compare one scenario's observed state against its expectation.
/// `None` means the scenario passed.
pub fn check_scenario(
    scenario: &str,
    expectation: Expectation,
    observed_marking: MarkingClass,
    verdicts: &[JobVerdict],
) -> Option<ScenarioFailure> {
    let mut mismatches = Vec::new();

    if observed_marking != expectation.marking {
        mismatches.push(format!(
            "expected {}, observed {}",
            expectation.marking, observed_marking
        ));
    }

    match expectation.status {
        StatusExpectation::AllFailed => {
            for verdict in verdicts.iter().filter(|v| !v.failed) {
                mismatches.push(format!("job {} did not fail verification", verdict.job));
            }
        }
        StatusExpectation::AllSucceeded => {
            for verdict in verdicts.iter().filter(|v| v.failed) {
                mismatches.push(format!("job {} failed verification", verdict.job));
            }
        }
        StatusExpectation::DontCare => {}
    }

    if mismatches.is_empty() {
        info!(scenario, marking = %observed_marking, "scenario validated");
        None
    } else {
        Some(ScenarioFailure {
            scenario: scenario.to_owned(),
            detail: mismatches.join("; "),
        })
    }
}

/// Raise the aggregated error when any scenario failed validation.
pub fn check_all(failures: Vec<ScenarioFailure>) -> Result<()> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(HarnessError::ScenarioFailures(failures))
    }
}
