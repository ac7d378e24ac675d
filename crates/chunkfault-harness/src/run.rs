//! Run orchestration: resolve, select, inject, verify, validate.
//!
//! All state a run needs travels in [`RunContext`]; nothing is ambient.
//! Scenarios execute in catalog order against the same job set, and every
//! random choice draws from one generator seeded once, so a run is
//! reproducible from `(seed, scenario list)`.

use std::collections::BTreeSet;
use std::time::Duration;

use chunkfault_catalog::{MetadataCatalog, resolve_chunks, resolve_volumes, unprotect_volumes};
use chunkfault_error::{HarnessError, Result};
use chunkfault_fs::StorageNodeFs;
use chunkfault_types::{ChunkId, ChunkLocation, CopyId, JobId, StoreId, VerificationStatusCode};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::inject::inject;
use crate::report::{RunReport, ScenarioOutcome};
use crate::scenario::ScenarioSpec;
use crate::select::select_targets;
use crate::validate::{check_scenario, classify_marking, job_verdicts};
use crate::verify::{VerificationEngine, VerificationJob, wait_for_terminal};

/// Everything one harness run operates on.
pub struct RunContext<C, F, E> {
    pub catalog: C,
    pub fs: F,
    pub engine: E,
    /// Completed write jobs whose chunks are the injection universe.
    pub jobs: Vec<JobId>,
    /// Policy copy the jobs were written to.
    pub copy: CopyId,
    /// Deduplication stores whose bad-chunk tables are checked.
    pub stores: Vec<StoreId>,
    pub seed: u64,
    /// Wait budget per verification pass.
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl<C, F, E> RunContext<C, F, E>
where
    C: MetadataCatalog,
    F: StorageNodeFs,
    E: VerificationEngine,
{
    /// Execute the scenarios in order and return the full run record.
    ///
    /// Scenario mismatches are recorded in the report, not raised here;
    /// callers promote them with [`RunReport::ensure_passed`]. Errors from
    /// this function are fatal: broken resolution, storage or catalog
    /// failures, or a verification pass that never terminated.
    pub fn execute(&mut self, specs: &[ScenarioSpec]) -> Result<RunReport> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let chunks = resolve_chunks(&self.catalog, &self.jobs, self.copy)?;
        let volumes = resolve_volumes(&chunks);
        unprotect_volumes(&self.fs, &volumes)?;
        info!(
            jobs = self.jobs.len(),
            chunks = chunks.len(),
            volumes = volumes.len(),
            seed = self.seed,
            "run context resolved"
        );

        let mut report = RunReport::new(self.seed, self.copy, &self.jobs);
        for spec in specs {
            let outcome = self.run_scenario(spec, &chunks, &mut rng)?;
            report.scenarios.push(outcome);
        }
        Ok(report)
    }

    fn run_scenario(
        &mut self,
        spec: &ScenarioSpec,
        chunks: &[ChunkLocation],
        rng: &mut StdRng,
    ) -> Result<ScenarioOutcome> {
        info!(scenario = %spec.scenario, policy = %spec.policy, "running scenario");
        let baseline = self.catalog.dropped_chunks(&self.stores)?;
        let baseline_ids: BTreeSet<ChunkId> =
            baseline.iter().map(|(chunk, _store)| *chunk).collect();

        let selection =
            select_targets(&self.fs, chunks, spec.policy, &baseline_ids, rng)?;
        let injections = inject(&self.fs, spec.scenario, &selection, rng)?;

        let mut pass = self.engine.start_verification()?;
        let wait = wait_for_terminal(&mut pass, self.timeout, self.poll_interval)?;
        if !wait.is_terminal() {
            return Err(HarnessError::VerificationTimeout {
                job_id: pass.id(),
                stores: self.stores.iter().map(|s| s.as_u64()).collect(),
                timeout: self.timeout,
            });
        }

        let after = self.catalog.dropped_chunks(&self.stores)?;
        let observed_marking = classify_marking(&selection.chunks, &baseline, &after);

        let affected_jobs = selection.affected_jobs();
        let statuses: Vec<(JobId, Vec<VerificationStatusCode>)> = affected_jobs
            .iter()
            .map(|&job| Ok((job, self.catalog.verification_statuses(job)?)))
            .collect::<Result<_>>()?;
        let verdicts = job_verdicts(&statuses);

        let failure = check_scenario(
            spec.scenario.label(),
            spec.expectation,
            observed_marking,
            &verdicts,
        );

        Ok(ScenarioOutcome {
            scenario: spec.scenario.label().to_owned(),
            policy: spec.policy.to_string(),
            selected_chunks: selection.chunks.iter().map(|c| c.id.as_u64()).collect(),
            affected_jobs,
            injections,
            wait,
            expected_marking: spec.expectation.marking,
            observed_marking,
            failure: failure.map(|f| f.detail),
        })
    }
}
