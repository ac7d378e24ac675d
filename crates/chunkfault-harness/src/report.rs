//! Machine-readable run reports.

use chunkfault_error::{Result, ScenarioFailure};
use chunkfault_types::{CopyId, JobId};
use serde::{Deserialize, Serialize};

use crate::inject::InjectionReport;
use crate::scenario::MarkingClass;
use crate::validate;
use crate::verify::WaitOutcome;

/// Schema identifier embedded in every serialized report.
pub const REPORT_SCHEMA_V1: &str = "chunkfault.report.v1";

/// Everything observed while running one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub scenario: String,
    pub policy: String,
    pub selected_chunks: Vec<u64>,
    pub affected_jobs: Vec<JobId>,
    pub injections: Vec<InjectionReport>,
    pub wait: WaitOutcome,
    pub expected_marking: MarkingClass,
    pub observed_marking: MarkingClass,
    /// `None` when the scenario matched its expectation.
    pub failure: Option<String>,
}

/// Full record of one harness run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub schema: String,
    pub seed: u64,
    pub copy: CopyId,
    pub jobs: Vec<JobId>,
    pub scenarios: Vec<ScenarioOutcome>,
}

impl RunReport {
    pub fn new(seed: u64, copy: CopyId, jobs: &[JobId]) -> Self {
        Self {
            schema: REPORT_SCHEMA_V1.to_owned(),
            seed,
            copy,
            jobs: jobs.to_vec(),
            scenarios: Vec::new(),
        }
    }

    /// The scenarios that did not match their expectation.
    pub fn failures(&self) -> Vec<ScenarioFailure> {
        self.scenarios
            .iter()
            .filter_map(|outcome| {
                outcome.failure.as_ref().map(|detail| ScenarioFailure {
                    scenario: outcome.scenario.clone(),
                    detail: detail.clone(),
                })
            })
            .collect()
    }

    /// Raise the aggregated failure error unless every scenario passed.
    pub fn ensure_passed(&self) -> Result<()> {
        validate::check_all(self.failures())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|err| {
            chunkfault_error::HarnessError::Internal(format!("report serialization failed: {err}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::MarkingClass;

    fn outcome(scenario: &str, failure: Option<&str>) -> ScenarioOutcome {
        ScenarioOutcome {
            scenario: scenario.to_owned(),
            policy: "random_4".to_owned(),
            selected_chunks: vec![1, 2],
            affected_jobs: vec![JobId(1)],
            injections: Vec::new(),
            wait: WaitOutcome::Failed,
            expected_marking: MarkingClass::AllMarked,
            observed_marking: MarkingClass::AllMarked,
            failure: failure.map(str::to_owned),
        }
    }

    #[test]
    fn passing_report_raises_no_error() {
        let mut report = RunReport::new(42, CopyId(7), &[JobId(1)]);
        report.scenarios.push(outcome("sfile missing", None));
        report.ensure_passed().expect("no failures recorded");
    }

    #[test]
    fn failing_report_aggregates_every_failure() {
        let mut report = RunReport::new(42, CopyId(7), &[JobId(1)]);
        report.scenarios.push(outcome("sfile missing", None));
        report
            .scenarios
            .push(outcome("chunk missing", Some("expected ALL_MARKED, observed PARTIAL")));
        report
            .scenarios
            .push(outcome("volume missing", Some("job 3 did not fail verification")));

        let err = report.ensure_passed().expect_err("two scenarios failed");
        let rendered = err.to_string();
        assert!(rendered.contains("chunk missing"), "msg: {rendered}");
        assert!(rendered.contains("volume missing"), "msg: {rendered}");
        assert!(rendered.contains("2 scenario(s)"), "msg: {rendered}");
    }

    #[test]
    fn report_serializes_with_schema_tag() {
        let report = RunReport::new(42, CopyId(7), &[JobId(1)]);
        let json = report.to_json().expect("serialize");
        assert!(json.contains(REPORT_SCHEMA_V1), "json: {json}");

        let parsed: RunReport = serde_json::from_str(&json).expect("parse back");
        assert_eq!(parsed, report);
    }
}
