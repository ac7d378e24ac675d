//! Fault-injection and verification harness for deduplicated chunk stores.
//!
//! A run resolves the physical chunk locations of a set of completed write
//! jobs from the metadata catalog, injects filesystem faults into selected
//! chunks, triggers the store's verification pass, and validates that the
//! catalog afterwards shows exactly the bad-chunk markings and per-job
//! verification statuses each scenario requires. Failures across scenarios
//! are aggregated into a single error, never raised one at a time.
//!
//! The pipeline, in order:
//!
//! 1. [`chunkfault_catalog::resolve_chunks`] — catalog rows to paths
//! 2. [`select::select_targets`] — policy-driven target choice
//! 3. [`inject::inject`] — apply the fault, record what was destroyed
//! 4. [`verify::wait_for_terminal`] — run verification to a terminal state
//! 5. [`validate::check_scenario`] — compare catalog state to expectation
//!
//! [`run::RunContext`] ties the steps together; [`scenario::builtin_catalog`]
//! is the standard scenario set.

pub mod inject;
pub mod log;
pub mod report;
pub mod run;
pub mod scenario;
pub mod select;
pub mod validate;
pub mod verify;

pub use inject::{CORRUPTION_MARKER, InjectionOp, InjectionReport};
pub use report::{REPORT_SCHEMA_V1, RunReport, ScenarioOutcome};
pub use run::RunContext;
pub use scenario::{
    Expectation, FaultScenario, MarkingClass, MemberPick, ScenarioSpec, SelectionPolicy,
    StatusExpectation, builtin_catalog,
};
pub use select::{Selection, select_targets};
pub use verify::{JobState, VerificationEngine, VerificationJob, WaitOutcome, wait_for_terminal};
