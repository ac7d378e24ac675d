//! Error taxonomy for the chunkfault harness.
//!
//! The split mirrors how failures propagate through a run:
//!
//! - [`HarnessError::Resolution`] and [`HarnessError::TargetMissing`] are
//!   harness bugs (bad ordering, inconsistent catalog) and abort the run
//!   immediately.
//! - [`HarnessError::Catalog`] and [`HarnessError::Io`] are
//!   external-interface failures and also abort.
//! - [`HarnessError::VerificationTimeout`] surfaces a verification job that
//!   never reached a terminal state.
//! - [`HarnessError::ScenarioFailures`] is the single aggregated report of
//!   every scenario whose post-verification state did not match its
//!   expectation; it is raised once, after all scenarios are checked.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Convenience alias used across all chunkfault crates.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// One scenario whose outcome did not match its expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioFailure {
    /// Human label of the fault scenario.
    pub scenario: String,
    /// What mismatched (marking class, job status, or both).
    pub detail: String,
}

impl std::fmt::Display for ScenarioFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.scenario, self.detail)
    }
}

/// Errors produced by the chunkfault harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The metadata catalog returned an inconsistent or empty answer for a
    /// job that is supposed to have data. This is a harness/setup bug, not a
    /// scenario outcome.
    #[error("catalog resolution failed: {0}")]
    Resolution(String),

    /// A target selected for injection vanished before the injector reached
    /// it. Selection verifies existence, so this indicates an ordering bug.
    #[error("expected injection target is missing: {path}")]
    TargetMissing { path: PathBuf },

    /// The metadata catalog itself failed (unreachable, query error).
    #[error("metadata catalog error: {0}")]
    Catalog(String),

    /// Storage-node filesystem operation failed.
    #[error("storage node io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invariant violation inside the harness itself.
    #[error("internal harness error: {0}")]
    Internal(String),

    /// A verification job never reached a terminal state within the wait
    /// budget.
    #[error("verification job {job_id} over stores {stores:?} did not reach a terminal state within {timeout:?}")]
    VerificationTimeout {
        job_id: u64,
        stores: Vec<u64>,
        timeout: Duration,
    },

    /// Aggregated validator mismatches across the whole run. Listing every
    /// failing scenario in one error keeps a single misclassified chunk from
    /// hiding problems in the other scenarios.
    #[error("{} scenario(s) failed validation: [{}]", .0.len(), format_failures(.0))]
    ScenarioFailures(Vec<ScenarioFailure>),
}

fn format_failures(failures: &[ScenarioFailure]) -> String {
    failures
        .iter()
        .map(|f| f.scenario.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl HarnessError {
    /// True when this error aborts the run rather than failing one scenario.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ScenarioFailures(_))
    }
}
