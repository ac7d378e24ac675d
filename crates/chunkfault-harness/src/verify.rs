//! Triggering a verification pass and waiting for it to finish.
//!
//! The verification engine is the external component that scans chunk data,
//! marks bad chunks in the catalog's drop table, and records per-job
//! verification statuses. The harness only starts a pass and polls it to a
//! terminal state.

use std::time::{Duration, Instant};

use chunkfault_error::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Observable state of a running verification job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Completed,
    Failed,
    Killed,
}

/// How the wait for a verification pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitOutcome {
    /// The pass ran to completion. Per-job statuses say what it found.
    Completed,
    /// The pass itself failed. Expected for destructive scenarios, where
    /// the engine reports the whole admin job as failed.
    Failed,
    /// The pass was killed externally.
    Killed,
    /// No terminal state within the wait budget.
    TimedOut,
}

impl WaitOutcome {
    /// True when the pass reached a terminal state and the catalog's
    /// post-verification rows are meaningful.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::TimedOut)
    }
}

/// A started verification pass.
///
/// A pass replaces each covered job's verification status rows and appends
/// to the bad-chunk table; prior drop marks persist.
pub trait VerificationJob {
    /// Engine-side identifier of this pass, for logs and timeout errors.
    fn id(&self) -> u64;

    /// Current state. Polled until terminal.
    fn poll(&mut self) -> Result<JobState>;
}

/// Starts verification passes over the jobs under test.
pub trait VerificationEngine {
    type Job: VerificationJob;

    fn start_verification(&mut self) -> Result<Self::Job>;
}

/// Poll `job` until it reaches a terminal state or `timeout` elapses.
pub fn wait_for_terminal<J: VerificationJob>(
    job: &mut J,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<WaitOutcome> {
    let started = Instant::now();
    loop {
        let outcome = match job.poll()? {
            JobState::Completed => Some(WaitOutcome::Completed),
            JobState::Failed => Some(WaitOutcome::Failed),
            JobState::Killed => Some(WaitOutcome::Killed),
            JobState::Running => None,
        };
        if let Some(outcome) = outcome {
            info!(job = job.id(), ?outcome, "verification pass finished");
            return Ok(outcome);
        }
        if started.elapsed() >= timeout {
            warn!(job = job.id(), ?timeout, "verification pass still running");
            return Ok(WaitOutcome::TimedOut);
        }
        std::thread::sleep(poll_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedJob {
        states: Vec<JobState>,
    }

    impl VerificationJob for ScriptedJob {
        fn id(&self) -> u64 {
            1
        }

        fn poll(&mut self) -> Result<JobState> {
            Ok(if self.states.is_empty() {
                JobState::Running
            } else {
                self.states.remove(0)
            })
        }
    }

    #[test]
    fn wait_returns_first_terminal_state() {
        let mut job = ScriptedJob {
            states: vec![JobState::Running, JobState::Running, JobState::Failed],
        };
        let outcome = wait_for_terminal(
            &mut job,
            Duration::from_secs(5),
            Duration::from_millis(1),
        )
        .expect("polling should succeed");
        assert_eq!(outcome, WaitOutcome::Failed);
    }

    #[test]
    fn wait_times_out_on_a_stuck_job() {
        let mut job = ScriptedJob { states: Vec::new() };
        let outcome = wait_for_terminal(
            &mut job,
            Duration::from_millis(5),
            Duration::from_millis(1),
        )
        .expect("polling should succeed");
        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(!outcome.is_terminal());
    }
}
