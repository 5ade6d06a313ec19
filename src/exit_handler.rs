//! Exit code logic for the sync process.
//!
//! Single responsibility: map sweep results to the process exit outcome.

use std::process::ExitCode;

use qbench_sync_core::SweepStats;

/// Process outcome of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Full sweep, no record failures.
    Success,
    /// Configuration error, fatal sweep error, or every attempted record failed.
    Failure,
    /// Sweep completed; some records failed while others succeeded.
    Partial,
}

impl ProcessExit {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Partial => 2,
        }
    }
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        ExitCode::from(exit.code())
    }
}

/// Determines the process exit outcome from a completed sweep.
pub(crate) fn determine_exit_outcome(stats: &SweepStats) -> ProcessExit {
    if stats.failed == 0 {
        ProcessExit::Success
    } else if stats.succeeded() > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}
