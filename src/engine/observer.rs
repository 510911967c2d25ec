//! Reporting search events.

use std::fmt;

use log::{debug, info, warn};

use crate::environment::EnvironmentError;
use crate::schema::StopReason;

use super::candidate::{Candidate, Transformation};
use super::search::Repair;

/// Why a candidate was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The patched program did not build.
    CompileFailed,
    /// A test failed; later tests were not run.
    TestFailed { test: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CompileFailed => write!(f, "failed to compile"),
            Self::TestFailed { test } => write!(f, "failed test {test}"),
        }
    }
}

/// Receives search events. Every method defaults to doing nothing.
///
/// Methods are called from worker threads, concurrently.
pub trait SearchObserver<T>: Send + Sync {
    fn on_evaluate(&self, _candidate: &Candidate<T>) {}

    fn on_reject(&self, _candidate: &Candidate<T>, _rejection: &Rejection) {}

    fn on_accept(&self, _repair: &Repair<T>) {}

    fn on_error(&self, _candidate: &Candidate<T>, _error: &EnvironmentError) {}

    /// Called once per run, when the search halts.
    fn on_halt(&self, _reason: &StopReason) {}
}

/// Writes search events to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl<T: Transformation> SearchObserver<T> for LogObserver {
    fn on_evaluate(&self, candidate: &Candidate<T>) {
        debug!("Evaluating: {}", candidate);
    }

    fn on_reject(&self, candidate: &Candidate<T>, rejection: &Rejection) {
        debug!("Rejected {}: {}", candidate, rejection);
    }

    fn on_accept(&self, repair: &Repair<T>) {
        info!(
            "Found repair after {:.2} minutes: {}\n{}",
            repair.found_after.as_secs_f64() / 60.0,
            repair.candidate,
            repair.patch
        );
    }

    fn on_error(&self, candidate: &Candidate<T>, error: &EnvironmentError) {
        warn!("Failed to evaluate {}: {}", candidate, error);
    }

    fn on_halt(&self, reason: &StopReason) {
        info!("Search halted: {}", reason);
    }
}
