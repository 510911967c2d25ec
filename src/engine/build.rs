//! Executing build instructions against an environment's shell.

use std::time::{Duration, Instant};

use log::debug;

use crate::environment::{EnvironmentError, Shell};
use crate::schema::{BuildInstructions, BuildStep};

/// A build step exited with a non-zero code or ran out of time.
#[derive(Debug, Clone, thiserror::Error)]
#[error(
    "Build step {step} failed after {duration:.2?} (exit code {exit_code:?}, timed out: {timed_out})"
)]
pub struct BuildStepFailed {
    pub step: BuildStep,
    pub exit_code: Option<i32>,
    pub duration: Duration,
    /// Combined stdout and stderr of the step.
    pub output: String,
    pub timed_out: bool,
}

/// Errors raised while executing build instructions.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    StepFailed(#[from] BuildStepFailed),
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
}

impl BuildStep {
    /// Run this step through `shell`, subject to an optional ceiling.
    pub fn execute<S: Shell + ?Sized>(
        &self,
        shell: &S,
        time_limit: Option<Duration>,
    ) -> Result<(), BuildError> {
        debug!(
            "Executing build step `{}` in {} (time limit: {:?})",
            self.command, self.directory, time_limit
        );
        let output = shell.run(&self.command, &self.directory, time_limit)?;
        if output.success() {
            return Ok(());
        }

        Err(BuildStepFailed {
            step: self.clone(),
            exit_code: output.exit_code,
            duration: output.duration,
            output: output.output,
            timed_out: output.timed_out,
        }
        .into())
    }
}

impl BuildInstructions {
    /// Run every step in order, stopping at the first failure.
    ///
    /// The time limit covers the whole sequence: each step gets whatever is
    /// left of it when the step starts.
    pub fn execute<S: Shell + ?Sized>(&self, shell: &S) -> Result<(), BuildError> {
        let start = Instant::now();
        for step in &self.steps {
            let time_left = self
                .time_limit
                .map(|limit| limit.saturating_sub(start.elapsed()));
            step.execute(shell, time_left)?;
        }
        Ok(())
    }
}
