//! Execution environments in which candidate patches are built and tested.
//!
//! The search engine only talks to the traits defined here:
//!
//! - [`EnvironmentProvider`]: provisions and destroys isolated environments
//! - [`Environment`]: applies a patch, compiles, and executes tests
//! - [`Shell`]: runs commands inside an environment under a time ceiling
//!
//! A local implementation backed by temporary directories is provided in
//! [`local`].

mod local;
mod shell;

use std::io;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

pub use local::{LocalEnvironment, LocalProblem, LocalProvider, ShellTest};
pub use shell::{CommandOutput, LocalShell, Shell};

use crate::engine::{Patch, Problem};

/// Outcome of compiling a patched program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOutcome {
    pub successful: bool,
    pub duration: Duration,
}

/// Outcome of executing a single test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestOutcome {
    pub passed: bool,
    pub duration: Duration,
}

/// An isolated copy of the program under repair.
pub trait Environment: Send {
    type Test;

    /// Apply a patch to the program.
    fn apply(&mut self, patch: &Patch) -> Result<(), EnvironmentError>;

    /// Build the (patched) program.
    fn compile(&mut self) -> Result<CompileOutcome, EnvironmentError>;

    /// Execute one test against the built program.
    fn execute(&mut self, test: &Self::Test) -> Result<TestOutcome, EnvironmentError>;
}

/// Creates and tears down environments for a problem.
pub trait EnvironmentProvider<P: Problem>: Send + Sync {
    type Environment: Environment<Test = P::Test>;

    fn provision(&self, problem: &P) -> Result<Self::Environment, EnvironmentError>;

    fn destroy(&self, environment: &mut Self::Environment) -> Result<(), EnvironmentError>;
}

/// An environment that is destroyed when dropped.
///
/// Every successful [`Provisioned::acquire`] is matched by exactly one call
/// to [`EnvironmentProvider::destroy`], whichever way the holder exits.
pub struct Provisioned<'a, P: Problem, E: EnvironmentProvider<P>> {
    provider: &'a E,
    environment: E::Environment,
    _problem: PhantomData<fn(&P)>,
}

impl<'a, P: Problem, E: EnvironmentProvider<P>> Provisioned<'a, P, E> {
    pub fn acquire(provider: &'a E, problem: &P) -> Result<Self, EnvironmentError> {
        let environment = provider.provision(problem)?;
        Ok(Self {
            provider,
            environment,
            _problem: PhantomData,
        })
    }
}

impl<P: Problem, E: EnvironmentProvider<P>> Deref for Provisioned<'_, P, E> {
    type Target = E::Environment;

    fn deref(&self) -> &Self::Target {
        &self.environment
    }
}

impl<P: Problem, E: EnvironmentProvider<P>> DerefMut for Provisioned<'_, P, E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.environment
    }
}

impl<P: Problem, E: EnvironmentProvider<P>> Drop for Provisioned<'_, P, E> {
    fn drop(&mut self) {
        if let Err(err) = self.provider.destroy(&mut self.environment) {
            log::warn!("Failed to destroy environment: {}", err);
        }
    }
}

/// Infrastructure failures, as opposed to a candidate failing to build or
/// pass its tests.
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to provision environment: {0}")]
    Provision(String),
    #[error("Failed to apply patch: {0}")]
    Patch(String),
    #[error("Unknown source file {0}")]
    UnknownFile(String),
    #[error("Line {line} is out of range for {file}")]
    LineOutOfRange { file: String, line: usize },
}
