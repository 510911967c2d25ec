//! Build instruction types and their configuration parsing.
//!
//! Execution is implemented in the engine (see [`crate::engine::BuildError`]);
//! this module only describes what to run and where.

use std::fmt;
use std::ops::Index;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single shell-style command and the directory it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    /// Command passed to the environment's shell.
    pub command: String,
    /// Working directory for the command.
    pub directory: String,
}

impl BuildStep {
    /// Create a build step.
    pub fn new(command: impl Into<String>, directory: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            directory: directory.into(),
        }
    }

    /// Parse a step entry, which is either a bare command string or an object
    /// with a `command` and an optional `directory`.
    pub fn from_value(value: &Value, source_directory: &str) -> Result<Self, BuildConfigError> {
        let entry = match value {
            Value::String(command) => return Ok(Self::new(command.as_str(), source_directory)),
            Value::Object(entry) => entry,
            _ => return Err(bad("build step should be a string or an object")),
        };

        let command = match entry.get("command") {
            None => return Err(bad("build step is missing 'command' property")),
            Some(Value::String(command)) => command.as_str(),
            Some(_) => return Err(bad("'command' property should be a string")),
        };

        let directory = match entry.get("directory") {
            None => source_directory,
            Some(Value::String(directory)) => directory.as_str(),
            Some(_) => return Err(bad("'directory' property should be a string")),
        };

        Ok(Self::new(command, directory))
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` in {}", self.command, self.directory)
    }
}

/// An ordered sequence of build steps sharing one time budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInstructions {
    /// Steps, executed in order.
    pub steps: Vec<BuildStep>,
    /// Budget for the whole sequence. `None` leaves every step unconstrained.
    pub time_limit: Option<Duration>,
}

impl BuildInstructions {
    /// Create build instructions.
    pub fn new(steps: Vec<BuildStep>, time_limit: Option<Duration>) -> Self {
        Self { steps, time_limit }
    }

    /// Parse a `build-instructions` section.
    ///
    /// Returns the plain instructions and the instructions for a
    /// coverage-instrumented build, in that order. When no
    /// `steps-for-coverage` are given, both share the same steps.
    pub fn from_value(
        value: &Value,
        source_directory: &str,
    ) -> Result<(Self, Self), BuildConfigError> {
        let Value::Object(section) = value else {
            return Err(bad("'build-instructions' section should be an object"));
        };

        let Some(steps) = section.get("steps") else {
            return Err(bad(
                "'steps' property is missing from 'build-instructions' section",
            ));
        };
        let Some(time_limit) = section.get("time-limit") else {
            return Err(bad(
                "'time-limit' property is missing from 'build-instructions' section",
            ));
        };

        let Some(time_limit) = time_limit.as_u64() else {
            return Err(bad("'time-limit' property should be a non-negative integer"));
        };
        let time_limit = Some(Duration::from_secs(time_limit));

        let steps = parse_steps(steps, "steps", source_directory)?;
        if steps.is_empty() {
            return Err(bad("'steps' property should not be empty"));
        }

        let steps_for_coverage = match section.get("steps-for-coverage") {
            Some(value) => parse_steps(value, "steps-for-coverage", source_directory)?,
            None => steps.clone(),
        };

        Ok((
            Self::new(steps, time_limit),
            Self::new(steps_for_coverage, time_limit),
        ))
    }

    /// Synthesize single-step instructions from a build descriptor.
    pub fn from_descriptor(descriptor: &BuildDescriptor) -> (Self, Self) {
        let compiler = &descriptor.compiler;
        let workdir = match compiler.context.as_deref() {
            Some(context) if !context.is_empty() => context,
            _ => descriptor.source_directory.as_str(),
        };
        let time_limit = compiler.time_limit.map(Duration::from_secs);

        let plain = Self::new(
            vec![BuildStep::new(compiler.command.as_str(), workdir)],
            time_limit,
        );
        let coverage = Self::new(
            vec![BuildStep::new(
                compiler.command_with_instrumentation.as_str(),
                workdir,
            )],
            time_limit,
        );
        (plain, coverage)
    }

    /// Number of build steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterate over the build steps in execution order.
    pub fn iter(&self) -> std::slice::Iter<'_, BuildStep> {
        self.steps.iter()
    }
}

impl Index<usize> for BuildInstructions {
    type Output = BuildStep;

    fn index(&self, index: usize) -> &BuildStep {
        &self.steps[index]
    }
}

impl<'a> IntoIterator for &'a BuildInstructions {
    type Item = &'a BuildStep;
    type IntoIter = std::slice::Iter<'a, BuildStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

fn parse_steps(
    value: &Value,
    property: &str,
    source_directory: &str,
) -> Result<Vec<BuildStep>, BuildConfigError> {
    let Value::Array(entries) = value else {
        return Err(bad(format!("'{property}' property should be an array")));
    };
    entries
        .iter()
        .map(|entry| BuildStep::from_value(entry, source_directory))
        .collect()
}

fn bad(message: impl Into<String>) -> BuildConfigError {
    BuildConfigError::BadConfiguration(message.into())
}

/// Build metadata of an existing program snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildDescriptor {
    /// Directory holding the program's sources.
    pub source_directory: String,
    /// How the program is compiled.
    pub compiler: CompilerDescriptor,
}

/// Compiler section of a [`BuildDescriptor`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerDescriptor {
    /// Plain build command.
    pub command: String,
    /// Build command with coverage instrumentation.
    pub command_with_instrumentation: String,
    /// Time limit in seconds.
    #[serde(default)]
    pub time_limit: Option<u64>,
    /// Build context directory; falls back to the source directory.
    #[serde(default)]
    pub context: Option<String>,
}

/// Build configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildConfigError {
    #[error("Bad configuration: {0}")]
    BadConfiguration(String),
}
