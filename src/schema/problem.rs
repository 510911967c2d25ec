//! Problem files for repairing a program in a local directory.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{BuildConfigError, BuildInstructions, SearchConfig, SearchConfigError};

/// Working directory that build steps and tests default to: the sandbox root.
pub const SANDBOX_ROOT: &str = ".";

/// Top-level problem description.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProblemConfig {
    /// Directory holding the program under repair. Relative paths are
    /// resolved against the problem file's directory.
    pub source_directory: PathBuf,
    /// Raw `build-instructions` section.
    pub build_instructions: Value,
    /// Tests, in the order they should be executed.
    pub tests: Vec<TestConfig>,
    /// Candidate modifications.
    pub transformations: Vec<LineEdit>,
    /// Search settings.
    #[serde(default)]
    pub search: SearchConfig,
}

/// A test case run as a shell command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub directory: Option<String>,
    /// Time limit in seconds.
    #[serde(default)]
    pub time_limit: Option<u64>,
    /// Outcome of the test on the unpatched program.
    #[serde(default)]
    pub outcome: ExpectedOutcome,
    /// Observed running time in seconds, used to run cheap tests first.
    #[serde(default)]
    pub cost: Option<f64>,
}

/// Whether a test passes or fails on the program under repair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpectedOutcome {
    #[default]
    Passing,
    Failing,
}

impl TestConfig {
    pub fn directory(&self) -> &str {
        self.directory.as_deref().unwrap_or(SANDBOX_ROOT)
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit.map(Duration::from_secs)
    }

    pub fn is_failing(&self) -> bool {
        self.outcome == ExpectedOutcome::Failing
    }
}

/// Order tests so the ones most likely to reject a candidate run first:
/// failing tests before passing ones, then cheapest first. Tests without
/// a cost run last within their group; ties keep file order.
pub fn order_tests(tests: &mut [TestConfig]) {
    tests.sort_by(|a, b| {
        b.is_failing()
            .cmp(&a.is_failing())
            .then_with(|| {
                let cost = |t: &TestConfig| t.cost.unwrap_or(f64::INFINITY);
                cost(a).total_cmp(&cost(b))
            })
    });
}

/// A source line, used to group candidates that modify the same place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileLine {
    pub file: String,
    pub line: usize,
}

impl fmt::Display for FileLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A line-level edit to a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineEdit {
    /// File path relative to the source directory.
    pub file: String,
    /// One-based line number.
    pub line: usize,
    #[serde(flatten)]
    pub kind: EditKind,
}

/// What a [`LineEdit`] does to its line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EditKind {
    /// Remove the line.
    Delete,
    /// Replace the line with new text.
    Replace { text: String },
    /// Insert new text after the line.
    Append { text: String },
}

impl LineEdit {
    pub fn file_line(&self) -> FileLine {
        FileLine {
            file: self.file.clone(),
            line: self.line,
        }
    }
}

impl fmt::Display for LineEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EditKind::Delete => write!(f, "delete {}:{}", self.file, self.line),
            EditKind::Replace { text } => {
                write!(f, "replace {}:{} with {:?}", self.file, self.line, text)
            }
            EditKind::Append { text } => {
                write!(f, "append {:?} after {}:{}", text, self.file, self.line)
            }
        }
    }
}

impl ProblemConfig {
    /// Load and validate a problem file.
    pub fn from_file(path: &Path) -> Result<Self, ProblemConfigError> {
        let contents = fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&contents)?;

        if config.source_directory.is_relative()
            && let Some(parent) = path.parent()
        {
            config.source_directory = parent.join(&config.source_directory);
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse the build instructions, with steps defaulting to the sandbox root.
    pub fn build_instructions(
        &self,
    ) -> Result<(BuildInstructions, BuildInstructions), BuildConfigError> {
        BuildInstructions::from_value(&self.build_instructions, SANDBOX_ROOT)
    }

    /// Validate problem configuration.
    pub fn validate(&self) -> Result<(), ProblemConfigError> {
        self.build_instructions()?;
        self.search.validate()?;

        if self.tests.is_empty() {
            return Err(ProblemConfigError::NoTests);
        }
        if !self.tests.iter().any(TestConfig::is_failing) {
            return Err(ProblemConfigError::NoFailingTests);
        }
        if self.transformations.is_empty() {
            return Err(ProblemConfigError::NoTransformations);
        }
        for edit in &self.transformations {
            if edit.line == 0 {
                return Err(ProblemConfigError::InvalidLine(edit.file_line()));
            }
        }
        Ok(())
    }
}

/// Problem configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ProblemConfigError {
    #[error("Failed to read problem file: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to parse problem file: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Build(#[from] BuildConfigError),
    #[error("Search config validation failed: {0}")]
    Search(#[from] SearchConfigError),
    #[error("Problem must list at least one test")]
    NoTests,
    #[error("Problem must list at least one failing test")]
    NoFailingTests,
    #[error("Problem must list at least one transformation")]
    NoTransformations,
    #[error("Line {0} does not exist")]
    InvalidLine(FileLine),
    #[error("Failed to read source file {path}: {source}")]
    MissingSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
