//! Repairing a program that lives in a local directory.
//!
//! Each environment is a temporary copy of the source tree. Patches are
//! applied with `patch(1)`, and build steps and tests run through a
//! [`LocalShell`] rooted at the copy.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info};
use similar::TextDiff;
use tempfile::{NamedTempFile, TempDir};
use walkdir::WalkDir;

use super::{
    CompileOutcome, Environment, EnvironmentError, EnvironmentProvider, LocalShell, Shell,
    TestOutcome,
};
use crate::engine::{BuildError, Candidate, Patch, Problem, Transformation};
use crate::schema::{
    BuildInstructions, EditKind, FileLine, LineEdit, ProblemConfig, ProblemConfigError,
    SANDBOX_ROOT, SearchConfig, TestConfig, order_tests,
};

/// Lines of unchanged context around each hunk.
const DIFF_CONTEXT: usize = 3;

impl Transformation for LineEdit {
    type Location = FileLine;

    fn location(&self) -> FileLine {
        self.file_line()
    }
}

/// A test run as a shell command inside the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellTest {
    pub name: String,
    pub command: String,
    /// Working directory, relative to the sandbox root unless absolute.
    pub directory: String,
    pub time_limit: Option<Duration>,
}

impl From<TestConfig> for ShellTest {
    fn from(config: TestConfig) -> Self {
        Self {
            directory: config.directory().to_string(),
            time_limit: config.time_limit(),
            name: config.name,
            command: config.command,
        }
    }
}

impl fmt::Display for ShellTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A program on disk together with its tests and line edits.
#[derive(Debug, Clone)]
pub struct LocalProblem {
    source_directory: PathBuf,
    build: BuildInstructions,
    build_for_coverage: BuildInstructions,
    tests: Vec<ShellTest>,
    transformations: Vec<LineEdit>,
    /// Original contents of every file touched by a transformation.
    sources: HashMap<String, String>,
    search: SearchConfig,
}

impl LocalProblem {
    /// Load a problem file.
    pub fn load(path: &Path) -> Result<Self, ProblemConfigError> {
        Self::from_config(ProblemConfig::from_file(path)?)
    }

    /// Read the sources the transformations refer to and check that every
    /// edited line exists.
    pub fn from_config(config: ProblemConfig) -> Result<Self, ProblemConfigError> {
        config.validate()?;
        let (build, build_for_coverage) = config.build_instructions()?;

        let mut sources: HashMap<String, String> = HashMap::new();
        for edit in &config.transformations {
            if !sources.contains_key(&edit.file) {
                let path = config.source_directory.join(&edit.file);
                let contents = fs::read_to_string(&path)
                    .map_err(|source| ProblemConfigError::MissingSource { path, source })?;
                sources.insert(edit.file.clone(), contents);
            }

            let lines = sources[&edit.file].lines().count();
            if edit.line > lines {
                return Err(ProblemConfigError::InvalidLine(edit.file_line()));
            }
        }

        debug!(
            "Loaded {} transformations over {} files in {}",
            config.transformations.len(),
            sources.len(),
            config.source_directory.display()
        );

        let mut tests = config.tests;
        order_tests(&mut tests);
        info!(
            "Test order: {}",
            tests
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            source_directory: config.source_directory,
            build,
            build_for_coverage,
            tests: tests.into_iter().map(ShellTest::from).collect(),
            transformations: config.transformations,
            sources,
            search: config.search,
        })
    }

    pub fn source_directory(&self) -> &Path {
        &self.source_directory
    }

    pub fn build_instructions(&self) -> &BuildInstructions {
        &self.build
    }

    /// Build instructions for a coverage-instrumented build.
    pub fn build_instructions_for_coverage(&self) -> &BuildInstructions {
        &self.build_for_coverage
    }

    /// Search settings from the problem file.
    pub fn search_config(&self) -> &SearchConfig {
        &self.search
    }
}

impl Problem for LocalProblem {
    type Transformation = LineEdit;
    type Test = ShellTest;

    fn transformations(&self) -> Vec<LineEdit> {
        self.transformations.clone()
    }

    fn tests(&self) -> &[ShellTest] {
        &self.tests
    }

    /// One unified diff section per edited file, in path order.
    fn diff(&self, candidate: &Candidate<LineEdit>) -> Result<Patch, EnvironmentError> {
        let mut by_file: BTreeMap<&str, Vec<&LineEdit>> = BTreeMap::new();
        for edit in candidate.transformations() {
            by_file.entry(edit.file.as_str()).or_default().push(edit);
        }

        let mut patch = String::new();
        for (file, mut edits) in by_file {
            let original = self
                .sources
                .get(file)
                .ok_or_else(|| EnvironmentError::UnknownFile(file.to_string()))?;
            let modified = apply_edits(file, original, &mut edits)?;

            let diff = TextDiff::from_lines(original.as_str(), modified.as_str());
            patch.push_str(
                &diff
                    .unified_diff()
                    .context_radius(DIFF_CONTEXT)
                    .header(&format!("a/{file}"), &format!("b/{file}"))
                    .to_string(),
            );
        }
        Ok(Patch::new(patch))
    }
}

/// Apply edits bottom-up so earlier line numbers stay valid.
///
/// Edits of the same line combine: appends and replacements apply before
/// the line is deleted, the last replacement wins, and the line is deleted
/// at most once.
fn apply_edits(
    file: &str,
    original: &str,
    edits: &mut [&LineEdit],
) -> Result<String, EnvironmentError> {
    let mut lines: Vec<String> = original.lines().map(str::to_owned).collect();
    let total = lines.len();
    edits.sort_by(|a, b| b.line.cmp(&a.line).then(rank(&a.kind).cmp(&rank(&b.kind))));

    let mut deleted = None;
    for edit in edits.iter() {
        if edit.line == 0 || edit.line > total {
            return Err(EnvironmentError::LineOutOfRange {
                file: file.to_string(),
                line: edit.line,
            });
        }
        let index = edit.line - 1;
        match &edit.kind {
            EditKind::Append { text } => lines.insert(index + 1, text.clone()),
            EditKind::Replace { text } => lines[index] = text.clone(),
            EditKind::Delete if deleted == Some(index) => {}
            EditKind::Delete => {
                lines.remove(index);
                deleted = Some(index);
            }
        }
    }

    let mut modified = lines.join("\n");
    if original.ends_with('\n') && !lines.is_empty() {
        modified.push('\n');
    }
    Ok(modified)
}

/// Order of same-line edits.
fn rank(kind: &EditKind) -> u8 {
    match kind {
        EditKind::Append { .. } => 0,
        EditKind::Replace { .. } => 1,
        EditKind::Delete => 2,
    }
}

/// Provisions sandboxes as temporary copies of the source tree.
#[derive(Debug, Clone, Default)]
pub struct LocalProvider {
    scratch: Option<PathBuf>,
}

impl LocalProvider {
    /// Create sandboxes in the system temporary directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create sandboxes under `directory` instead.
    pub fn in_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            scratch: Some(directory.into()),
        }
    }
}

impl EnvironmentProvider<LocalProblem> for LocalProvider {
    type Environment = LocalEnvironment;

    fn provision(&self, problem: &LocalProblem) -> Result<LocalEnvironment, EnvironmentError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("repair-");
        let sandbox = match &self.scratch {
            Some(directory) => builder.tempdir_in(directory),
            None => builder.tempdir(),
        }
        .map_err(|err| EnvironmentError::Provision(format!("failed to create sandbox: {err}")))?;

        copy_tree(&problem.source_directory, sandbox.path())?;
        debug!(
            "Provisioned sandbox {} from {}",
            sandbox.path().display(),
            problem.source_directory.display()
        );

        Ok(LocalEnvironment {
            shell: LocalShell::new(sandbox.path()),
            sandbox: Some(sandbox),
            build: problem.build.clone(),
        })
    }

    fn destroy(&self, environment: &mut LocalEnvironment) -> Result<(), EnvironmentError> {
        if let Some(sandbox) = environment.sandbox.take() {
            debug!("Removing sandbox {}", sandbox.path().display());
            sandbox.close()?;
        }
        Ok(())
    }
}

fn copy_tree(from: &Path, to: &Path) -> Result<(), EnvironmentError> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|err| EnvironmentError::Provision(err.to_string()))?;
        let target = to.join(relative);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(from)?, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to).map(|_| ())
}

/// A sandboxed copy of the program.
#[derive(Debug)]
pub struct LocalEnvironment {
    shell: LocalShell,
    /// `None` once destroyed.
    sandbox: Option<TempDir>,
    build: BuildInstructions,
}

impl LocalEnvironment {
    /// Root of the sandbox.
    pub fn root(&self) -> &Path {
        self.shell.root()
    }
}

impl Environment for LocalEnvironment {
    type Test = ShellTest;

    fn apply(&mut self, patch: &Patch) -> Result<(), EnvironmentError> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut file = NamedTempFile::new()?;
        file.write_all(patch.as_str().as_bytes())?;
        file.flush()?;

        let command = format!(
            "patch -p1 --batch --forward -i '{}'",
            file.path().display()
        );
        let output = self.shell.run(&command, SANDBOX_ROOT, None)?;
        if !output.success() {
            return Err(EnvironmentError::Patch(output.output));
        }
        Ok(())
    }

    fn compile(&mut self) -> Result<CompileOutcome, EnvironmentError> {
        let start = Instant::now();
        let successful = match self.build.execute(&self.shell) {
            Ok(()) => true,
            Err(BuildError::StepFailed(failed)) => {
                debug!("{}\n{}", failed, failed.output);
                false
            }
            Err(BuildError::Environment(err)) => return Err(err),
        };
        Ok(CompileOutcome {
            successful,
            duration: start.elapsed(),
        })
    }

    fn execute(&mut self, test: &ShellTest) -> Result<TestOutcome, EnvironmentError> {
        let output = self
            .shell
            .run(&test.command, &test.directory, test.time_limit)?;
        debug!(
            "Test {} {} in {:.2?}",
            test.name,
            if output.success() { "passed" } else { "failed" },
            output.duration
        );
        Ok(TestOutcome {
            passed: output.success(),
            duration: output.duration,
        })
    }
}
