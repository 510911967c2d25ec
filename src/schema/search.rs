//! Search configuration and result summary types.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for one random search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchConfig {
    /// Number of concurrent workers.
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Stop once the first acceptable patch is found.
    #[serde(default = "default_terminate_early")]
    pub terminate_early: bool,
    /// Wall-clock limit on dispensing candidates, in seconds.
    #[serde(default)]
    pub time_limit: Option<u64>,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            terminate_early: default_terminate_early(),
            time_limit: None,
            seed: None,
        }
    }
}

fn default_threads() -> usize {
    1
}
fn default_terminate_early() -> bool {
    true
}

impl SearchConfig {
    /// The time limit as a duration.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit.map(Duration::from_secs)
    }

    /// Validate search configuration.
    pub fn validate(&self) -> Result<(), SearchConfigError> {
        if self.threads == 0 {
            return Err(SearchConfigError::NoThreads);
        }
        if self.time_limit == Some(0) {
            return Err(SearchConfigError::ZeroTimeLimit);
        }
        Ok(())
    }
}

/// Reason a search run halted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The time limit elapsed before the search space was exhausted.
    TimeLimit,
    /// Every candidate was handed out.
    Exhausted,
    /// An acceptable patch was found and early termination is enabled.
    RepairFound,
    /// An evaluation failed for reasons unrelated to the candidate.
    Error(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimeLimit => write!(f, "reached time limit"),
            Self::Exhausted => write!(f, "exhausted search space"),
            Self::RepairFound => write!(f, "found repair"),
            Self::Error(message) => write!(f, "evaluation error: {message}"),
        }
    }
}

/// Counters collected over a search run.
#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    /// Candidates handed to the evaluation pipeline.
    pub candidates_evaluated: u64,
    /// Individual test executions across all evaluations.
    pub tests_executed: u64,
    /// Wall-clock duration of the run.
    pub elapsed_seconds: f64,
    pub candidates_per_second: f64,
}

impl SearchStats {
    pub(crate) fn new(candidates_evaluated: u64, tests_executed: u64, elapsed: Duration) -> Self {
        let elapsed_seconds = elapsed.as_secs_f64();
        let candidates_per_second = if elapsed_seconds > 0.0 {
            candidates_evaluated as f64 / elapsed_seconds
        } else {
            0.0
        };
        Self {
            candidates_evaluated,
            tests_executed,
            elapsed_seconds,
            candidates_per_second,
        }
    }
}

/// Search configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum SearchConfigError {
    #[error("Search needs at least one thread")]
    NoThreads,
    #[error("Time limit must be positive when set")]
    ZeroTimeLimit,
}
