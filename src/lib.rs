//! Repair Search - Randomized search for patches that repair a program.
//!
//! A problem provides a space of transformations (candidate edits) and a
//! test suite. The search evaluates candidates in parallel, each in a fresh
//! execution environment: apply the patch, build it, and run the tests until
//! one fails. Candidates that build and pass every test are repairs.
//!
//! # Architecture
//!
//! - `schema`: Configuration types (build instructions, problem files,
//!   search settings)
//! - `engine`: Candidate pool, build execution, and the random search
//! - `environment`: Execution environment traits and a local, sandboxed
//!   implementation
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use repair_search::{LocalProblem, LocalProvider, RandomSearch};
//!
//! let problem = LocalProblem::load(Path::new("problem.json")).unwrap();
//! let config = problem.search_config().clone();
//!
//! let search = RandomSearch::from_config(LocalProvider::new(), problem, &config).unwrap();
//! let report = search.run(config.seed).unwrap();
//!
//! for repair in &report.repairs {
//!     println!("{}\n{}", repair.candidate, repair.patch);
//! }
//! println!("Stopped: {}", report.stop_reason);
//! ```

pub mod engine;
pub mod environment;
pub mod schema;

// Re-export commonly used types
pub use engine::{Candidate, Patch, RandomSearch, Repair, SearchReport};
pub use environment::{LocalProblem, LocalProvider};
pub use schema::{BuildInstructions, BuildStep, SearchConfig, StopReason};
