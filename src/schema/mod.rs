//! Schema module - Configuration and result types for patch search.

mod build;
mod problem;
mod search;

pub use build::*;
pub use problem::*;
pub use search::*;
