//! Engine module - Candidate scheduling and evaluation.

mod build;
mod candidate;
mod observer;
mod pool;
mod search;

pub use build::*;
pub use candidate::*;
pub use observer::*;
pub use pool::*;
pub use search::*;
