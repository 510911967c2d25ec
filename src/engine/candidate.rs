//! Candidates, patches, and the problem description they are evaluated against.

use std::fmt;
use std::hash::Hash;

use crate::environment::EnvironmentError;

/// A single modification to the program under repair.
pub trait Transformation: fmt::Debug + fmt::Display + Clone + Send + Sync {
    /// Where in the program the modification applies.
    type Location: fmt::Debug + Clone + Eq + Hash + Send + Sync;

    fn location(&self) -> Self::Location;
}

/// An immutable, non-empty sequence of transformations applied together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<T> {
    transformations: Vec<T>,
}

impl<T: Transformation> Candidate<T> {
    /// A candidate made of a single transformation.
    pub fn single(transformation: T) -> Self {
        Self {
            transformations: vec![transformation],
        }
    }

    /// A candidate made of several transformations; `None` if there are none.
    pub fn new(transformations: Vec<T>) -> Option<Self> {
        if transformations.is_empty() {
            None
        } else {
            Some(Self { transformations })
        }
    }

    pub fn transformations(&self) -> &[T] {
        &self.transformations
    }

    /// Location key used to group this candidate: that of its first
    /// transformation.
    pub fn location(&self) -> T::Location {
        self.transformations[0].location()
    }
}

impl<T: Transformation> fmt::Display for Candidate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Candidate<")?;
        for (i, transformation) in self.transformations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{transformation}")?;
        }
        write!(f, ">")
    }
}

/// A unified diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch(String);

impl Patch {
    pub fn new(diff: impl Into<String>) -> Self {
        Self(diff.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Description of the program under repair, as seen by the search.
pub trait Problem: Send + Sync {
    type Transformation: Transformation;
    type Test: fmt::Display + Send + Sync;

    /// Every transformation in the search space.
    fn transformations(&self) -> Vec<Self::Transformation>;

    /// Tests, in the order they should be executed.
    fn tests(&self) -> &[Self::Test];

    /// Compute the patch that realizes a candidate.
    fn diff(&self, candidate: &Candidate<Self::Transformation>) -> Result<Patch, EnvironmentError>;
}
