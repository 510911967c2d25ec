//! The pool of untried candidates, grouped by location.

use std::collections::HashMap;
use std::hash::Hash;

use rand::prelude::*;

/// Chooses which location the next candidate is drawn from.
pub trait LocationSelector<L>: Send + Sync {
    /// Return an index into `locations`, which is never empty.
    fn select(&self, locations: &[L], rng: &mut dyn RngCore) -> usize;
}

/// Picks every remaining location with equal probability.
///
/// A weighted strategy driven by fault localization can replace this
/// without touching the scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformSelector;

impl<L> LocationSelector<L> for UniformSelector {
    fn select(&self, locations: &[L], rng: &mut dyn RngCore) -> usize {
        rng.gen_range(0..locations.len())
    }
}

/// Untried candidates, stacked per location.
///
/// Every location present has at least one candidate; a location is removed
/// as soon as its last candidate is taken. Nothing is ever added once the
/// pool is built.
#[derive(Debug, Clone)]
pub struct CandidatePool<L, C> {
    locations: Vec<L>,
    stacks: Vec<Vec<C>>,
}

impl<L: Clone + Eq + Hash, C> CandidatePool<L, C> {
    /// Group candidates by location, keeping first-seen location order, and
    /// shuffle each location's stack.
    pub fn from_candidates<I>(candidates: I, rng: &mut dyn RngCore) -> Self
    where
        I: IntoIterator<Item = (L, C)>,
    {
        let mut pool = Self::from_stacks(Vec::new());
        let mut index: HashMap<L, usize> = HashMap::new();

        for (location, candidate) in candidates {
            let slot = *index.entry(location.clone()).or_insert_with(|| {
                pool.locations.push(location);
                pool.stacks.push(Vec::new());
                pool.stacks.len() - 1
            });
            pool.stacks[slot].push(candidate);
        }

        for stack in &mut pool.stacks {
            stack.shuffle(rng);
        }
        pool
    }

    /// Build a pool from pre-ordered stacks; the last candidate of a stack is
    /// taken first. Empty stacks are dropped.
    pub fn from_stacks(stacks: Vec<(L, Vec<C>)>) -> Self {
        let (locations, stacks) = stacks
            .into_iter()
            .filter(|(_, stack)| !stack.is_empty())
            .unzip();
        Self { locations, stacks }
    }

    /// Take one candidate from the location chosen by `selector`, or `None`
    /// if the pool is empty.
    pub fn pop(
        &mut self,
        selector: &dyn LocationSelector<L>,
        rng: &mut dyn RngCore,
    ) -> Option<C> {
        if self.locations.is_empty() {
            return None;
        }

        let slot = selector.select(&self.locations, rng);
        debug_assert!(slot < self.locations.len(), "selector returned {slot}");
        let slot = slot.min(self.locations.len() - 1);

        let candidate = self.stacks[slot].pop();
        if self.stacks[slot].is_empty() {
            self.locations.swap_remove(slot);
            self.stacks.swap_remove(slot);
        }
        candidate
    }

    /// Remaining locations.
    pub fn locations(&self) -> &[L] {
        &self.locations
    }

    /// Number of untried candidates at a location.
    pub fn remaining_at(&self, location: &L) -> usize {
        self.locations
            .iter()
            .position(|l| l == location)
            .map_or(0, |slot| self.stacks[slot].len())
    }

    /// Total number of untried candidates.
    pub fn len(&self) -> usize {
        self.stacks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
