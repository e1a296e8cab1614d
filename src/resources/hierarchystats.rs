//! Counters describing the most recent update cycle.

use bevy_ecs::prelude::*;
use serde::Serialize;

/// Per-cycle work counters, reset by the orphan pass at the start of every
/// cycle. Useful for logging and for asserting that an idle cycle wrote
/// nothing.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HierarchyStats {
    /// Number of cycles run so far, including the current one.
    pub cycle: u64,
    /// Children demoted to roots because their parent was despawned.
    pub orphaned: usize,
    /// Entities demoted to roots to break a parent cycle.
    pub cycles_broken: usize,
    /// Despawned entities pruned from child lists.
    pub pruned: usize,
    /// Child list entries dropped by propagation because the child names
    /// another parent.
    pub mismatched: usize,
    /// Children appended to child lists.
    pub additions: usize,
    /// Children removed from child lists.
    pub removals: usize,
    pub lists_created: usize,
    pub lists_destroyed: usize,
    /// Root world transforms actually rewritten.
    pub roots_written: usize,
    /// Child world transforms actually rewritten.
    pub children_written: usize,
}

impl HierarchyStats {
    /// Advance the cycle counter and zero the per-cycle counts.
    pub fn begin_cycle(&mut self) {
        *self = Self {
            cycle: self.cycle + 1,
            ..Self::default()
        };
    }

    /// Total world transforms written this cycle.
    pub fn transforms_written(&self) -> usize {
        self.roots_written + self.children_written
    }

    /// Whether this cycle changed the hierarchy structure.
    pub fn structure_changed(&self) -> bool {
        self.additions + self.removals + self.lists_created + self.lists_destroyed > 0
    }
}
