//! Relationship changes gathered during one update cycle.
//!
//! Filled by [`gather_relationship_diff`](crate::systems::relationship_diff::gather_relationship_diff)
//! and consumed by [`apply_relationship_fixup`](crate::systems::relationship_fixup::apply_relationship_fixup).
//! Cleared at the start of every gather, so it only ever describes the most
//! recent cycle.

use bevy_ecs::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Children staged for one parent.
pub type ChildBatch = SmallVec<[Entity; 4]>;

/// One relationship edge discovered by a parallel gather batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffRecord {
    /// `child` should be appended to `parent`'s list.
    Add { parent: Entity, child: Entity },
    /// `child` should be taken out of `parent`'s list.
    Remove { parent: Entity, child: Entity },
    /// `child` was seen with a parent for the first time.
    Adopted { child: Entity, parent: Entity },
    /// `child` lost its parent and its shadow copy should go.
    Dissolved { child: Entity },
}

/// Parent → children maps plus the set of parents needing fixup.
#[derive(Resource, Debug, Default)]
pub struct RelationshipDiff {
    to_add: FxHashMap<Entity, ChildBatch>,
    to_remove: FxHashMap<Entity, ChildBatch>,
    affected: FxHashSet<Entity>,
    adopted: Vec<(Entity, Entity)>,
    dissolved: Vec<Entity>,
}

impl RelationshipDiff {
    pub fn clear(&mut self) {
        self.to_add.clear();
        self.to_remove.clear();
        self.affected.clear();
        self.adopted.clear();
        self.dissolved.clear();
    }

    /// Fold one gathered record into the maps.
    pub fn record(&mut self, record: DiffRecord) {
        match record {
            DiffRecord::Add { parent, child } => {
                self.to_add.entry(parent).or_default().push(child);
                self.affected.insert(parent);
            }
            DiffRecord::Remove { parent, child } => {
                self.to_remove.entry(parent).or_default().push(child);
                self.affected.insert(parent);
            }
            DiffRecord::Adopted { child, parent } => self.adopted.push((child, parent)),
            DiffRecord::Dissolved { child } => self.dissolved.push(child),
        }
    }

    pub fn additions(&self, parent: Entity) -> &[Entity] {
        self.to_add.get(&parent).map_or(&[], |batch| batch.as_slice())
    }

    pub fn removals(&self, parent: Entity) -> &[Entity] {
        self.to_remove.get(&parent).map_or(&[], |batch| batch.as_slice())
    }

    /// Every parent with pending additions or removals, sorted so work item
    /// boundaries are stable between runs.
    pub fn affected_parents(&self) -> Vec<Entity> {
        let mut parents: Vec<Entity> = self.affected.iter().copied().collect();
        parents.sort_unstable();
        parents
    }

    /// `(child, parent)` pairs that need a shadow parent recorded.
    pub fn adopted(&self) -> &[(Entity, Entity)] {
        &self.adopted
    }

    /// Children whose shadow parent should be dropped.
    pub fn dissolved(&self) -> &[Entity] {
        &self.dissolved
    }

    pub fn is_empty(&self) -> bool {
        self.affected.is_empty() && self.adopted.is_empty() && self.dissolved.is_empty()
    }

    pub fn addition_count(&self) -> usize {
        self.to_add.values().map(|batch| batch.len()).sum()
    }

    pub fn removal_count(&self) -> usize {
        self.to_remove.values().map(|batch| batch.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_collects_affected_parents_once() {
        let mut world = World::new();
        let p = world.spawn_empty().id();
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();

        let mut diff = RelationshipDiff::default();
        diff.record(DiffRecord::Add { parent: p, child: a });
        diff.record(DiffRecord::Remove { parent: p, child: b });

        assert_eq!(diff.affected_parents(), vec![p]);
        assert_eq!(diff.additions(p), &[a]);
        assert_eq!(diff.removals(p), &[b]);
        assert_eq!(diff.addition_count(), 1);
        assert_eq!(diff.removal_count(), 1);
    }

    #[test]
    fn test_unknown_parent_has_no_work() {
        let mut world = World::new();
        let p = world.spawn_empty().id();
        let diff = RelationshipDiff::default();
        assert!(diff.additions(p).is_empty());
        assert!(diff.removals(p).is_empty());
        assert!(diff.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut world = World::new();
        let p = world.spawn_empty().id();
        let c = world.spawn_empty().id();
        let mut diff = RelationshipDiff::default();
        diff.record(DiffRecord::Add { parent: p, child: c });
        diff.record(DiffRecord::Adopted { child: c, parent: p });
        diff.record(DiffRecord::Dissolved { child: c });
        diff.clear();
        assert!(diff.is_empty());
        assert!(diff.adopted().is_empty());
        assert!(diff.dissolved().is_empty());
    }
}
