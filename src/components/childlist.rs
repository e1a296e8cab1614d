//! Children of a parent entity.
//!
//! A [`ChildList`] exists only while its owner has at least one child. It is
//! created, edited, and destroyed exclusively through the relationship fixup
//! edit log, so external code should treat it as read-only.

use bevy_ecs::prelude::*;
use smallvec::SmallVec;

/// Children attached to this entity, in insertion order.
///
/// Membership is unique. Order carries no meaning.
#[derive(Component, Clone, Debug, Default, PartialEq, Eq)]
pub struct ChildList(SmallVec<[Entity; 8]>);

impl ChildList {
    /// Build a list from `children`, dropping duplicates.
    pub fn from_children(children: impl IntoIterator<Item = Entity>) -> Self {
        let mut list = Self::default();
        for child in children {
            list.push_unique(child);
        }
        list
    }

    /// Append `child` unless it is already a member. Returns whether it was added.
    pub fn push_unique(&mut self, child: Entity) -> bool {
        if self.0.contains(&child) {
            return false;
        }
        self.0.push(child);
        true
    }

    /// Remove `child` by value. Returns whether it was present.
    ///
    /// Uses `swap_remove`, so the order of the remaining members may change.
    pub fn remove(&mut self, child: Entity) -> bool {
        match self.0.iter().position(|&e| e == child) {
            Some(index) => {
                self.0.swap_remove(index);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn contains(&self, child: Entity) -> bool {
        self.0.contains(&child)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[Entity] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a ChildList {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities(world: &mut World, n: usize) -> Vec<Entity> {
        (0..n).map(|_| world.spawn_empty().id()).collect()
    }

    #[test]
    fn test_from_children_dedups() {
        let mut world = World::new();
        let e = entities(&mut world, 2);
        let list = ChildList::from_children([e[0], e[1], e[0]]);
        assert_eq!(list.len(), 2);
        assert_eq!(list.as_slice(), &[e[0], e[1]]);
    }

    #[test]
    fn test_push_unique() {
        let mut world = World::new();
        let e = entities(&mut world, 1);
        let mut list = ChildList::default();
        assert!(list.push_unique(e[0]));
        assert!(!list.push_unique(e[0]));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut world = World::new();
        let e = entities(&mut world, 3);
        let mut list = ChildList::from_children([e[0], e[1]]);
        assert!(!list.remove(e[2]));
        assert_eq!(list.len(), 2);
        assert!(list.remove(e[0]));
        assert!(!list.contains(e[0]));
        assert!(list.contains(e[1]));
    }

    #[test]
    fn test_remove_last_leaves_empty() {
        let mut world = World::new();
        let e = entities(&mut world, 1);
        let mut list = ChildList::from_children([e[0]]);
        list.remove(e[0]);
        assert!(list.is_empty());
    }
}
