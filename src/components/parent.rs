//! Parent references for hierarchical entities.
//!
//! [`ParentRef`] is the authored side of a relationship: gameplay or tooling
//! inserts, replaces, or removes it. [`PreviousParentRef`] is the shadow copy
//! kept by relationship maintenance so it can tell which parent an entity
//! left when its [`ParentRef`] changes or disappears.
//!
//! Neither component should be mirrored by hand into a
//! [`ChildList`](super::childlist::ChildList); the maintenance systems in
//! [`crate::systems`] derive child lists once per update cycle.

use bevy_ecs::prelude::*;

/// The parent this entity is attached to.
///
/// Absence means the entity is a root. The referenced entity may be despawned
/// at any time; the orphan pass demotes the child back to a root when that
/// happens.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParentRef(pub Entity);

impl ParentRef {
    /// The referenced parent entity.
    #[inline]
    pub fn get(&self) -> Entity {
        self.0
    }
}

/// The parent last observed by relationship maintenance.
///
/// Owned by the hierarchy systems: created the first time an entity is seen
/// with a [`ParentRef`], overwritten when it is reparented, and removed once a
/// detached entity has been taken out of its old parent's child list.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PreviousParentRef(pub Entity);

impl PreviousParentRef {
    #[inline]
    pub fn get(&self) -> Entity {
        self.0
    }
}

/// Query filter matching entities whose membership changed since the querying
/// system last ran (adopted or reparented).
///
/// Dependent systems can react to structural changes without re-deriving the
/// relationship diff:
///
/// ```ignore
/// fn react(moved: Query<Entity, JustReparented>) { /* ... */ }
/// ```
pub type JustReparented = Changed<PreviousParentRef>;

/// Marker for relationships that are built once and never edited.
///
/// Entities carrying this marker are ignored by diff gathering: they never get
/// a [`PreviousParentRef`] and whoever spawns them is responsible for their
/// parent's [`ChildList`](super::childlist::ChildList). They are still
/// propagated, and still demoted to roots if their parent is despawned.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct StaticHierarchy;
