//! Staged structural edits to the hierarchy.
//!
//! Parallel passes never touch [`ChildList`] or [`PreviousParentRef`] storage
//! directly. Each work item fills its own [`EditLog`]; the logs are merged and
//! played back once, on a single thread, through a queued command. Playback is
//! tolerant of anything that changed after the log was built: edits against
//! despawned entities are skipped, removing a missing child is a no-op, and
//! appending a present child is a no-op.

use bevy_ecs::prelude::*;
use log::trace;

use crate::components::childlist::ChildList;
use crate::components::parent::{ParentRef, PreviousParentRef};
use crate::resources::hierarchystats::HierarchyStats;
use crate::resources::relationshipdiff::ChildBatch;

/// One staged edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyEdit {
    /// Give `parent` a fresh child list holding `children`.
    CreateList { parent: Entity, children: ChildBatch },
    /// Append `children` to an existing list.
    AddChildren { parent: Entity, children: ChildBatch },
    /// Remove `children` from `parent`'s list, destroying it if it empties.
    RemoveChildren { parent: Entity, children: ChildBatch },
    /// Remove `parent`'s list outright.
    DestroyList { parent: Entity },
    RecordPreviousParent { child: Entity, parent: Entity },
    ForgetPreviousParent { child: Entity },
    /// Demote `child` to a root. With `forget_previous` unset the shadow parent
    /// is kept so the next diff can still detach it from its old list.
    Unparent { child: Entity, forget_previous: bool },
}

/// What a playback actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub lists_created: usize,
    pub lists_destroyed: usize,
    pub children_added: usize,
    pub children_removed: usize,
    pub unparented: usize,
    pub skipped: usize,
}

impl PlaybackSummary {
    /// Fold the counts into the cycle statistics.
    pub fn apply_to(&self, stats: &mut HierarchyStats) {
        stats.lists_created += self.lists_created;
        stats.lists_destroyed += self.lists_destroyed;
        stats.additions += self.children_added;
        stats.removals += self.children_removed;
    }
}

/// An ordered list of staged edits.
#[derive(Debug, Default, Clone)]
pub struct EditLog {
    edits: Vec<HierarchyEdit>,
}

impl EditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, edit: HierarchyEdit) {
        self.edits.push(edit);
    }

    /// Append another log's edits after this one's.
    pub fn merge(&mut self, mut other: EditLog) {
        self.edits.append(&mut other.edits);
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn edits(&self) -> &[HierarchyEdit] {
        &self.edits
    }

    /// Queue playback at the next sync point and fold the summary into
    /// [`HierarchyStats`] if that resource exists.
    pub fn queue(self, commands: &mut Commands) {
        if self.is_empty() {
            return;
        }
        commands.queue(move |world: &mut World| {
            let summary = self.playback(world);
            if let Some(mut stats) = world.get_resource_mut::<HierarchyStats>() {
                summary.apply_to(&mut stats);
            }
        });
    }

    /// Apply every edit in order.
    pub fn playback(self, world: &mut World) -> PlaybackSummary {
        let mut summary = PlaybackSummary::default();
        for edit in self.edits {
            apply_edit(world, edit, &mut summary);
        }
        trace!("edit log playback: {:?}", summary);
        summary
    }
}

impl Extend<HierarchyEdit> for EditLog {
    fn extend<T: IntoIterator<Item = HierarchyEdit>>(&mut self, iter: T) {
        self.edits.extend(iter);
    }
}

fn apply_edit(world: &mut World, edit: HierarchyEdit, summary: &mut PlaybackSummary) {
    match edit {
        HierarchyEdit::CreateList { parent, children } => {
            let Ok(mut entity) = world.get_entity_mut(parent) else {
                summary.skipped += 1;
                return;
            };
            // A list may already exist if another edit in this playback made one.
            if let Some(mut list) = entity.get_mut::<ChildList>() {
                summary.children_added += push_all(&mut list, &children);
                return;
            }
            let list = ChildList::from_children(children);
            if list.is_empty() {
                return;
            }
            summary.children_added += list.len();
            summary.lists_created += 1;
            entity.insert(list);
        }
        HierarchyEdit::AddChildren { parent, children } => {
            let Ok(mut entity) = world.get_entity_mut(parent) else {
                summary.skipped += 1;
                return;
            };
            if let Some(mut list) = entity.get_mut::<ChildList>() {
                summary.children_added += push_all(&mut list, &children);
            } else {
                let list = ChildList::from_children(children);
                summary.children_added += list.len();
                summary.lists_created += 1;
                entity.insert(list);
            }
        }
        HierarchyEdit::RemoveChildren { parent, children } => {
            let Ok(mut entity) = world.get_entity_mut(parent) else {
                summary.skipped += 1;
                return;
            };
            let Some(mut list) = entity.get_mut::<ChildList>() else {
                return;
            };
            let mut removed = 0;
            for &child in &children {
                if list.remove(child) {
                    removed += 1;
                }
            }
            let emptied = list.is_empty();
            summary.children_removed += removed;
            if emptied {
                entity.remove::<ChildList>();
                summary.lists_destroyed += 1;
            }
        }
        HierarchyEdit::DestroyList { parent } => {
            let Ok(mut entity) = world.get_entity_mut(parent) else {
                summary.skipped += 1;
                return;
            };
            if let Some(list) = entity.take::<ChildList>() {
                summary.children_removed += list.len();
                summary.lists_destroyed += 1;
            }
        }
        HierarchyEdit::RecordPreviousParent { child, parent } => {
            let Ok(mut entity) = world.get_entity_mut(child) else {
                summary.skipped += 1;
                return;
            };
            // Only record what is still true at playback time.
            if entity.get::<ParentRef>().map(ParentRef::get) == Some(parent) {
                entity.insert(PreviousParentRef(parent));
            }
        }
        HierarchyEdit::ForgetPreviousParent { child } => {
            let Ok(mut entity) = world.get_entity_mut(child) else {
                summary.skipped += 1;
                return;
            };
            if !entity.contains::<ParentRef>() {
                entity.remove::<PreviousParentRef>();
            }
        }
        HierarchyEdit::Unparent {
            child,
            forget_previous,
        } => {
            let Ok(mut entity) = world.get_entity_mut(child) else {
                summary.skipped += 1;
                return;
            };
            entity.remove::<ParentRef>();
            if forget_previous {
                entity.remove::<PreviousParentRef>();
            }
            summary.unparented += 1;
        }
    }
}

fn push_all(list: &mut Mut<ChildList>, children: &[Entity]) -> usize {
    let mut added = 0;
    for &child in children {
        if !list.contains(child) {
            list.push_unique(child);
            added += 1;
        }
    }
    added
}

/// Build a [`ChildBatch`] from any iterator of entities.
pub fn batch(children: impl IntoIterator<Item = Entity>) -> ChildBatch {
    children.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_of(edits: impl IntoIterator<Item = HierarchyEdit>) -> EditLog {
        let mut log = EditLog::new();
        log.extend(edits);
        log
    }

    #[test]
    fn test_create_list_and_dedup() {
        let mut world = World::new();
        let p = world.spawn_empty().id();
        let a = world.spawn_empty().id();

        let summary = log_of([HierarchyEdit::CreateList {
            parent: p,
            children: batch([a, a]),
        }])
        .playback(&mut world);

        assert_eq!(world.get::<ChildList>(p).unwrap().as_slice(), &[a]);
        assert_eq!(summary.lists_created, 1);
        assert_eq!(summary.children_added, 1);
    }

    #[test]
    fn test_add_to_existing_list_skips_present() {
        let mut world = World::new();
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();
        let p = world.spawn(ChildList::from_children([a])).id();

        let summary = log_of([HierarchyEdit::AddChildren {
            parent: p,
            children: batch([a, b]),
        }])
        .playback(&mut world);

        assert_eq!(world.get::<ChildList>(p).unwrap().len(), 2);
        assert_eq!(summary.children_added, 1);
        assert_eq!(summary.lists_created, 0);
    }

    #[test]
    fn test_remove_missing_child_is_noop() {
        let mut world = World::new();
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();
        let p = world.spawn(ChildList::from_children([a])).id();

        let summary = log_of([HierarchyEdit::RemoveChildren {
            parent: p,
            children: batch([b]),
        }])
        .playback(&mut world);

        assert_eq!(world.get::<ChildList>(p).unwrap().as_slice(), &[a]);
        assert_eq!(summary.children_removed, 0);
    }

    #[test]
    fn test_remove_last_child_destroys_list() {
        let mut world = World::new();
        let a = world.spawn_empty().id();
        let p = world.spawn(ChildList::from_children([a])).id();

        let summary = log_of([HierarchyEdit::RemoveChildren {
            parent: p,
            children: batch([a]),
        }])
        .playback(&mut world);

        assert!(world.get::<ChildList>(p).is_none());
        assert_eq!(summary.lists_destroyed, 1);
    }

    #[test]
    fn test_edits_against_despawned_entities_are_skipped() {
        let mut world = World::new();
        let p = world.spawn_empty().id();
        let a = world.spawn_empty().id();
        world.despawn(p);

        let summary = log_of([
            HierarchyEdit::CreateList {
                parent: p,
                children: batch([a]),
            },
            HierarchyEdit::DestroyList { parent: p },
        ])
        .playback(&mut world);

        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.lists_created, 0);
    }

    #[test]
    fn test_unparent_keeps_or_forgets_previous() {
        let mut world = World::new();
        let p = world.spawn_empty().id();
        let keep = world.spawn((ParentRef(p), PreviousParentRef(p))).id();
        let forget = world.spawn((ParentRef(p), PreviousParentRef(p))).id();

        log_of([
            HierarchyEdit::Unparent {
                child: keep,
                forget_previous: false,
            },
            HierarchyEdit::Unparent {
                child: forget,
                forget_previous: true,
            },
        ])
        .playback(&mut world);

        assert!(world.get::<ParentRef>(keep).is_none());
        assert_eq!(world.get::<PreviousParentRef>(keep), Some(&PreviousParentRef(p)));
        assert!(world.get::<ParentRef>(forget).is_none());
        assert!(world.get::<PreviousParentRef>(forget).is_none());
    }

    #[test]
    fn test_record_previous_parent_only_when_still_true() {
        let mut world = World::new();
        let p = world.spawn_empty().id();
        let q = world.spawn_empty().id();
        let c = world.spawn(ParentRef(q)).id();

        log_of([HierarchyEdit::RecordPreviousParent { child: c, parent: p }]).playback(&mut world);
        assert!(world.get::<PreviousParentRef>(c).is_none());

        log_of([HierarchyEdit::RecordPreviousParent { child: c, parent: q }]).playback(&mut world);
        assert_eq!(world.get::<PreviousParentRef>(c), Some(&PreviousParentRef(q)));
    }

    #[test]
    fn test_merge_preserves_order() {
        let mut world = World::new();
        let p = world.spawn_empty().id();
        let a = world.spawn_empty().id();
        let mut first = log_of([HierarchyEdit::DestroyList { parent: p }]);
        let second = log_of([HierarchyEdit::CreateList {
            parent: p,
            children: batch([a]),
        }]);
        first.merge(second);
        assert_eq!(first.len(), 2);
        assert_eq!(first.edits()[0], HierarchyEdit::DestroyList { parent: p });
    }
}
