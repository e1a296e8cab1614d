//! Relationship fixup.
//!
//! Turns the gathered [`RelationshipDiff`] into child list edits. Each affected
//! parent is an independent unit of work and parents are processed in chunks on
//! the compute task pool. Work items only read child lists; their edits are
//! staged in per-chunk [`EditLog`]s, merged, and played back once at the next
//! sync point so child list creation and destruction never race.

use bevy_ecs::entity_disabling::Disabled;
use bevy_ecs::prelude::*;
use bevy_tasks::{ComputeTaskPool, TaskPool};

use crate::components::childlist::ChildList;
use crate::editlog::{EditLog, HierarchyEdit};
use crate::resources::hierarchyconfig::HierarchyConfig;
use crate::resources::relationshipdiff::{ChildBatch, RelationshipDiff};

/// Stage child list edits for every parent touched by this cycle's diff.
pub fn apply_relationship_fixup(
    mut commands: Commands,
    config: Res<HierarchyConfig>,
    diff: Res<RelationshipDiff>,
    lists: Query<&ChildList, Allow<Disabled>>,
) {
    if diff.is_empty() {
        return;
    }

    let parents = diff.affected_parents();
    let diff = &*diff;
    let lists = &lists;

    let task_pool = ComputeTaskPool::get_or_init(TaskPool::default);
    let logs = task_pool.scope(|scope| {
        for chunk in parents.chunks(config.chunk_size()) {
            scope.spawn(async move {
                let mut log = EditLog::new();
                for &parent in chunk {
                    fixup_parent(parent, diff, lists, &mut log);
                }
                log
            });
        }
    });

    let mut log = EditLog::new();
    for chunk_log in logs {
        log.merge(chunk_log);
    }
    log.extend(
        diff.adopted()
            .iter()
            .map(|&(child, parent)| HierarchyEdit::RecordPreviousParent { child, parent }),
    );
    log.extend(
        diff.dissolved()
            .iter()
            .map(|&child| HierarchyEdit::ForgetPreviousParent { child }),
    );
    log.queue(&mut commands);
}

/// Stage the edits for one parent.
///
/// A list losing every member with nothing to gain is destroyed outright
/// instead of being emptied. Additions already present are skipped, as are
/// duplicates within the batch. A child both leaving and joining the same
/// parent stays where it is.
pub(crate) fn fixup_parent(
    parent: Entity,
    diff: &RelationshipDiff,
    lists: &Query<&ChildList, Allow<Disabled>>,
    log: &mut EditLog,
) {
    let additions = diff.additions(parent);
    let removals = diff.removals(parent);
    let existing = lists.get(parent).ok();

    let mut departing = ChildBatch::new();
    if let Some(list) = existing {
        for &child in removals {
            if list.contains(child) && !additions.contains(&child) && !departing.contains(&child)
            {
                departing.push(child);
            }
        }
    }

    let mut arriving = ChildBatch::new();
    for &child in additions {
        let listed = existing.is_some_and(|list| list.contains(child));
        if !listed && !arriving.contains(&child) {
            arriving.push(child);
        }
    }

    match existing {
        Some(list) => {
            if departing.len() == list.len() && arriving.is_empty() {
                log.push(HierarchyEdit::DestroyList { parent });
                return;
            }
            // Append before removing so the list never passes through empty.
            if !arriving.is_empty() {
                log.push(HierarchyEdit::AddChildren {
                    parent,
                    children: arriving,
                });
            }
            if !departing.is_empty() {
                log.push(HierarchyEdit::RemoveChildren {
                    parent,
                    children: departing,
                });
            }
        }
        None => {
            if !arriving.is_empty() {
                log.push(HierarchyEdit::CreateList {
                    parent,
                    children: arriving,
                });
            }
        }
    }
}
