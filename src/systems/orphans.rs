//! Orphan reconciliation.
//!
//! First pass of every update cycle. Repairs the structural cases plain
//! diffing can not see, so the diff gatherer only ever looks at a graph whose
//! parents exist:
//!
//! - children whose parent was despawned are demoted to roots,
//! - despawned children are pruned from their parent's [`ChildList`],
//! - parent cycles are broken by demoting one member to a root.
//!
//! All repairs go through one [`EditLog`] played back at the next sync point.
//! Existence is decided by the entity store, so disabled entities are still
//! alive here and every scan includes them.

use bevy_ecs::entity::Entities;
use bevy_ecs::entity_disabling::Disabled;
use bevy_ecs::prelude::*;
use log::{debug, warn};
use rustc_hash::FxHashSet;

use crate::components::childlist::ChildList;
use crate::components::parent::{ParentRef, PreviousParentRef};
use crate::editlog::{EditLog, HierarchyEdit};
use crate::resources::hierarchyconfig::HierarchyConfig;
use crate::resources::hierarchystats::HierarchyStats;
use crate::resources::relationshipdiff::ChildBatch;

/// Demote orphans, prune dead children, and break parent cycles.
///
/// Dangling parents are only searched for across the whole hierarchy when a
/// list owner was despawned since the last run; otherwise just the entities
/// whose [`ParentRef`] changed are checked.
#[allow(clippy::too_many_arguments)]
pub fn reconcile_orphans(
    mut commands: Commands,
    config: Res<HierarchyConfig>,
    mut stats: ResMut<HierarchyStats>,
    entities: &Entities,
    children: Query<(Entity, Ref<ParentRef>, Option<&PreviousParentRef>), Allow<Disabled>>,
    parents: Query<&ParentRef, Allow<Disabled>>,
    lists: Query<(Entity, &ChildList), Allow<Disabled>>,
    mut removed_parent_refs: RemovedComponents<ParentRef>,
    mut removed_lists: RemovedComponents<ChildList>,
) {
    stats.begin_cycle();

    let live = |entity: Entity| entities.contains_spawned(entity);

    let full_scan = removed_lists.read().filter(|&e| !live(e)).count() > 0;
    let dead_children = removed_parent_refs
        .read()
        .filter(|&e| !live(e))
        .count()
        > 0;

    let max_depth = config.max_depth;
    let mut log = EditLog::new();

    // Dangling parents
    let (tx, rx) = crossbeam_channel::unbounded::<(Entity, bool)>();
    children
        .par_iter()
        .batching_strategy(config.batching())
        .for_each(|(entity, parent, previous)| {
            if !full_scan && !parent.is_changed() {
                return;
            }
            if live(parent.0) {
                return;
            }
            // Keep the shadow parent while a live parent may still list us.
            let forget_previous = previous
                .is_none_or(|previous| previous.0 == parent.0 || !live(previous.0));
            tx.send((entity, forget_previous)).ok();
        });
    drop(tx);
    let mut orphaned: Vec<(Entity, bool)> = rx.try_iter().collect();
    orphaned.sort_unstable();
    for &(child, forget_previous) in &orphaned {
        log.push(HierarchyEdit::Unparent {
            child,
            forget_previous,
        });
    }
    stats.orphaned = orphaned.len();

    // Parent cycles
    if config.detect_cycles {
        let mut demoted: FxHashSet<Entity> = orphaned.iter().map(|&(child, _)| child).collect();
        let nothing_demoted = FxHashSet::default();
        let (tx, rx) = crossbeam_channel::unbounded::<Entity>();
        children
            .par_iter()
            .batching_strategy(config.batching())
            .for_each(|(entity, parent, _)| {
                if parent.is_changed()
                    && live(parent.0)
                    && reaches_itself(entity, &parents, max_depth, &nothing_demoted)
                {
                    tx.send(entity).ok();
                }
            });
        drop(tx);
        let mut candidates: Vec<Entity> = rx.try_iter().collect();
        candidates.sort_unstable();
        for entity in candidates {
            // An earlier demotion may already have opened this cycle.
            if demoted.contains(&entity)
                || !reaches_itself(entity, &parents, max_depth, &demoted)
            {
                continue;
            }
            warn!("Breaking parent cycle: demoting {} to a root", entity);
            demoted.insert(entity);
            log.push(HierarchyEdit::Unparent {
                child: entity,
                forget_previous: false,
            });
            stats.cycles_broken += 1;
        }
    }

    // Dead children still listed under a live parent
    if dead_children || full_scan {
        let (tx, rx) = crossbeam_channel::unbounded::<HierarchyEdit>();
        lists
            .par_iter()
            .batching_strategy(config.batching())
            .for_each(|(parent, list)| {
                let dead: ChildBatch = list.iter().filter(|&child| !live(child)).collect();
                if !dead.is_empty() {
                    tx.send(HierarchyEdit::RemoveChildren {
                        parent,
                        children: dead,
                    })
                    .ok();
                }
            });
        drop(tx);
        for edit in rx.try_iter() {
            if let HierarchyEdit::RemoveChildren { children, .. } = &edit {
                stats.pruned += children.len();
            }
            log.push(edit);
        }
    }

    if stats.orphaned + stats.cycles_broken + stats.pruned > 0 {
        debug!(
            "Orphan pass: {} orphaned, {} cycles broken, {} dead children pruned",
            stats.orphaned, stats.cycles_broken, stats.pruned
        );
    }

    log.queue(&mut commands);
}

/// Whether following [`ParentRef`] links from `entity` leads back to it within
/// `max_depth` steps. Entities in `demoted` count as roots.
pub(crate) fn reaches_itself(
    entity: Entity,
    parents: &Query<&ParentRef, Allow<Disabled>>,
    max_depth: usize,
    demoted: &FxHashSet<Entity>,
) -> bool {
    let mut current = entity;
    for _ in 0..max_depth {
        let Ok(parent) = parents.get(current) else {
            return false;
        };
        if parent.0 == entity {
            return true;
        }
        if demoted.contains(&parent.0) {
            return false;
        }
        current = parent.0;
    }
    false
}
