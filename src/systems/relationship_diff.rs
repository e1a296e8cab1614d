//! Relationship diff gathering.
//!
//! Compares each entity's [`ParentRef`] with the [`PreviousParentRef`] shadow
//! copy and records which parents gain and lose which children. Runs after the
//! orphan pass, so every parent referenced here is alive.
//!
//! Three populations are scanned in parallel batches:
//!
//! - reparented: both components present and `ParentRef` changed,
//! - adopted: `ParentRef` present, no shadow copy yet,
//! - dissolved: shadow copy present, `ParentRef` gone.
//!
//! Batches push [`DiffRecord`]s into a lock-free channel which is drained into
//! [`RelationshipDiff`] once every batch has joined. The only in-place write is
//! the shadow copy of reparented entities; it changes field values, not
//! structure, and doubles as the "just reparented" signal.

use bevy_ecs::entity_disabling::Disabled;
use bevy_ecs::prelude::*;
use log::debug;

use crate::components::childlist::ChildList;
use crate::components::parent::{ParentRef, PreviousParentRef, StaticHierarchy};
use crate::resources::hierarchyconfig::HierarchyConfig;
use crate::resources::relationshipdiff::{DiffRecord, RelationshipDiff};

/// Gather parent/child additions and removals for this cycle.
///
/// Disabled entities are included so their change ticks are not lost while
/// they are hidden from default queries.
#[allow(clippy::type_complexity)]
pub fn gather_relationship_diff(
    config: Res<HierarchyConfig>,
    mut diff: ResMut<RelationshipDiff>,
    mut reparented: Query<
        (Entity, &ParentRef, &mut PreviousParentRef),
        (Changed<ParentRef>, Without<StaticHierarchy>, Allow<Disabled>),
    >,
    adopted: Query<
        (Entity, &ParentRef),
        (
            Without<PreviousParentRef>,
            Without<StaticHierarchy>,
            Allow<Disabled>,
        ),
    >,
    dissolved: Query<(Entity, &PreviousParentRef), (Without<ParentRef>, Allow<Disabled>)>,
    lists: Query<(), (With<ChildList>, Allow<Disabled>)>,
) {
    diff.clear();

    let (tx, rx) = crossbeam_channel::unbounded::<DiffRecord>();

    reparented
        .par_iter_mut()
        .batching_strategy(config.batching())
        .for_each(|(entity, parent, mut previous)| {
            if parent.0 == previous.0 {
                return;
            }
            tx.send(DiffRecord::Add {
                parent: parent.0,
                child: entity,
            })
            .ok();
            if lists.contains(previous.0) {
                tx.send(DiffRecord::Remove {
                    parent: previous.0,
                    child: entity,
                })
                .ok();
            }
            previous.0 = parent.0;
        });

    adopted
        .par_iter()
        .batching_strategy(config.batching())
        .for_each(|(entity, parent)| {
            tx.send(DiffRecord::Add {
                parent: parent.0,
                child: entity,
            })
            .ok();
            tx.send(DiffRecord::Adopted {
                child: entity,
                parent: parent.0,
            })
            .ok();
        });

    dissolved
        .par_iter()
        .batching_strategy(config.batching())
        .for_each(|(entity, previous)| {
            if lists.contains(previous.0) {
                tx.send(DiffRecord::Remove {
                    parent: previous.0,
                    child: entity,
                })
                .ok();
            }
            tx.send(DiffRecord::Dissolved { child: entity }).ok();
        });

    drop(tx);
    for record in rx.try_iter() {
        diff.record(record);
    }

    if !diff.is_empty() {
        debug!(
            "Relationship diff: {} additions, {} removals across {} parents",
            diff.addition_count(),
            diff.removal_count(),
            diff.affected_parents().len()
        );
    }
}
