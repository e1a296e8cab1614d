//! Update cycle scheduling.
//!
//! One update cycle runs, in order and with a sync point between structural
//! phases:
//!
//! 1. [`reconcile_orphans`] and its edit log playback,
//! 2. [`gather_relationship_diff`],
//! 3. [`apply_relationship_fixup`] and its edit log playback,
//! 4. [`propagate_root_transforms`] then [`propagate_child_transforms`],
//! 5. optionally [`validate_hierarchy`].
//!
//! Hosts with their own schedule call [`add_hierarchy_systems`] and
//! [`init_hierarchy_resources`]. [`HierarchyPipeline`] wraps both for
//! standalone use.

use bevy_ecs::prelude::*;
use bevy_tasks::{ComputeTaskPool, TaskPool};

use crate::resources::hierarchyconfig::HierarchyConfig;
use crate::resources::hierarchystats::HierarchyStats;
use crate::resources::relationshipdiff::RelationshipDiff;
use crate::systems::orphans::reconcile_orphans;
use crate::systems::propagate_transforms::{propagate_child_transforms, propagate_root_transforms};
use crate::systems::relationship_diff::gather_relationship_diff;
use crate::systems::relationship_fixup::apply_relationship_fixup;
use crate::systems::validate::{validate_hierarchy, validation_enabled};

/// Phases of one hierarchy update cycle, chained in declaration order.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HierarchySet {
    /// Orphan reconciliation, diff gathering, and fixup.
    Maintain,
    /// World transform propagation.
    Propagate,
    /// Invariant checking, when enabled.
    Validate,
}

/// Register the hierarchy systems in `schedule`.
///
/// Systems that author [`ParentRef`](crate::components::parent::ParentRef) or
/// [`LocalTransform2D`](crate::components::localtransform2d::LocalTransform2D)
/// should run before [`HierarchySet::Maintain`]; consumers of
/// [`WorldTransform2D`](crate::components::worldtransform2d::WorldTransform2D)
/// after [`HierarchySet::Propagate`].
pub fn add_hierarchy_systems(schedule: &mut Schedule) {
    schedule.configure_sets(
        (
            HierarchySet::Maintain,
            HierarchySet::Propagate,
            HierarchySet::Validate,
        )
            .chain(),
    );
    schedule.add_systems((
        (
            reconcile_orphans,
            gather_relationship_diff,
            apply_relationship_fixup,
        )
            .chain()
            .in_set(HierarchySet::Maintain),
        (propagate_root_transforms, propagate_child_transforms)
            .chain()
            .in_set(HierarchySet::Propagate),
        validate_hierarchy
            .run_if(validation_enabled)
            .in_set(HierarchySet::Validate),
    ));
}

/// Insert the resources the hierarchy systems need, keeping existing ones,
/// and make sure the compute task pool used by the parallel passes exists.
pub fn init_hierarchy_resources(world: &mut World) {
    ComputeTaskPool::get_or_init(TaskPool::default);
    world.init_resource::<HierarchyConfig>();
    world.init_resource::<RelationshipDiff>();
    world.init_resource::<HierarchyStats>();
}

/// A self-contained schedule running one update cycle per [`run`](Self::run).
pub struct HierarchyPipeline {
    schedule: Schedule,
}

impl Default for HierarchyPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchyPipeline {
    pub fn new() -> Self {
        ComputeTaskPool::get_or_init(TaskPool::default);
        let mut schedule = Schedule::default();
        add_hierarchy_systems(&mut schedule);
        Self { schedule }
    }

    /// Run one full update cycle, then clear change trackers so the next cycle
    /// only sees what changed in between.
    pub fn run(&mut self, world: &mut World) {
        init_hierarchy_resources(world);
        self.schedule.run(world);
        world.clear_trackers();
    }

    /// The underlying schedule, for adding host systems around the cycle.
    pub fn schedule_mut(&mut self) -> &mut Schedule {
        &mut self.schedule
    }
}
