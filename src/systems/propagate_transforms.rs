//! Transform propagation for parent-child entity hierarchies.
//!
//! Computes [`WorldTransform2D`] for every entity with a
//! [`LocalTransform2D`] in two phases:
//!
//! 1. [`propagate_root_transforms`] rewrites roots (no [`ParentRef`]) whose
//!    local transform or post matrix changed, in parallel batches.
//! 2. [`propagate_child_transforms`] walks each root's subtree depth first,
//!    subtrees in parallel. A child is recomputed when its parent's world
//!    transform changed, its own local transform or post matrix changed, or it
//!    joined its parent this cycle. Clean children keep their value but are
//!    still visited so their own descendants can decide for themselves.
//!
//! Disabled entities are propagated like any other so their world transforms
//! are current when they are enabled again.
//!
//! Writes go through `set_if_neq`, so a recomputation producing the same matrix
//! does not bump the change tick and does not dirty the subtree below it.
//!
//! # Schedule position
//!
//! Must run **after** relationship fixup has been applied, since the child
//! phase walks [`ChildList`]s, and **before** culling, sorting, and rendering.

use std::sync::atomic::{AtomicUsize, Ordering};

use bevy_ecs::entity_disabling::Disabled;
use bevy_ecs::prelude::*;
use bevy_utils::Parallel;
use glam::Affine2;
use log::{error, trace, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::components::childlist::ChildList;
use crate::components::localtransform2d::LocalTransform2D;
use crate::components::parent::{ParentRef, PreviousParentRef, StaticHierarchy};
use crate::components::posttransform2d::PostTransformMatrix2D;
use crate::components::worldtransform2d::WorldTransform2D;
use crate::editlog::{EditLog, HierarchyEdit};
use crate::resources::hierarchyconfig::HierarchyConfig;
use crate::resources::hierarchystats::HierarchyStats;
use crate::resources::relationshipdiff::ChildBatch;

/// Data read for every non-root node during the child phase.
type NodeData = (
    Ref<'static, LocalTransform2D>,
    Ref<'static, WorldTransform2D>,
    Option<Ref<'static, PostTransformMatrix2D>>,
    Option<&'static ChildList>,
    Ref<'static, ParentRef>,
    Option<Ref<'static, PreviousParentRef>>,
);

/// Who a listed child says its parent is.
type Membership = (Option<&'static ParentRef>, Has<StaticHierarchy>);

/// `local * post`, the matrix an entity contributes to its own world transform.
#[inline]
pub fn local_matrix(local: &LocalTransform2D, post: Option<&PostTransformMatrix2D>) -> Affine2 {
    match post {
        Some(post) => local.to_affine() * post.0,
        None => local.to_affine(),
    }
}

/// Recompute the world transform of changed roots.
///
/// Entities that just lost their parent, or their post matrix, are revisited
/// even when their local transform is untouched.
#[allow(clippy::type_complexity)]
pub fn propagate_root_transforms(
    config: Res<HierarchyConfig>,
    mut stats: ResMut<HierarchyStats>,
    mut roots: ParamSet<(
        Query<
            (
                &LocalTransform2D,
                Option<&PostTransformMatrix2D>,
                &mut WorldTransform2D,
            ),
            (
                Without<ParentRef>,
                Allow<Disabled>,
                Or<(
                    Changed<LocalTransform2D>,
                    Changed<PostTransformMatrix2D>,
                    Added<WorldTransform2D>,
                )>,
            ),
        >,
        Query<
            (
                &LocalTransform2D,
                Option<&PostTransformMatrix2D>,
                &mut WorldTransform2D,
            ),
            (Without<ParentRef>, Allow<Disabled>),
        >,
    )>,
    mut detached: RemovedComponents<ParentRef>,
    mut removed_post: RemovedComponents<PostTransformMatrix2D>,
) {
    let written = AtomicUsize::new(0);
    roots
        .p0()
        .par_iter_mut()
        .batching_strategy(config.batching())
        .for_each(|(local, post, mut world)| {
            if world.set_if_neq(WorldTransform2D(local_matrix(local, post))) {
                written.fetch_add(1, Ordering::Relaxed);
            }
        });
    let mut written = written.into_inner();

    let revisit: FxHashSet<Entity> = detached.read().chain(removed_post.read()).collect();
    let mut all_roots = roots.p1();
    for entity in revisit {
        let Ok((local, post, mut world)) = all_roots.get_mut(entity) else {
            continue;
        };
        if world.set_if_neq(WorldTransform2D(local_matrix(local, post))) {
            written += 1;
        }
    }

    stats.roots_written += written;
    if written > 0 {
        trace!("Root propagation wrote {} world transforms", written);
    }
}

/// Propagate world transforms from roots down through their subtrees.
///
/// Subtrees are walked in parallel, one root per work item. New values are
/// collected in thread-local outboxes and written once every walk has joined.
/// List entries whose [`ParentRef`] names another parent are not descended
/// into; they are dropped from the list at the next sync point.
#[allow(clippy::type_complexity)]
pub fn propagate_child_transforms(
    mut commands: Commands,
    config: Res<HierarchyConfig>,
    mut stats: ResMut<HierarchyStats>,
    roots: Query<
        (Entity, Ref<WorldTransform2D>, &ChildList),
        (Without<ParentRef>, Allow<Disabled>),
    >,
    members: Query<Membership, Allow<Disabled>>,
    mut nodes: ParamSet<(
        Query<NodeData, (With<ParentRef>, Allow<Disabled>)>,
        Query<&mut WorldTransform2D, (With<ParentRef>, Allow<Disabled>)>,
    )>,
    mut removed_post: RemovedComponents<PostTransformMatrix2D>,
    mut outbox: Local<Parallel<WalkOutput>>,
) {
    let post_removed: FxHashSet<Entity> = removed_post.read().collect();

    {
        let node_query = nodes.p0();
        let walk = SubtreeWalk {
            nodes: &node_query,
            members: &members,
            post_removed: &post_removed,
            max_depth: config.max_depth,
        };
        let outbox = &*outbox;
        roots
            .par_iter()
            .batching_strategy(config.batching())
            .for_each_init(
                || outbox.borrow_local_mut(),
                |local_outbox, (root, world, children)| {
                    walk.descend(root, *world, world.is_changed(), children, 1, local_outbox);
                },
            );
    }

    let mut written = 0;
    let mut mismatched: FxHashMap<Entity, ChildBatch> = FxHashMap::default();
    let mut worlds = nodes.p1();
    for output in outbox.iter_mut() {
        for (entity, value) in output.writes.drain(..) {
            if let Ok(mut world) = worlds.get_mut(entity) {
                if world.set_if_neq(value) {
                    written += 1;
                }
            }
        }
        for (parent, child) in output.mismatched.drain(..) {
            mismatched.entry(parent).or_default().push(child);
        }
    }

    stats.children_written += written;
    if written > 0 {
        trace!("Child propagation wrote {} world transforms", written);
    }

    if !mismatched.is_empty() {
        let mut parents: Vec<Entity> = mismatched.keys().copied().collect();
        parents.sort_unstable();
        let mut log = EditLog::new();
        for parent in parents {
            if let Some(children) = mismatched.remove(&parent) {
                stats.mismatched += children.len();
                warn!(
                    "Dropping {} child list entries of {} that name another parent",
                    children.len(),
                    parent
                );
                log.push(HierarchyEdit::RemoveChildren { parent, children });
            }
        }
        log.queue(&mut commands);
    }
}

/// Per-thread results of the subtree walks.
#[derive(Default)]
pub struct WalkOutput {
    writes: Vec<(Entity, WorldTransform2D)>,
    mismatched: Vec<(Entity, Entity)>,
}

/// Read-only state shared by every subtree walk in one run.
struct SubtreeWalk<'a, 'w, 's> {
    nodes: &'a Query<'w, 's, NodeData, (With<ParentRef>, Allow<Disabled>)>,
    members: &'a Query<'w, 's, Membership, Allow<Disabled>>,
    post_removed: &'a FxHashSet<Entity>,
    max_depth: usize,
}

impl SubtreeWalk<'_, '_, '_> {
    fn descend(
        &self,
        parent: Entity,
        parent_world: WorldTransform2D,
        parent_changed: bool,
        children: &ChildList,
        depth: usize,
        output: &mut WalkOutput,
    ) {
        if depth > self.max_depth {
            error!(
                "Hierarchy under {} is deeper than max_depth={}, not propagating further",
                parent, self.max_depth
            );
            return;
        }

        for child in children.iter() {
            // Despawned members are pruned by the orphan pass.
            let Ok((owner, is_static)) = self.members.get(child) else {
                continue;
            };
            let owner = owner.map(ParentRef::get);
            if owner != Some(parent) {
                // Static lists are edited by hand and may lag behind.
                if !is_static {
                    debug_assert_eq!(
                        owner,
                        Some(parent),
                        "{} is listed under the wrong parent",
                        child
                    );
                }
                output.mismatched.push((parent, child));
                continue;
            }

            let Ok((local, world, post, grandchildren, parent_ref, previous)) =
                self.nodes.get(child)
            else {
                continue;
            };

            let joined = parent_ref.is_changed() || previous.is_some_and(|p| p.is_changed());
            let post_changed = post.as_ref().is_some_and(|p| p.is_changed())
                || self.post_removed.contains(&child);
            let dirty = parent_changed || joined || post_changed || local.is_changed();

            let (child_world, child_changed) = if dirty {
                let recomputed = parent_world.mul_affine(local_matrix(&local, post.as_deref()));
                let differs = recomputed != *world;
                if differs {
                    output.writes.push((child, recomputed));
                }
                (recomputed, differs || world.is_changed())
            } else {
                (*world, world.is_changed())
            };

            if let Some(grandchildren) = grandchildren {
                self.descend(
                    child,
                    child_world,
                    child_changed,
                    grandchildren,
                    depth + 1,
                    output,
                );
            }
        }
    }
}
