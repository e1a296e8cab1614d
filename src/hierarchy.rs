//! Authoring helpers for parent-child relationships.
//!
//! These edit [`ParentRef`] only. Child lists, shadow parents, and world
//! transforms catch up during the next update cycle, so several edits made in
//! one frame cost a single round of maintenance.
//!
//! ```ignore
//! set_parent(&mut world, child, parent)?;
//! pipeline.run(&mut world);
//! assert!(world.get::<ChildList>(parent).unwrap().contains(child));
//! ```

use bevy_ecs::entity_disabling::Disabled;
use bevy_ecs::prelude::*;
use log::warn;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::components::childlist::ChildList;
use crate::components::parent::ParentRef;
use crate::error::HierarchyError;

/// Attach `child` to `parent`.
///
/// Rejects despawned entities, self-parenting, and edits that would make
/// `child` an ancestor of itself.
pub fn set_parent(world: &mut World, child: Entity, parent: Entity) -> Result<(), HierarchyError> {
    if world.get_entity(child).is_err() {
        return Err(HierarchyError::NoSuchEntity(child));
    }
    if world.get_entity(parent).is_err() {
        return Err(HierarchyError::NoSuchEntity(parent));
    }
    if child == parent {
        return Err(HierarchyError::SelfParent(child));
    }
    if ancestors(world, parent).contains(&child) {
        return Err(HierarchyError::WouldCreateCycle { child, parent });
    }
    if world.get::<ParentRef>(child) != Some(&ParentRef(parent)) {
        world.entity_mut(child).insert(ParentRef(parent));
    }
    Ok(())
}

/// Detach `child` from its parent, making it a root. Does nothing for roots.
pub fn remove_parent(world: &mut World, child: Entity) -> Result<(), HierarchyError> {
    let mut entity = world
        .get_entity_mut(child)
        .map_err(|_| HierarchyError::NoSuchEntity(child))?;
    entity.remove::<ParentRef>();
    Ok(())
}

/// Despawn `root` and everything parented under it.
///
/// Follows [`ParentRef`]s rather than child lists, so children attached since
/// the last update cycle are included. Disabled descendants are despawned too.
pub fn despawn_recursive(world: &mut World, root: Entity) -> Result<usize, HierarchyError> {
    if world.get_entity(root).is_err() {
        return Err(HierarchyError::NoSuchEntity(root));
    }

    let mut children_of: FxHashMap<Entity, SmallVec<[Entity; 8]>> = FxHashMap::default();
    let mut query = world.query_filtered::<(Entity, &ParentRef), Allow<Disabled>>();
    for (child, parent) in query.iter(world) {
        children_of.entry(parent.0).or_default().push(child);
    }

    let mut doomed = vec![root];
    let mut seen = FxHashSet::default();
    seen.insert(root);
    let mut index = 0;
    while index < doomed.len() {
        if let Some(children) = children_of.get(&doomed[index]) {
            for &child in children {
                if seen.insert(child) {
                    doomed.push(child);
                }
            }
        }
        index += 1;
    }

    for &entity in doomed.iter().rev() {
        world.despawn(entity);
    }
    Ok(doomed.len())
}

/// Ancestors of `entity`, nearest first.
///
/// Stops at a root, at a despawned parent, or when a parent cycle is detected.
pub fn ancestors(world: &World, entity: Entity) -> Vec<Entity> {
    let mut chain = Vec::new();
    let mut seen = FxHashSet::default();
    seen.insert(entity);
    let mut current = entity;
    while let Some(parent) = world.get::<ParentRef>(current) {
        if !seen.insert(parent.0) || world.get_entity(parent.0).is_err() {
            break;
        }
        chain.push(parent.0);
        current = parent.0;
    }
    chain
}

/// The topmost ancestor of `entity`, or `entity` itself if it is a root.
pub fn root_of(world: &World, entity: Entity) -> Entity {
    ancestors(world, entity).last().copied().unwrap_or(entity)
}

/// Descendants of `entity` in depth-first pre-order, as of the last update
/// cycle's child lists.
pub fn descendants(world: &World, entity: Entity) -> Vec<Entity> {
    let mut out = Vec::new();
    let mut stack: SmallVec<[Entity; 16]> = SmallVec::new();
    let mut seen = FxHashSet::default();
    push_children_reversed(world, entity, &mut stack);
    while let Some(current) = stack.pop() {
        if !seen.insert(current) {
            continue;
        }
        out.push(current);
        push_children_reversed(world, current, &mut stack);
    }
    out
}

fn push_children_reversed(world: &World, entity: Entity, stack: &mut SmallVec<[Entity; 16]>) {
    if let Some(list) = world.get::<ChildList>(entity) {
        stack.extend(list.as_slice().iter().rev().copied());
    }
}

/// Deferred versions of the helpers above.
pub trait HierarchyCommands {
    /// Queue [`set_parent`]. Rejected edits are logged.
    fn set_parent(&mut self, child: Entity, parent: Entity);
    /// Queue [`remove_parent`].
    fn remove_parent(&mut self, child: Entity);
    /// Queue [`despawn_recursive`].
    fn despawn_recursive(&mut self, root: Entity);
}

impl HierarchyCommands for Commands<'_, '_> {
    fn set_parent(&mut self, child: Entity, parent: Entity) {
        self.queue(move |world: &mut World| {
            if let Err(e) = set_parent(world, child, parent) {
                warn!("set_parent({}, {}) rejected: {}", child, parent, e);
            }
        });
    }

    fn remove_parent(&mut self, child: Entity) {
        self.queue(move |world: &mut World| {
            if let Err(e) = remove_parent(world, child) {
                warn!("remove_parent({}) rejected: {}", child, e);
            }
        });
    }

    fn despawn_recursive(&mut self, root: Entity) {
        self.queue(move |world: &mut World| {
            if let Err(e) = despawn_recursive(world, root) {
                warn!("despawn_recursive({}) rejected: {}", root, e);
            }
        });
    }
}
