//! Hierarchy invariant checks.
//!
//! After a completed update cycle every parented entity is listed exactly once
//! under its parent, no child list is empty, no parent reference dangles, and
//! every maintained entity's shadow parent matches its parent. The checker is
//! O(entities) and meant for tests and debug sessions; the
//! [`validate_hierarchy`] system is only scheduled when
//! [`HierarchyConfig::validate`] is set.

use bevy_ecs::entity_disabling::Disabled;
use bevy_ecs::prelude::*;
use log::warn;

use crate::components::childlist::ChildList;
use crate::components::parent::{ParentRef, PreviousParentRef, StaticHierarchy};
use crate::error::HierarchyViolation;
use crate::resources::hierarchyconfig::HierarchyConfig;

/// Collect every broken invariant in `world`, disabled entities included.
pub fn find_violations(world: &mut World) -> Vec<HierarchyViolation> {
    let mut violations = Vec::new();

    let mut parented = world.query_filtered::<(
        Entity,
        &ParentRef,
        Option<&PreviousParentRef>,
        Has<StaticHierarchy>,
    ), Allow<Disabled>>();
    let mut lists = world.query_filtered::<(Entity, &ChildList), Allow<Disabled>>();

    for (child, parent, previous, is_static) in parented.iter(world) {
        let parent = parent.0;
        if world.get_entity(parent).is_err() {
            violations.push(HierarchyViolation::DanglingParent { child, parent });
            continue;
        }
        let count = lists
            .get(world, parent)
            .map_or(0, |(_, list)| list.iter().filter(|&e| e == child).count());
        match count {
            0 => violations.push(HierarchyViolation::MissingFromParent { child, parent }),
            1 => {}
            count => violations.push(HierarchyViolation::DuplicateMember {
                parent,
                child,
                count,
            }),
        }
        let previous = previous.map(|p| p.0);
        if !is_static && previous != Some(parent) {
            violations.push(HierarchyViolation::PreviousParentMismatch {
                child,
                parent,
                previous,
            });
        }
    }

    for (parent, list) in lists.iter(world) {
        if list.is_empty() {
            violations.push(HierarchyViolation::EmptyList { parent });
            continue;
        }
        for child in list.iter() {
            let actual = world.get::<ParentRef>(child).map(|p| p.0);
            if actual != Some(parent) {
                violations.push(HierarchyViolation::StaleMember {
                    parent,
                    child,
                    actual,
                });
            }
        }
    }

    violations
}

/// Run condition: validation is switched on in [`HierarchyConfig`].
pub fn validation_enabled(config: Res<HierarchyConfig>) -> bool {
    config.validate
}

/// Log every broken invariant as a warning.
pub fn validate_hierarchy(world: &mut World) {
    let violations = find_violations(world);
    for violation in &violations {
        warn!("Hierarchy invariant violated: {}", violation);
    }
}
