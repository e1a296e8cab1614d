//! Error types for hierarchy editing and configuration.
//!
//! The per-cycle maintenance systems never return errors: dangling parents,
//! cycles, and stale members are repaired in place and logged. These types are
//! only surfaced by the authoring helpers in [`crate::hierarchy`], by
//! [`HierarchyConfig`](crate::resources::hierarchyconfig::HierarchyConfig) I/O,
//! and by the invariant checker in [`crate::systems::validate`].

use std::path::PathBuf;

use bevy_ecs::entity::Entity;
use thiserror::Error;

/// Rejected hierarchy edits.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("entity {0} does not exist")]
    NoSuchEntity(Entity),
    #[error("entity {0} can not be its own parent")]
    SelfParent(Entity),
    #[error("parenting {child} to {parent} would make {child} its own ancestor")]
    WouldCreateCycle { child: Entity, parent: Entity },
}

/// Failures loading or saving a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config file {path}: {reason}")]
    Load { path: PathBuf, reason: String },
    #[error("failed to write config file {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid value for [{section}] {key}: {value}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
    },
}

/// A broken hierarchy invariant found by
/// [`find_violations`](crate::systems::validate::find_violations).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyViolation {
    #[error("{child} has parent {parent} but is missing from its child list")]
    MissingFromParent { child: Entity, parent: Entity },
    #[error("{child} appears {count} times in the child list of {parent}")]
    DuplicateMember {
        parent: Entity,
        child: Entity,
        count: usize,
    },
    #[error("{child} is listed under {parent} but its parent is {actual:?}")]
    StaleMember {
        parent: Entity,
        child: Entity,
        actual: Option<Entity>,
    },
    #[error("{parent} owns an empty child list")]
    EmptyList { parent: Entity },
    #[error("{child} references despawned parent {parent}")]
    DanglingParent { child: Entity, parent: Entity },
    #[error("{child} has parent {parent} but previous parent {previous:?}")]
    PreviousParentMismatch {
        child: Entity,
        parent: Entity,
        previous: Option<Entity>,
    },
}
