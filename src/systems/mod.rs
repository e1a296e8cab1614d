//! Hierarchy systems.
//!
//! This module groups the ECS systems that keep parent/child relationships
//! consistent and propagate world transforms, in the order they run each
//! cycle.
//!
//! Submodules overview
//! - [`orphans`] – demote children of despawned parents, prune dead children, break cycles
//! - [`relationship_diff`] – gather parent/child additions and removals in parallel
//! - [`relationship_fixup`] – turn the diff into staged child list edits
//! - [`propagate_transforms`] – compute world transforms for roots, then subtrees
//! - [`validate`] – check hierarchy invariants

pub mod orphans;
pub mod propagate_transforms;
pub mod relationship_diff;
pub mod relationship_fixup;
pub mod validate;
