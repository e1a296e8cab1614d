//! ECS components for hierarchical entities.
//!
//! This module groups the component types describing who is parented to whom
//! and where everything ends up in world space.
//!
//! Submodules overview:
//! - [`childlist`] – children of a parent, maintained by the hierarchy systems
//! - [`localtransform2d`] – position, rotation, and scale relative to the parent
//! - [`parent`] – authored parent reference, its shadow copy, and the static marker
//! - [`posttransform2d`] – optional matrix applied after the local transform
//! - [`worldtransform2d`] – computed world-space transform

pub mod childlist;
pub mod localtransform2d;
pub mod parent;
pub mod posttransform2d;
pub mod worldtransform2d;
