//! Aberred hierarchy library.
//!
//! Parent/child relationship maintenance and world transform propagation for
//! 2D entities on top of `bevy_ecs`. Exposes the components, resources, and
//! systems for use by host schedules and integration tests.

pub mod components;
pub mod editlog;
pub mod error;
pub mod hierarchy;
pub mod pipeline;
pub mod resources;
pub mod systems;
