//! ECS resources shared by the hierarchy systems.
//!
//! Submodules overview:
//! - [`hierarchyconfig`] – tuning knobs loaded from an INI file
//! - [`hierarchystats`] – per-cycle work counters
//! - [`relationshipdiff`] – parent/child changes gathered in the current cycle

pub mod hierarchyconfig;
pub mod hierarchystats;
pub mod relationshipdiff;
