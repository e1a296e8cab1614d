//! Optional matrix applied after an entity's local TRS matrix.
//!
//! Useful for effects the TRS fields can not express, such as shear or a
//! non-uniform squash that should not leak into the rotation of children
//! placed through [`LocalTransform2D`](super::localtransform2d::LocalTransform2D).

use bevy_ecs::prelude::*;
use glam::{Affine2, Vec2};

/// Extra matrix multiplied on the right of the local matrix:
/// `world = parent_world * local * post`.
#[derive(Component, Clone, Copy, Debug, PartialEq, Default)]
pub struct PostTransformMatrix2D(pub Affine2);

impl PostTransformMatrix2D {
    pub fn from_scale(scale: Vec2) -> Self {
        Self(Affine2::from_scale(scale))
    }

    /// Shear along X proportional to Y.
    pub fn from_shear_x(factor: f32) -> Self {
        Self(Affine2::from_cols_array(&[1.0, 0.0, factor, 1.0, 0.0, 0.0]))
    }
}
