//! Computed world-space transform for entities in a hierarchy.
//!
//! Written only by the propagation systems in
//! [`propagate_transforms`](crate::systems::propagate_transforms). Culling,
//! sorting, and rendering read it after the update cycle has finished.

use bevy_ecs::prelude::*;
use glam::{Affine2, Vec2};

/// Absolute transform of an entity.
///
/// For roots this is the [`LocalTransform2D`](super::localtransform2d::LocalTransform2D)
/// matrix (times the optional post matrix). For children it is the parent's
/// world transform composed with the child's own local matrix.
#[derive(Component, Clone, Copy, Debug, PartialEq, Default)]
pub struct WorldTransform2D(pub Affine2);

impl WorldTransform2D {
    pub const IDENTITY: Self = Self(Affine2::IDENTITY);

    #[inline]
    pub fn affine(&self) -> Affine2 {
        self.0
    }

    /// World-space position of the entity pivot.
    pub fn position(&self) -> Vec2 {
        self.0.translation
    }

    /// World-space rotation in radians, taken from the matrix's X axis.
    pub fn rotation(&self) -> f32 {
        let x = self.0.matrix2.x_axis;
        x.y.atan2(x.x)
    }

    /// World-space scale. Negative determinants flip the X scale.
    pub fn scale(&self) -> Vec2 {
        let (scale, _, _) = self.0.to_scale_angle_translation();
        scale
    }

    /// Local +X axis in world space, not normalized.
    pub fn right(&self) -> Vec2 {
        self.0.matrix2.x_axis
    }

    /// Local +Y axis in world space, not normalized.
    pub fn up(&self) -> Vec2 {
        self.0.matrix2.y_axis
    }

    pub fn transform_point(&self, point: Vec2) -> Vec2 {
        self.0.transform_point2(point)
    }

    pub fn transform_direction(&self, direction: Vec2) -> Vec2 {
        self.0.transform_vector2(direction)
    }

    /// Compose with a child's local matrix.
    #[inline]
    pub fn mul_affine(&self, local: Affine2) -> Self {
        Self(self.0 * local)
    }
}

impl From<Affine2> for WorldTransform2D {
    fn from(affine: Affine2) -> Self {
        Self(affine)
    }
}
