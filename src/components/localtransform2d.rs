//! Local transform of an entity relative to its parent.
//!
//! For roots the parent frame is the world frame. The matrix form is
//! `translate(position) * rotate(rotation) * scale(scale)`, see
//! [`LocalTransform2D::to_affine`].

use bevy_ecs::prelude::*;
use glam::{Affine2, Vec2};

use super::worldtransform2d::WorldTransform2D;

/// Position, rotation, and scale relative to the parent frame.
///
/// Written by gameplay and animation code, read by transform propagation.
/// Inserting it also inserts an identity [`WorldTransform2D`].
#[derive(Component, Clone, Copy, Debug, PartialEq)]
#[require(WorldTransform2D)]
pub struct LocalTransform2D {
    /// Translation in parent space.
    pub position: Vec2,
    /// Counter-clockwise rotation in radians.
    pub rotation: f32,
    /// Per-axis scale, applied before rotation.
    pub scale: Vec2,
}

impl Default for LocalTransform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl LocalTransform2D {
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        rotation: 0.0,
        scale: Vec2::ONE,
    };

    pub fn from_xy(x: f32, y: f32) -> Self {
        Self::from_position(Vec2::new(x, y))
    }

    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation(rotation: f32) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    pub fn from_scale(scale: Vec2) -> Self {
        Self {
            scale,
            ..Self::IDENTITY
        }
    }

    pub fn from_position_rotation(position: Vec2, rotation: f32) -> Self {
        Self {
            position,
            rotation,
            scale: Vec2::ONE,
        }
    }

    pub fn from_position_rotation_scale(position: Vec2, rotation: f32, scale: Vec2) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Decompose an affine matrix. Shear is lost.
    pub fn from_affine(affine: Affine2) -> Self {
        let (scale, rotation, position) = affine.to_scale_angle_translation();
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn with_position(self, position: Vec2) -> Self {
        Self { position, ..self }
    }

    pub fn with_rotation(self, rotation: f32) -> Self {
        Self { rotation, ..self }
    }

    pub fn with_scale(self, scale: Vec2) -> Self {
        Self { scale, ..self }
    }

    /// Move by `translation` in parent space.
    pub fn translate(self, translation: Vec2) -> Self {
        Self {
            position: self.position + translation,
            ..self
        }
    }

    /// Add `angle` radians to the rotation.
    pub fn rotate(self, angle: f32) -> Self {
        Self {
            rotation: self.rotation + angle,
            ..self
        }
    }

    /// Multiply the current scale by `factor`.
    pub fn apply_scale(self, factor: Vec2) -> Self {
        Self {
            scale: self.scale * factor,
            ..self
        }
    }

    /// The TRS matrix mapping local points into parent space.
    #[inline]
    pub fn to_affine(&self) -> Affine2 {
        Affine2::from_scale_angle_translation(self.scale, self.rotation, self.position)
    }

    /// The matrix mapping parent-space points back into local space.
    pub fn to_inverse_affine(&self) -> Affine2 {
        self.to_affine().inverse()
    }

    pub fn transform_point(&self, point: Vec2) -> Vec2 {
        self.position + Vec2::from_angle(self.rotation).rotate(point * self.scale)
    }

    pub fn inverse_transform_point(&self, point: Vec2) -> Vec2 {
        Vec2::from_angle(-self.rotation).rotate(point - self.position) / self.scale
    }

    /// Rotate `direction` without translating or scaling it.
    pub fn transform_direction(&self, direction: Vec2) -> Vec2 {
        Vec2::from_angle(self.rotation).rotate(direction)
    }

    pub fn inverse_transform_direction(&self, direction: Vec2) -> Vec2 {
        Vec2::from_angle(-self.rotation).rotate(direction)
    }

    /// Express `other`, given in this transform's local space, in parent space.
    ///
    /// Exact for uniform scale. With non-uniform scale and rotation the result
    /// can not be represented without shear; use [`Self::to_affine`] then.
    pub fn transform_transform(&self, other: &LocalTransform2D) -> Self {
        Self {
            position: self.transform_point(other.position),
            rotation: self.rotation + other.rotation,
            scale: self.scale * other.scale,
        }
    }

    pub fn inverse(&self) -> Self {
        let scale = Vec2::ONE / self.scale;
        let rotation = -self.rotation;
        let position = Vec2::from_angle(rotation).rotate(-self.position) * scale;
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Local +X axis in parent space.
    pub fn right(&self) -> Vec2 {
        self.transform_direction(Vec2::X)
    }

    /// Local +Y axis in parent space.
    pub fn up(&self) -> Vec2 {
        self.transform_direction(Vec2::Y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-5;

    fn approx(a: Vec2, b: Vec2) -> bool {
        a.abs_diff_eq(b, EPSILON)
    }

    #[test]
    fn test_default_is_identity() {
        let t = LocalTransform2D::default();
        assert_eq!(t, LocalTransform2D::IDENTITY);
        assert_eq!(t.to_affine(), Affine2::IDENTITY);
    }

    #[test]
    fn test_transform_point_matches_affine() {
        let t = LocalTransform2D::from_position_rotation_scale(
            Vec2::new(3.0, -1.0),
            0.7,
            Vec2::new(2.0, 0.5),
        );
        let p = Vec2::new(1.5, 4.0);
        assert!(approx(t.transform_point(p), t.to_affine().transform_point2(p)));
    }

    #[test]
    fn test_inverse_transform_point_round_trips() {
        let t = LocalTransform2D::from_position_rotation_scale(Vec2::new(5.0, 2.0), 1.2, Vec2::splat(3.0));
        let p = Vec2::new(-2.0, 7.0);
        assert!(approx(t.inverse_transform_point(t.transform_point(p)), p));
    }

    #[test]
    fn test_inverse_composes_to_identity() {
        let t = LocalTransform2D::from_position_rotation_scale(Vec2::new(4.0, 1.0), 0.3, Vec2::splat(2.0));
        let composed = t.to_affine() * t.inverse().to_affine();
        assert!(composed.abs_diff_eq(Affine2::IDENTITY, EPSILON));
    }

    #[test]
    fn test_right_and_up_follow_rotation() {
        let t = LocalTransform2D::from_rotation(FRAC_PI_2);
        assert!(approx(t.right(), Vec2::Y));
        assert!(approx(t.up(), -Vec2::X));
    }

    #[test]
    fn test_builders() {
        let t = LocalTransform2D::from_xy(1.0, 2.0)
            .translate(Vec2::new(1.0, 0.0))
            .rotate(0.5)
            .apply_scale(Vec2::splat(2.0));
        assert!(approx(t.position, Vec2::new(2.0, 2.0)));
        assert!((t.rotation - 0.5).abs() < EPSILON);
        assert!(approx(t.scale, Vec2::splat(2.0)));
    }

    #[test]
    fn test_from_affine_recovers_trs() {
        let t = LocalTransform2D::from_position_rotation_scale(Vec2::new(-3.0, 8.0), 0.4, Vec2::new(1.5, 2.5));
        let back = LocalTransform2D::from_affine(t.to_affine());
        assert!(approx(back.position, t.position));
        assert!(approx(back.scale, t.scale));
        assert!((back.rotation - t.rotation).abs() < EPSILON);
    }

    #[test]
    fn test_transform_transform_uniform_scale_matches_matrix() {
        let parent = LocalTransform2D::from_position_rotation_scale(Vec2::new(1.0, 1.0), 0.6, Vec2::splat(2.0));
        let child = LocalTransform2D::from_position_rotation(Vec2::new(3.0, 0.0), 0.2);
        let combined = parent.transform_transform(&child).to_affine();
        let expected = parent.to_affine() * child.to_affine();
        assert!(combined.abs_diff_eq(expected, 1e-4));
    }
}
