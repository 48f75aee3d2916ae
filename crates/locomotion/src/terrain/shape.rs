//! Collider shapes and body poses.

use glam::{Affine3A, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// The body's collider, positioned by its bottom-center (the feet).
///
/// The locomotion code only cares about vertical bounds and a settable
/// height, so every variant answers the same questions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    /// Vertical capsule with total height including both caps.
    Capsule { radius: f32, height: f32 },
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
}

impl ColliderShape {
    /// Default standing character collider.
    pub const CHARACTER: Self = Self::Capsule {
        radius: 0.5,
        height: 2.0,
    };

    pub fn height(&self) -> f32 {
        match *self {
            Self::Capsule { height, .. } => height,
            Self::Sphere { radius } => radius * 2.0,
            Self::Box { half_extents } => half_extents.y * 2.0,
        }
    }

    /// Horizontal radius of the collider footprint.
    pub fn radius(&self) -> f32 {
        match *self {
            Self::Capsule { radius, .. } | Self::Sphere { radius } => radius,
            Self::Box { half_extents } => half_extents.x.max(half_extents.z),
        }
    }

    /// Vertical center offset above the feet.
    pub fn center_offset(&self) -> f32 {
        self.height() * 0.5
    }

    /// Bottom and top of the collider for a body whose feet are at `feet_y`.
    pub fn vertical_bounds(&self, feet_y: f32) -> (f32, f32) {
        (feet_y, feet_y + self.height())
    }

    /// The same shape compressed (or stretched) vertically.
    ///
    /// Spheres cannot change height independently, so they shrink uniformly.
    pub fn with_height_scale(&self, scale: f32) -> Self {
        match *self {
            Self::Capsule { radius, height } => {
                let height = (height * scale).max(radius * 2.0);
                Self::Capsule { radius, height }
            }
            Self::Sphere { radius } => Self::Sphere {
                radius: radius * scale,
            },
            Self::Box { half_extents } => Self::Box {
                half_extents: Vec3::new(half_extents.x, half_extents.y * scale, half_extents.z),
            },
        }
    }
}

impl Default for ColliderShape {
    fn default() -> Self {
        Self::CHARACTER
    }
}

/// World transform of a terrain body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyPose {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl BodyPose {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn at(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for BodyPose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capsule_crouch_keeps_radius() {
        let crouched = ColliderShape::CHARACTER.with_height_scale(0.7);
        assert!((crouched.height() - 1.4).abs() < 1e-5);
        assert_eq!(crouched.radius(), 0.5);
    }

    #[test]
    fn test_capsule_never_shorter_than_diameter() {
        let squashed = ColliderShape::CHARACTER.with_height_scale(0.1);
        assert_eq!(squashed.height(), 1.0);
    }

    #[test]
    fn test_box_and_sphere_bounds() {
        let boxed = ColliderShape::Box {
            half_extents: Vec3::new(0.4, 0.9, 0.4),
        };
        assert_eq!(boxed.vertical_bounds(1.0), (1.0, 2.8));
        assert!((boxed.with_height_scale(0.5).height() - 0.9).abs() < 1e-5);

        let sphere = ColliderShape::Sphere { radius: 0.5 };
        assert_eq!(sphere.height(), 1.0);
        assert_eq!(sphere.center_offset(), 0.5);
    }

    #[test]
    fn test_pose_affine() {
        let pose = BodyPose {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::IDENTITY,
            scale: Vec3::splat(2.0),
        };
        let p = pose.to_affine().transform_point3(Vec3::X);
        assert!((p - Vec3::new(3.0, 2.0, 3.0)).length() < 1e-5);
    }
}
