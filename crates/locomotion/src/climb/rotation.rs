//! Turning to face the wall while climbing.

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::terrain::{TerrainHit, TerrainQuery};

use super::probe_fan::{ProbeFan, ROTATION_ORDER};

/// Which probe supplied the current wall normal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalSource {
    /// The detection hit at attach time.
    #[default]
    Attach,
    Center,
    SlightRight,
    SlightLeft,
    OuterRight,
    OuterLeft,
    /// Wrapping around an inside corner.
    InwardRight,
    InwardLeft,
}

/// Where the body is turning to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationProgress {
    pub target: Quat,
    pub source: NormalSource,
    /// The first turn onto the wall is complete.
    pub finished: bool,
}

impl RotationProgress {
    pub fn facing(normal: Vec3) -> Self {
        Self {
            target: look_rotation(-normal),
            source: NormalSource::Attach,
            finished: false,
        }
    }
}

/// Rotation whose forward (+Z) points along `direction`, keeping world up.
pub fn look_rotation(direction: Vec3) -> Quat {
    let forward = direction.try_normalize().unwrap_or(Vec3::Z);
    let right = Vec3::Y.cross(forward).try_normalize().unwrap_or(Vec3::X);
    let up = forward.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, forward)).normalize()
}

/// Drop pitch and roll.
pub fn upright(rotation: Quat) -> Quat {
    let forward = rotation * Vec3::Z;
    let flat = Vec3::new(forward.x, 0.0, forward.z);
    if flat.length_squared() < 1e-8 {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_y(flat.x.atan2(flat.z))
}

/// Pick the wall normal to turn toward.
///
/// Front columns win: center, then slight right, then slight left. Only
/// when none of them hits does an inside corner on the side the stick
/// points to count, and the outer columns come last.
pub fn select_wall_normal<T: TerrainQuery + ?Sized>(
    fan: &ProbeFan<'_, T>,
    tag: &str,
    horizontal: f32,
) -> Option<(TerrainHit, NormalSource)> {
    let right = fan.right;
    let straight = |lateral: Vec3| fan.straight(&ROTATION_ORDER, lateral, 1.0, Some(tag));

    let front = [
        (Vec3::ZERO, NormalSource::Center),
        (right / 4.5, NormalSource::SlightRight),
        (-right / 4.5, NormalSource::SlightLeft),
    ];
    if let Some(found) = front
        .iter()
        .find_map(|&(lateral, source)| straight(lateral).map(|hit| (hit, source)))
    {
        return Some(found);
    }

    let inward = if horizontal > 0.0 {
        Some((right / 3.0, NormalSource::InwardRight))
    } else if horizontal < 0.0 {
        Some((-right / 3.0, NormalSource::InwardLeft))
    } else {
        None
    };
    if let Some((end_lateral, source)) = inward {
        if let Some(hit) = fan.cast(&ROTATION_ORDER[..4], Vec3::ZERO, end_lateral, 1.0, Some(tag)) {
            return Some((hit, source));
        }
    }

    [
        (right / 2.0, NormalSource::OuterRight),
        (-right / 2.0, NormalSource::OuterLeft),
    ]
    .iter()
    .find_map(|&(lateral, source)| straight(lateral).map(|hit| (hit, source)))
}

/// Slerp toward the target: quickly while first turning onto the wall,
/// at the climbing rotation speed afterwards.
pub fn apply_rotation(
    rotation: Quat,
    progress: &mut RotationProgress,
    attach_speed: f32,
    climb_speed: f32,
    stay_upright: bool,
    dt: f32,
) -> Quat {
    let speed = if progress.finished { climb_speed } else { attach_speed * 2.0 };
    let mut next = rotation.slerp(progress.target, (speed * dt).min(1.0));
    if stay_upright {
        next = upright(next);
    }
    if next.angle_between(progress.target) < 0.01 || next.angle_between(rotation) < 1e-4 {
        progress.finished = true;
    }
    next.normalize()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;
    use crate::movement::ClimbConfig;
    use crate::terrain::{QueryFilter, TerrainWorld};

    #[test]
    fn test_look_rotation_matches_yaw() {
        let rotation = look_rotation(Vec3::X);
        let expected = Quat::from_rotation_y(FRAC_PI_2);
        assert!(rotation.angle_between(expected) < 1e-4);
        assert!(((rotation * Vec3::Z) - Vec3::X).length() < 1e-4);
    }

    #[test]
    fn test_upright_strips_pitch() {
        let pitched = Quat::from_rotation_y(0.5) * Quat::from_rotation_x(0.3);
        let flat = upright(pitched);
        assert!(flat.angle_between(Quat::from_rotation_y(0.5)) < 1e-4);
    }

    #[test]
    fn test_center_column_preferred() {
        let mut world = TerrainWorld::new();
        world.add_tagged_box(Vec3::new(0.0, 1.5, 1.3), Vec3::new(2.0, 1.5, 0.5), "Ladder");
        let fan = ProbeFan::new(
            &world,
            &ClimbConfig::default(),
            QueryFilter::ground(None),
            Vec3::ZERO,
            Quat::IDENTITY,
        );

        let (hit, source) = select_wall_normal(&fan, "Ladder", 0.0).expect("wall");
        assert_eq!(source, NormalSource::Center);
        assert!(hit.normal.z < -0.99);
    }

    #[test]
    fn test_front_wall_beats_inward_corner() {
        let mut world = TerrainWorld::new();
        world.add_tagged_box(Vec3::new(0.0, 1.5, 1.3), Vec3::new(2.0, 1.5, 0.5), "Ladder");
        // Side wall on the right, face at x = 0.2
        world.add_tagged_box(Vec3::new(0.7, 1.5, 0.0), Vec3::new(0.5, 1.5, 2.0), "Ladder");
        let fan = ProbeFan::new(
            &world,
            &ClimbConfig::default(),
            QueryFilter::ground(None),
            Vec3::ZERO,
            Quat::IDENTITY,
        );

        let (hit, source) = select_wall_normal(&fan, "Ladder", 1.0).expect("wall");
        assert_eq!(source, NormalSource::Center);
        assert!(hit.normal.z < -0.99);
    }

    #[test]
    fn test_inward_corner_without_front_wall() {
        let mut world = TerrainWorld::new();
        // Only a side wall on the right, face at x = 0.2
        world.add_tagged_box(Vec3::new(0.7, 1.5, 0.0), Vec3::new(0.5, 1.5, 2.0), "Ladder");
        let fan = ProbeFan::new(
            &world,
            &ClimbConfig::default(),
            QueryFilter::ground(None),
            Vec3::ZERO,
            Quat::IDENTITY,
        );

        let (hit, source) = select_wall_normal(&fan, "Ladder", 1.0).expect("corner");
        assert_eq!(source, NormalSource::InwardRight);
        assert!(hit.normal.x < -0.99);

        // Pushing away from the corner finds nothing
        assert!(select_wall_normal(&fan, "Ladder", -1.0).is_none());
    }

    #[test]
    fn test_rotation_finishes() {
        let mut progress = RotationProgress::facing(Vec3::NEG_X);
        let mut rotation = Quat::IDENTITY;
        for _ in 0..200 {
            rotation = apply_rotation(rotation, &mut progress, 6.0, 10.0, true, 0.02);
        }
        assert!(progress.finished);
        assert!(((rotation * Vec3::Z) - Vec3::X).length() < 0.05);
    }
}
