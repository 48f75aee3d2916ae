//! Grabbing back onto the wall after walking off a climbable ledge.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::movement::ClimbConfig;
use crate::terrain::{QueryFilter, TerrainQuery};

use super::rotation::look_rotation;

/// Lerp rate of the turn, per second.
const TURN_RATE: f32 = 13.0;

/// Upper bound on the turn.
const TURN_LIMIT_MS: u32 = 500;

/// Reach of the grab-back probe.
const GRAB_PROBE_LENGTH: f32 = 1.5;

/// Gap kept between the collider and the wall after turning.
const WALL_GAP: f32 = 0.02;

/// An in-progress turn back onto the wall below a ledge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnBackState {
    pub target_position: Vec3,
    pub target_rotation: Quat,
    /// Normal of the wall being grabbed.
    pub normal: Vec3,
    pub elapsed_ms: u32,
}

impl TurnBackState {
    /// Ease toward the hanging pose. Returns true when the body is there.
    pub fn step(&mut self, position: &mut Vec3, rotation: &mut Quat, dt: f32, delta_ms: u32) -> bool {
        self.elapsed_ms = self.elapsed_ms.saturating_add(delta_ms);
        let t = (TURN_RATE * dt).min(1.0);
        *position = position.lerp(self.target_position, t);
        *rotation = rotation.slerp(self.target_rotation, t).normalize();

        let arrived = position.distance(self.target_position) <= 0.05
            && rotation.angle_between(self.target_rotation) < 0.05;
        if arrived || self.elapsed_ms >= TURN_LIMIT_MS {
            *position = self.target_position;
            *rotation = self.target_rotation;
            return true;
        }
        false
    }
}

/// No floor just past the toes.
pub fn ground_missing_ahead<T: TerrainQuery + ?Sized>(
    terrain: &T,
    filter: &QueryFilter,
    config: &ClimbConfig,
    feet: Vec3,
    rotation: Quat,
    radius: f32,
) -> bool {
    let up = rotation * Vec3::Y;
    let forward = rotation * Vec3::Z;
    let reach = radius + 0.25 + config.walking_off_ledge.space_in_front_needed_to_grab_back_on;
    let origin = feet + up * 0.1 + forward * reach;
    terrain.probe_ray(origin, -up, 1.0, filter).is_none()
}

/// Look back under the ledge for a climbable face to turn onto.
pub fn find_grab_back<T: TerrainQuery + ?Sized>(
    terrain: &T,
    filter: &QueryFilter,
    config: &ClimbConfig,
    feet: Vec3,
    rotation: Quat,
    radius: f32,
) -> Option<TurnBackState> {
    let ledge = &config.walking_off_ledge;
    let up = rotation * Vec3::Y;
    let forward = rotation * Vec3::Z;
    let origin = feet
        + forward * (1.0 + ledge.grab_back_on_location_forward)
        + up * (ledge.grab_back_on_location_height - 0.5);

    let hit = terrain.probe_ray(origin, -forward, GRAB_PROBE_LENGTH, filter)?;
    if !hit.has_tag(&config.climbable_tag) || hit.normal.dot(forward) <= 0.5 {
        return None;
    }

    let mut target_position = hit.point + hit.normal * (radius + WALL_GAP);
    target_position.y = feet.y + ledge.grab_back_on_location_height - 1.5;
    log::debug!("turn-back: grabbing wall at {:?}", hit.point);

    Some(TurnBackState {
        target_position,
        target_rotation: look_rotation(-hit.normal),
        normal: hit.normal,
        elapsed_ms: 0,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::TerrainWorld;

    const FRAME_MS: u32 = 20;

    /// Climbable block whose top is the floor and whose edge is at z = 1.
    fn create_test_world() -> TerrainWorld {
        let mut world = TerrainWorld::new();
        world.add_tagged_box(Vec3::new(0.0, -2.0, -2.0), Vec3::new(2.0, 2.0, 3.0), "Ladder");
        world
    }

    #[test]
    fn test_ground_missing_at_edge_only() {
        let world = create_test_world();
        let filter = QueryFilter::ground(None);
        let config = ClimbConfig::default();

        assert!(!ground_missing_ahead(&world, &filter, &config, Vec3::new(0.0, 0.0, -1.0), Quat::IDENTITY, 0.5));
        assert!(ground_missing_ahead(&world, &filter, &config, Vec3::new(0.0, 0.0, 0.6), Quat::IDENTITY, 0.5));
    }

    #[test]
    fn test_grab_back_targets_wall_below() {
        let world = create_test_world();
        let filter = QueryFilter::ground(None);
        let config = ClimbConfig::default();

        let turn = find_grab_back(&world, &filter, &config, Vec3::new(0.0, 0.0, 0.6), Quat::IDENTITY, 0.5)
            .expect("climbable face below the ledge");
        assert!((turn.target_position - Vec3::new(0.0, -1.5, 1.52)).length() < 1e-3);
        assert!(((turn.target_rotation * Vec3::Z) - Vec3::NEG_Z).length() < 1e-3);
    }

    #[test]
    fn test_plain_wall_not_grabbed() {
        let mut world = TerrainWorld::new();
        world.add_box(Vec3::new(0.0, -2.0, -2.0), Vec3::new(2.0, 2.0, 3.0));
        let filter = QueryFilter::ground(None);

        let turn = find_grab_back(&world, &filter, &ClimbConfig::default(), Vec3::new(0.0, 0.0, 0.6), Quat::IDENTITY, 0.5);
        assert!(turn.is_none());
    }

    #[test]
    fn test_turn_completes_and_snaps() {
        let mut turn = TurnBackState {
            target_position: Vec3::new(0.0, -1.5, 1.52),
            target_rotation: look_rotation(Vec3::NEG_Z),
            normal: Vec3::Z,
            elapsed_ms: 0,
        };
        let mut position = Vec3::new(0.0, 0.0, 0.6);
        let mut rotation = Quat::IDENTITY;

        let mut done = false;
        for _ in 0..(TURN_LIMIT_MS / FRAME_MS) {
            done = turn.step(&mut position, &mut rotation, 0.02, FRAME_MS);
            if done {
                break;
            }
        }
        assert!(done);
        assert_eq!(position, turn.target_position);
        assert_eq!(rotation, turn.target_rotation);
    }
}
