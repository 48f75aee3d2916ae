//! Keeping a climbing body against its wall.
//!
//! Two failure modes are handled. Drifting off the surface (the body ends
//! up too far from the wall) is fixed by nudging forward. Snagging on a
//! collider (input held, position unchanged) is fixed by snapping the body
//! to a set distance from the wall or backing off slightly.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::terrain::{QueryFilter, TerrainHit, TerrainQuery};

/// Distance from the wall beyond which the body counts as drifting off.
const DRIFT_DISTANCE: f32 = 0.35;

/// Reference wall distance of a body resting against it.
const REST_DISTANCE: f32 = 0.2601;

/// Ticks without contact after which a stuck body is considered free-floating.
const NO_COLLISION_STUCK_TICKS: u32 = 25;

/// What the monitor needs to know about this tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct StuckInput {
    pub climbing: bool,
    pub pulling_up: bool,
    /// Climb speed is above zero.
    pub moving: bool,
    pub horizontal: f32,
    pub vertical: f32,
    /// Sideways climbing is possible (no side-scrolling axis lock).
    pub lateral_allowed: bool,
    /// The body has moved at least once since grabbing on.
    pub has_moved: bool,
    /// The body has climbed up at least once since grabbing on.
    pub climbed_up: bool,
    pub no_collision_ticks: u32,
}

/// Stuck detection carried between ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StuckMonitor {
    first_distance: f32,
    distance: f32,
    stuck: bool,
    stuck_without_contact: bool,
    last_position: Option<Vec3>,
    last_rotation: Option<Quat>,
}

impl StuckMonitor {
    pub fn is_stuck(&self) -> bool {
        self.stuck
    }

    /// Check and correct the body position. Returns true if it was moved.
    pub fn update<T: TerrainQuery + ?Sized>(
        &mut self,
        terrain: &T,
        filter: &QueryFilter,
        position: &mut Vec3,
        rotation: Quat,
        input: &StuckInput,
    ) -> bool {
        let start = *position;
        let forward = rotation * Vec3::Z;
        let up = rotation * Vec3::Y;

        if let Some(hit) = wall_ahead(terrain, filter, *position, forward, up, 1.0) {
            self.distance = horizontal_distance(hit.point, *position);
            let drifting = self.distance >= DRIFT_DISTANCE
                || (self.first_distance != 0.0 && self.distance >= self.first_distance + 0.05);
            if input.climbing && !input.pulling_up && drifting && input.no_collision_ticks >= 5 {
                *position += forward / 30.0;
            }
            if input.climbing {
                if self.first_distance == 0.0 {
                    self.first_distance = self.distance;
                }
            } else {
                self.first_distance = 0.0;
            }
        }

        if input.climbed_up {
            self.check_snag(terrain, filter, position, rotation, input);
            self.last_position = Some(*position);
        }
        self.last_rotation = Some(rotation);

        (*position - start).length_squared() > 0.0
    }

    fn check_snag<T: TerrainQuery + ?Sized>(
        &mut self,
        terrain: &T,
        filter: &QueryFilter,
        position: &mut Vec3,
        rotation: Quat,
        input: &StuckInput,
    ) {
        let forward = rotation * Vec3::Z;
        let up = rotation * Vec3::Y;
        if !self.stuck || input.pulling_up {
            self.stuck_without_contact = false;
        } else if input.no_collision_ticks > NO_COLLISION_STUCK_TICKS {
            self.stuck_without_contact = true;
        }

        let lateral = input.lateral_allowed && input.horizontal != 0.0;
        if !(input.climbing && input.moving && (lateral || input.vertical != 0.0)) {
            return;
        }

        let unmoved = self.last_position.is_some_and(|p| same_position(p, *position));
        let turned = self.last_rotation.is_some_and(|r| r.angle_between(rotation) > 1e-4);

        if unmoved && input.no_collision_ticks < 5 {
            if let Some(hit) = wall_ahead(terrain, filter, *position, forward, up, 0.5) {
                self.distance = horizontal_distance(hit.point, *position);
            }
            let pushing = (input.lateral_allowed && input.horizontal.abs() > 0.1) || input.vertical.abs() > 0.1;
            if input.has_moved && pushing {
                self.stuck = true;
            }
        }

        let dy = self.last_position.map_or(0.0, |p| (position.y - p.y).abs());
        if turned || dy > 0.001 || (self.stuck_without_contact && input.no_collision_ticks < 2) {
            self.stuck = false;
            self.stuck_without_contact = false;
        }

        if !input.pulling_up && self.stuck {
            if let Some(hit) = wall_ahead(terrain, filter, *position, forward, up, 0.5) {
                let target = rest_point(&hit, self.distance);
                position.x = target.x;
                position.z = target.z;
            } else if (unmoved && !turned) || input.no_collision_ticks < 2 {
                *position -= forward / 100.0;
            }
        }

        if input.pulling_up && input.no_collision_ticks < 5 && unmoved {
            *position -= forward / 25.0;
            *position += up / 15.0;
        }
    }
}

/// Point at the resting distance from the wall hit, scaled by how far away
/// the body measured itself.
pub fn rest_point(hit: &TerrainHit, distance: f32) -> Vec3 {
    if distance != 0.0 {
        let ratio = distance / REST_DISTANCE;
        hit.point + hit.normal * (0.07 / REST_DISTANCE) * ratio
    } else {
        hit.point + hit.normal / 3.5
    }
}

/// Forward line probe at waist height, retried twice slightly higher.
fn wall_ahead<T: TerrainQuery + ?Sized>(
    terrain: &T,
    filter: &QueryFilter,
    position: Vec3,
    forward: Vec3,
    up: Vec3,
    length: f32,
) -> Option<TerrainHit> {
    [1.0, 1.1, 1.2].iter().find_map(|&height| {
        let start = position + up * height;
        terrain.probe(start, start + forward * length, filter)
    })
}

fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    Vec3::new(a.x - b.x, 0.0, a.z - b.z).length()
}

fn same_position(a: Vec3, b: Vec3) -> bool {
    (a - b).length_squared() < 1e-10
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::TerrainWorld;

    fn create_test_world() -> TerrainWorld {
        let mut world = TerrainWorld::new();
        // Wall face at z = 0.6
        world.add_tagged_box(Vec3::new(0.0, 2.0, 1.1), Vec3::new(3.0, 2.0, 0.5), "Ladder");
        world
    }

    fn climbing() -> StuckInput {
        StuckInput {
            climbing: true,
            moving: true,
            vertical: 1.0,
            has_moved: true,
            climbed_up: true,
            ..StuckInput::default()
        }
    }

    #[test]
    fn test_drifting_body_nudged_forward() {
        let world = create_test_world();
        let filter = QueryFilter::ground(None);
        let mut monitor = StuckMonitor::default();
        let mut position = Vec3::new(0.0, 1.0, 0.0);

        let input = StuckInput {
            no_collision_ticks: 10,
            climbed_up: false,
            ..climbing()
        };
        assert!(monitor.update(&world, &filter, &mut position, Quat::IDENTITY, &input));
        assert!((position.z - 1.0 / 30.0).abs() < 1e-5);
    }

    #[test]
    fn test_overhang_seen_by_highest_probe() {
        let mut world = TerrainWorld::new();
        // Face at z = 0.6, starting just above the 1.1 probe
        world.add_tagged_box(Vec3::new(0.0, 2.1, 1.1), Vec3::new(3.0, 0.95, 0.5), "Ladder");
        let filter = QueryFilter::ground(None);
        let mut monitor = StuckMonitor::default();
        let mut position = Vec3::ZERO;

        let input = StuckInput {
            no_collision_ticks: 10,
            climbed_up: false,
            ..climbing()
        };
        assert!(monitor.update(&world, &filter, &mut position, Quat::IDENTITY, &input));
        assert!((position.z - 1.0 / 30.0).abs() < 1e-5);
    }

    #[test]
    fn test_snagged_body_snaps_to_rest_distance() {
        let world = create_test_world();
        let filter = QueryFilter::ground(None);
        let mut monitor = StuckMonitor::default();
        let mut position = Vec3::new(0.0, 1.0, 0.3);

        // Touching the wall, same position two ticks in a row with input held
        monitor.update(&world, &filter, &mut position, Quat::IDENTITY, &climbing());
        monitor.update(&world, &filter, &mut position, Quat::IDENTITY, &climbing());
        assert!(monitor.is_stuck());

        let expected = 0.6 - (0.07 / REST_DISTANCE) * (0.3 / REST_DISTANCE);
        assert!((position.z - expected).abs() < 1e-3, "z = {}", position.z);
        assert_eq!(position.y, 1.0);
    }

    #[test]
    fn test_vertical_progress_clears_stuck() {
        let world = create_test_world();
        let filter = QueryFilter::ground(None);
        let mut monitor = StuckMonitor::default();
        let mut position = Vec3::new(0.0, 1.0, 0.3);

        monitor.update(&world, &filter, &mut position, Quat::IDENTITY, &climbing());
        monitor.update(&world, &filter, &mut position, Quat::IDENTITY, &climbing());
        assert!(monitor.is_stuck());

        position.y += 0.1;
        monitor.update(&world, &filter, &mut position, Quat::IDENTITY, &climbing());
        assert!(!monitor.is_stuck());
    }

    #[test]
    fn test_rest_point_at_zero_distance() {
        let hit = TerrainHit {
            point: Vec3::new(0.0, 1.0, 0.6),
            normal: Vec3::NEG_Z,
            distance: 0.0,
            body: crate::terrain::BodyId(0),
            tag: None,
            layers: crate::terrain::LayerMask::SOLID,
        };
        let point = rest_point(&hit, 0.0);
        assert!((point.z - (0.6 - 1.0 / 3.5)).abs() < 1e-5);
    }
}
