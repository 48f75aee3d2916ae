//! The terrain query contract the locomotion core is written against.

use glam::Vec3;

use super::flags::BodyId;
use super::hit::{QueryFilter, Sweep, TerrainHit};
use super::shape::{BodyPose, ColliderShape};

/// Synchronous geometric queries against the world.
///
/// Hosts implement this over whatever collision backend they use;
/// [`TerrainWorld`](super::TerrainWorld) is the parry3d-backed reference.
/// A miss is a valid answer, never an error.
pub trait TerrainQuery {
    /// Cast a ray and return the closest hit within `max_distance`.
    fn probe_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter,
    ) -> Option<TerrainHit>;

    /// Test the segment from `origin` to `target`.
    fn probe(&self, origin: Vec3, target: Vec3, filter: &QueryFilter) -> Option<TerrainHit> {
        let delta = target - origin;
        let length = delta.length();
        if length <= f32::EPSILON {
            return None;
        }
        self.probe_ray(origin, delta / length, length, filter)
    }

    /// Sweep `shape` (feet at `start`) toward `end`.
    fn sweep(&self, shape: &ColliderShape, start: Vec3, end: Vec3, filter: &QueryFilter) -> Sweep;

    /// Whether `shape` placed with its feet at `position` overlaps anything.
    fn overlaps(&self, shape: &ColliderShape, position: Vec3, filter: &QueryFilter) -> bool;

    /// Move a collider that overlaps geometry to the nearest clear spot.
    ///
    /// The default lifts the body until it fits and leaves it in place when
    /// nothing within one collider height is clear.
    fn resolve_penetration(&self, shape: &ColliderShape, position: Vec3, filter: &QueryFilter) -> Vec3 {
        lift_clear(self, shape, position, filter)
    }

    /// Current world pose of a body, for platform riding.
    fn body_pose(&self, body: BodyId) -> Option<BodyPose>;
}

/// Steps tried when lifting a body out of geometry.
const LIFT_STEPS: u32 = 16;

pub(crate) fn lift_clear<T: TerrainQuery + ?Sized>(
    terrain: &T,
    shape: &ColliderShape,
    position: Vec3,
    filter: &QueryFilter,
) -> Vec3 {
    let step = shape.height() / LIFT_STEPS as f32;
    (1..=LIFT_STEPS)
        .map(|i| position + Vec3::Y * (step * i as f32))
        .find(|candidate| !terrain.overlaps(shape, *candidate, filter))
        .unwrap_or(position)
}
