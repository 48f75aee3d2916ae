//! Collide-and-slide movement.
//!
//! Sweeps the collider along the intended displacement. On each blocking
//! hit the remaining motion is clipped against the surface and the sweep
//! continues, so the body glides along walls and up gentle slopes instead
//! of stopping dead. Every surface touched is reported back as a contact.
//! A body that starts inside geometry is pushed clear before it moves.

use glam::Vec3;

use crate::terrain::{ColliderShape, QueryFilter, TerrainHit, TerrainQuery};

/// Maximum number of surfaces to slide along in one move.
const MAX_CLIP_PLANES: usize = 4;

/// Slightly over-clip so the body does not keep re-touching the same plane.
const OVERBOUNCE: f32 = 1.001;

/// Result of one slide move.
#[derive(Debug, Clone, Default)]
pub struct SlideMoveResult {
    /// Every blocking hit, in the order they were met.
    pub contacts: Vec<TerrainHit>,
    /// The collider started the move overlapping geometry.
    pub started_in_solid: bool,
}

impl SlideMoveResult {
    pub fn blocked(&self) -> bool {
        !self.contacts.is_empty()
    }
}

/// Remove the part of `velocity` going into a surface.
pub fn clip_velocity(velocity: Vec3, normal: Vec3, overbounce: f32) -> Vec3 {
    let backoff = velocity.dot(normal);
    let adjusted = if backoff < 0.0 {
        backoff * overbounce
    } else {
        backoff / overbounce
    };
    velocity - normal * adjusted
}

/// Move `position` by `displacement`, sliding along whatever is in the way.
pub fn slide_move<T: TerrainQuery + ?Sized>(
    terrain: &T,
    shape: &ColliderShape,
    position: &mut Vec3,
    displacement: Vec3,
    filter: &QueryFilter,
) -> SlideMoveResult {
    let mut result = SlideMoveResult::default();
    let mut remaining = displacement;
    let mut planes: [Vec3; MAX_CLIP_PLANES] = [Vec3::ZERO; MAX_CLIP_PLANES];
    let mut num_planes = 0;

    if terrain.overlaps(shape, *position, filter) {
        result.started_in_solid = true;
        *position = terrain.resolve_penetration(shape, *position, filter);
    }

    for _ in 0..MAX_CLIP_PLANES {
        if remaining.length_squared() < 1e-10 {
            break;
        }

        let sweep = terrain.sweep(shape, *position, *position + remaining, filter);
        if sweep.started_in_solid {
            result.started_in_solid = true;
        }
        *position = sweep.end_position;

        let Some(hit) = sweep.hit else {
            break;
        };
        if sweep.fraction >= 1.0 {
            break;
        }

        remaining *= 1.0 - sweep.fraction;
        let normal = hit.normal;
        result.contacts.push(hit);

        if num_planes < MAX_CLIP_PLANES {
            planes[num_planes] = normal;
            num_planes += 1;
        }

        // Find a direction that does not go into any plane seen so far
        let mut clipped = remaining;
        let mut found = false;
        for i in 0..num_planes {
            clipped = clip_velocity(remaining, planes[i], OVERBOUNCE);
            if (0..num_planes).all(|j| j == i || clipped.dot(planes[j]) >= -0.01) {
                found = true;
                break;
            }
        }

        if !found {
            if num_planes >= 2 {
                let crease = planes[0].cross(planes[1]).normalize_or_zero();
                clipped = crease * remaining.dot(crease);
            } else {
                break;
            }
        }
        remaining = clipped;
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
