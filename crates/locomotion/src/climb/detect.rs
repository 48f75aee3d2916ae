//! Finding climbable surfaces and their edges.

use glam::Vec3;

use crate::movement::ClimbConfig;
use crate::terrain::{TerrainHit, TerrainQuery};

use super::context::EdgeFlags;
use super::probe_fan::{ProbeFan, FAN_FRACTIONS};

/// Lateral start of the wall-in-front side columns, as a fraction of right.
const WALL_SPREAD: f32 = 1.0 / 4.25;

/// The right column converges slightly toward the center by its far end.
const WALL_SPREAD_RIGHT_END: f32 = 1.0 / 4.5;

/// A climbable surface in front of the body.
#[derive(Debug, Clone, PartialEq)]
pub struct WallScan {
    /// First climbable hit of the center column.
    pub hit: TerrainHit,
    /// Center and both side columns touch something, climbable or not.
    pub wall_in_front: bool,
    /// Horizontal offset from the feet to the climbable object's center,
    /// along the wall.
    pub center_offset: Vec3,
}

/// Look for a surface tagged `tag` ahead of the fan's pose.
pub fn scan_wall<T: TerrainQuery + ?Sized>(fan: &ProbeFan<'_, T>, terrain: &T, tag: &str, feet: Vec3) -> Option<WallScan> {
    let hit = fan.straight(&FAN_FRACTIONS, Vec3::ZERO, 1.0, Some(tag))?;

    let spread = fan.right * WALL_SPREAD;
    let wall_in_front = fan.straight(&FAN_FRACTIONS, Vec3::ZERO, 1.0, None).is_some()
        && fan
            .cast(&FAN_FRACTIONS, spread, fan.right * WALL_SPREAD_RIGHT_END, 1.0, None)
            .is_some()
        && fan.straight(&FAN_FRACTIONS, -spread, 1.0, None).is_some();

    let center_offset = fan
        .straight(&FAN_FRACTIONS, Vec3::ZERO, 2.0, Some(tag))
        .and_then(|far| terrain.body_pose(far.body))
        .map(|pose| along_wall(pose.translation - feet, hit.normal))
        .unwrap_or(Vec3::ZERO);

    Some(WallScan {
        hit,
        wall_in_front,
        center_offset,
    })
}

/// Which directions have run out of climbable surface.
pub fn probe_edges<T: TerrainQuery + ?Sized>(fan: &ProbeFan<'_, T>, config: &ClimbConfig, tag: &str) -> EdgeFlags {
    let height = fan.height();
    let side_height = 0.5625 * height + config.side_no_surface_detectors_height;
    let side = fan.right * (0.5 + config.side_no_surface_detectors_width);

    EdgeFlags {
        top: fan
            .at_height(1.3125 * height + config.top_no_surface_detector_height, Vec3::ZERO, Some(tag))
            .is_none(),
        bottom: fan
            .at_height(config.bottom_no_surface_detector_height - 0.1, Vec3::ZERO, Some(tag))
            .is_none(),
        left: fan.at_height(side_height, -side, Some(tag)).is_none(),
        right: fan.at_height(side_height, side, Some(tag)).is_none(),
    }
}

/// Horizontal part of `offset` with the component into the wall removed.
fn along_wall(offset: Vec3, normal: Vec3) -> Vec3 {
    let flat = Vec3::new(offset.x, 0.0, offset.z);
    let flat_normal = Vec3::new(normal.x, 0.0, normal.z).normalize_or_zero();
    flat - flat_normal * flat.dot(flat_normal)
}

// ============================================================================
// Tests
// ============================================================================
