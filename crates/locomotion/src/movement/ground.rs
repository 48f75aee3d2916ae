//! Ground and slope classification.
//!
//! A cluster of short downward probes decides whether the body is standing
//! on something, how steep that something is, whether the body faces up or
//! down the slope, and whether it is wedged in a trough between two steep
//! faces (where sliding would flip direction every tick).
//!
//! Probe misses are not errors. When nothing is hit the slope values keep
//! whatever they were last tick so jump eligibility does not flicker.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::terrain::{QueryFilter, TerrainHit, TerrainQuery};

use super::config::MovementConfig;
use super::state::Contact;

/// Probe origins sit this far above the collider bottom.
pub const PROBE_LIFT: f32 = 0.1;

/// Length of the primary slope ray.
const SLOPE_RAY_LENGTH: f32 = 1.0;

/// Length of the rays that compare ground height ahead of and behind the body.
const UPHILL_RAY_LENGTH: f32 = 5.0;

/// Everything the classifier knows about the ground this tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundReport {
    pub grounded: bool,
    /// Slope under the body in degrees. Held across ticks with no hit.
    pub slope_angle: f32,
    /// Whether the primary slope ray hit this tick.
    pub angle_hit: bool,
    /// Whether there is close enough ground to slide on.
    pub slide_possible: bool,
    /// Facing up the slope.
    pub uphill: bool,
    /// Wedged between two opposing steep faces.
    pub between_slidable_surfaces: bool,
    /// Closest ground point straight below, if any.
    pub ground_point: Option<Vec3>,
    pub ground_normal: Vec3,
}

impl Default for GroundReport {
    fn default() -> Self {
        Self {
            grounded: false,
            slope_angle: 0.0,
            angle_hit: false,
            slide_possible: false,
            uphill: false,
            between_slidable_surfaces: false,
            ground_point: None,
            ground_normal: Vec3::Y,
        }
    }
}

/// Downward probes around one body position.
pub struct GroundProbe<'a, T: TerrainQuery + ?Sized> {
    terrain: &'a T,
    config: &'a MovementConfig,
    filter: QueryFilter,
    origin: Vec3,
    forward: Vec3,
    right: Vec3,
}

impl<'a, T: TerrainQuery + ?Sized> GroundProbe<'a, T> {
    /// Probes for a body with its feet at `feet`, facing `rotation`.
    pub fn new(terrain: &'a T, config: &'a MovementConfig, filter: QueryFilter, feet: Vec3, rotation: Quat) -> Self {
        let forward = flat(rotation * Vec3::Z, Vec3::Z);
        let right = Vec3::Y.cross(forward);
        Self {
            terrain,
            config,
            filter,
            origin: feet + Vec3::Y * PROBE_LIFT,
            forward,
            right,
        }
    }

    /// Horizontal offsets of the grounded probes: center, inner ring at r/2,
    /// outer cross at r and outer diagonals at 0.75r.
    pub fn ring_offsets(&self) -> [Vec3; 17] {
        let r = self.config.grounded.max_grounded_radius - 0.0075;
        let (f, s) = (self.forward, self.right);
        let half = r / 2.0;
        let diag = r * 0.75;
        [
            Vec3::ZERO,
            -f * half,
            f * half,
            -s * half,
            s * half,
            (-f - s) * half,
            (f + s) * half,
            (-f + s) * half,
            (f - s) * half,
            -f * r,
            f * r,
            -s * r,
            s * r,
            (-f - s) * diag,
            (f + s) * diag,
            (-f + s) * diag,
            (f - s) * diag,
        ]
    }

    /// Stage: is any grounded probe touching something.
    ///
    /// When the primary slope ray missed last tick, the slope angle is taken
    /// from the first probe that hits, which covers standing on a ledge edge.
    pub fn determine_grounded(&self, report: &mut GroundReport) {
        let grounded = &self.config.grounded;
        let top = Vec3::Y * grounded.max_grounded_height;
        let bottom = Vec3::NEG_Y * grounded.max_grounded_distance;

        let first_hit = self
            .ring_offsets()
            .iter()
            .find_map(|offset| {
                let base = self.origin + *offset;
                self.terrain.probe(base + top, base + bottom, &self.filter)
            });

        match first_hit {
            Some(hit) => {
                if !report.angle_hit {
                    report.slope_angle = hit.slope_angle();
                }
                report.grounded = true;
            }
            None => report.grounded = false,
        }
    }

    /// Stage: slope angle, slide possibility, trough detection and uphill facing.
    pub fn slope_angles(&self, report: &mut GroundReport, contact: Option<&Contact>, mid_air_from_jump: bool) {
        let limit = self.config.slope_limit;
        let near = self.config.grounded.max_grounded_distance;

        let primary = self.ray_down(self.origin, SLOPE_RAY_LENGTH);
        report.angle_hit = primary.is_some();
        report.ground_point = primary.as_ref().map(|h| h.point);
        if let Some(hit) = &primary {
            report.ground_normal = hit.normal;
        }
        let primary_angle = primary.as_ref().map(TerrainHit::slope_angle);

        if let Some(close) = self.ray_down(self.origin, near) {
            report.slide_possible = true;
            let center = close.slope_angle();
            // A steeper neighbour wins so a seam between two faces still slides.
            let steeper = self
                .alt_offsets()
                .iter()
                .filter_map(|offset| self.ray_down(self.origin + *offset, near))
                .map(|h| h.slope_angle())
                .find(|angle| *angle > center);
            report.slope_angle = steeper.unwrap_or(center);
        } else if let Some(angle) = self.contact_slope(contact) {
            if primary_angle.map_or(true, |a| a > limit) {
                report.slide_possible = true;
                if primary_angle.is_some() {
                    report.slope_angle = angle;
                }
            }
        } else if let Some(angle) = primary_angle {
            report.slide_possible = true;
            report.slope_angle = angle;
        } else {
            report.slide_possible = false;
        }

        self.between_slopes(report, mid_air_from_jump);
        report.uphill = self.facing_uphill();
        if report.between_slidable_surfaces {
            report.uphill = false;
        }
    }

    /// Closest ground within `distance` straight below the probe origin.
    pub fn ground_below(&self, distance: f32) -> Option<TerrainHit> {
        self.ray_down(self.origin, distance)
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    fn ray_down(&self, origin: Vec3, length: f32) -> Option<TerrainHit> {
        self.terrain.probe_ray(origin, Vec3::NEG_Y, length, &self.filter)
    }

    fn alt_offsets(&self) -> [Vec3; 8] {
        let f = self.forward / 10.0;
        let s = self.right / 10.0;
        [f, -f, s, -s, f + s, f - s, -f + s, -f - s]
    }

    /// Slope under the last recorded contact, when it is a steep non-wall face.
    fn contact_slope(&self, contact: Option<&Contact>) -> Option<f32> {
        let contact = contact?;
        if contact.slope_angle >= 90.0 || contact.slope_angle <= self.config.slope_limit {
            return None;
        }
        self.ray_down(contact.point + Vec3::Y, 5.0).map(|h| h.slope_angle())
    }

    /// Paired left/right probes: both steeper than the limit with normals
    /// leaning toward each other means a V-shaped trough.
    fn between_slopes(&self, report: &mut GroundReport, mid_air_from_jump: bool) {
        let limit = self.config.slope_limit;
        let f = self.forward;
        let s = self.right;
        let pairs = [
            (-s / 5.0, s / 5.0),
            (-s / 25.0, s / 25.0),
            (f / 25.0 - s / 25.0, f / 25.0 + s / 25.0),
            (-s / 3.0, s / 3.0),
        ];

        let mut any_pair_hit = false;
        for (left, right) in pairs {
            let (Some(l), Some(r)) = (
                self.ray_down(self.origin + left, SLOPE_RAY_LENGTH),
                self.ray_down(self.origin + right, SLOPE_RAY_LENGTH),
            ) else {
                continue;
            };
            any_pair_hit = true;
            let opposing = l.normal.dot(s) > 0.0 && r.normal.dot(s) < 0.0;
            if opposing && l.slope_angle() > limit && r.slope_angle() > limit {
                report.between_slidable_surfaces = true;
                return;
            }
        }

        if any_pair_hit || !mid_air_from_jump {
            report.between_slidable_surfaces = false;
        }
    }

    fn facing_uphill(&self) -> bool {
        let front = self.ray_down(self.origin + self.forward / 2.0 + Vec3::Y, UPHILL_RAY_LENGTH);
        let back = self.ray_down(self.origin - self.forward / 2.0 + Vec3::Y, UPHILL_RAY_LENGTH);
        match (front, back) {
            (Some(front), Some(back)) => front.point.y >= back.point.y,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

/// Horizontal unit vector of `v`, or `fallback` if `v` is vertical.
pub fn flat(v: Vec3, fallback: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z).try_normalize().unwrap_or(fallback)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{BodyPose, LayerMask, TerrainWorld};

    fn flat_world() -> TerrainWorld {
        let mut world = TerrainWorld::new();
        world.add_box(Vec3::new(0.0, -0.5, 0.0), Vec3::new(20.0, 0.5, 20.0));
        world
    }

    /// A ramp rising toward +Z at `degrees`, passing through the origin.
    fn ramp_world(degrees: f32) -> TerrainWorld {
        let mut world = TerrainWorld::new();
        let tilt = Quat::from_rotation_x(-degrees.to_radians());
        world.add_oriented_box(
            Vec3::new(10.0, 0.5, 10.0),
            BodyPose {
                translation: tilt * Vec3::new(0.0, -0.5, 0.0),
                rotation: tilt,
                scale: Vec3::ONE,
            },
            LayerMask::SOLID,
            None,
        );
        world
    }

    fn classify(world: &TerrainWorld, feet: Vec3, facing: Quat) -> GroundReport {
        let config = MovementConfig::default();
        let probe = GroundProbe::new(world, &config, QueryFilter::ground(None), feet, facing);
        let mut report = GroundReport::default();
        probe.determine_grounded(&mut report);
        probe.slope_angles(&mut report, None, false);
        report
    }

    #[test]
    fn test_grounded_on_flat_floor() {
        let world = flat_world();
        let report = classify(&world, Vec3::ZERO, Quat::IDENTITY);

        assert!(report.grounded);
        assert!(report.angle_hit);
        assert!(report.slope_angle < 0.5);
        assert!(!report.between_slidable_surfaces);
    }

    #[test]
    fn test_not_grounded_in_air() {
        let world = flat_world();
        let report = classify(&world, Vec3::new(0.0, 2.0, 0.0), Quat::IDENTITY);
        assert!(!report.grounded);
        assert!(!report.angle_hit);
    }

    #[test]
    fn test_slope_angle_held_when_nothing_hit() {
        let world = ramp_world(40.0);
        let config = MovementConfig::default();

        let on_ramp = GroundProbe::new(&world, &config, QueryFilter::ground(None), Vec3::ZERO, Quat::IDENTITY);
        let mut report = GroundReport::default();
        on_ramp.determine_grounded(&mut report);
        on_ramp.slope_angles(&mut report, None, false);
        assert!((report.slope_angle - 40.0).abs() < 1.0);

        let airborne = GroundProbe::new(
            &world,
            &config,
            QueryFilter::ground(None),
            Vec3::new(0.0, 10.0, 0.0),
            Quat::IDENTITY,
        );
        airborne.determine_grounded(&mut report);
        airborne.slope_angles(&mut report, None, false);
        assert!(!report.grounded);
        assert!((report.slope_angle - 40.0).abs() < 1.0);
    }

    #[test]
    fn test_uphill_facing() {
        let world = ramp_world(30.0);
        // Ramp rises toward +Z
        let facing_up = classify(&world, Vec3::ZERO, Quat::IDENTITY);
        assert!(facing_up.uphill);

        let facing_down = classify(&world, Vec3::ZERO, Quat::from_rotation_y(std::f32::consts::PI));
        assert!(!facing_down.uphill);
    }

    #[test]
    fn test_trough_between_two_slopes() {
        let mut world = TerrainWorld::new();
        // Two 45 degree faces meeting in a V along the Z axis
        for side in [-1.0_f32, 1.0] {
            let tilt = Quat::from_rotation_z(side * 45_f32.to_radians());
            world.add_oriented_box(
                Vec3::new(2.0, 0.5, 10.0),
                BodyPose {
                    translation: tilt * Vec3::new(side * 2.0, -0.5, 0.0),
                    rotation: tilt,
                    scale: Vec3::ONE,
                },
                LayerMask::SOLID,
                None,
            );
        }

        // Hovering slightly so the paired probes start above both faces
        let report = classify(&world, Vec3::new(0.0, 0.3, 0.0), Quat::IDENTITY);
        assert!(report.between_slidable_surfaces);
        assert!(!report.uphill);
    }

    #[test]
    fn test_ring_has_seventeen_distinct_probes() {
        let world = flat_world();
        let config = MovementConfig::default();
        let probe = GroundProbe::new(&world, &config, QueryFilter::ground(None), Vec3::ZERO, Quat::IDENTITY);
        let offsets = probe.ring_offsets();
        for (i, a) in offsets.iter().enumerate() {
            for b in &offsets[i + 1..] {
                assert!((*a - *b).length() > 1e-4);
            }
        }
        assert!((probe.origin().y - PROBE_LIFT).abs() < 1e-6);
    }
}
