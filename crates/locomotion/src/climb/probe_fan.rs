//! Stacked line probes in front of the body.
//!
//! Every climb check (can we grab on, which way does the wall face, have we
//! run out of wall) is the same shape of query: a column of short forward
//! segments at fixed fractions of the detector height, optionally shifted
//! sideways, optionally accepting only the climbable tag. [`ProbeFan`] is
//! that query, parametrised.

use glam::{Quat, Vec3};

use crate::movement::ClimbConfig;
use crate::terrain::{QueryFilter, TerrainHit, TerrainQuery};

/// Height fractions of the detection column, bottom to top.
pub const FAN_FRACTIONS: [f32; 6] = [0.1875, 0.375, 0.5625, 0.75, 0.9375, 1.125];

/// Order in which the rotation probes try the fractions: chest height first.
pub const ROTATION_ORDER: [f32; 6] = [0.5625, 0.375, 0.1875, 0.75, 0.9375, 1.125];

/// A column of forward probes anchored at one body pose.
pub struct ProbeFan<'a, T: TerrainQuery + ?Sized> {
    terrain: &'a T,
    filter: QueryFilter,
    /// Feet raised by the configured detector offset.
    base: Vec3,
    height: f32,
    length: f32,
    pub up: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
}

impl<'a, T: TerrainQuery + ?Sized> ProbeFan<'a, T> {
    pub fn new(terrain: &'a T, config: &ClimbConfig, filter: QueryFilter, feet: Vec3, rotation: Quat) -> Self {
        let up = rotation * Vec3::Y;
        Self {
            terrain,
            filter,
            base: feet + up * config.surface_detectors_up_amount,
            height: config.surface_detectors_height + 1.0,
            length: config.surface_detectors_length + 1.0,
            up,
            forward: rotation * Vec3::Z,
            right: rotation * Vec3::X,
        }
    }

    /// Start of the probe at `fraction` of the column height.
    pub fn point(&self, fraction: f32) -> Vec3 {
        self.base + self.up * (self.height * fraction)
    }

    /// Scaled detector height.
    pub fn height(&self) -> f32 {
        self.height
    }

    /// First hit over `fractions`, each segment running from the column
    /// point shifted by `lateral` to `length_scale` detector lengths ahead,
    /// shifted by `end_lateral`.
    pub fn cast(
        &self,
        fractions: &[f32],
        lateral: Vec3,
        end_lateral: Vec3,
        length_scale: f32,
        tag: Option<&str>,
    ) -> Option<TerrainHit> {
        fractions.iter().find_map(|&fraction| {
            let start = self.point(fraction);
            self.segment(
                start + lateral,
                start + end_lateral + self.forward * (self.length * length_scale),
                tag,
            )
        })
    }

    /// Straight-ahead column shifted sideways by `lateral`.
    pub fn straight(&self, fractions: &[f32], lateral: Vec3, length_scale: f32, tag: Option<&str>) -> Option<TerrainHit> {
        self.cast(fractions, lateral, lateral, length_scale, tag)
    }

    /// A single straight probe starting `height` above the column base.
    pub fn at_height(&self, height: f32, lateral: Vec3, tag: Option<&str>) -> Option<TerrainHit> {
        let start = self.base + self.up * height + lateral;
        self.segment(start, start + self.forward * self.length, tag)
    }

    fn segment(&self, start: Vec3, end: Vec3, tag: Option<&str>) -> Option<TerrainHit> {
        let hit = self.terrain.probe(start, end, &self.filter)?;
        match tag {
            Some(tag) if !hit.has_tag(tag) => None,
            _ => Some(hit),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
