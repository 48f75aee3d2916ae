//! Probe hits, sweep results and query filters.

use std::fmt;
use std::sync::Arc;

use glam::Vec3;

use super::flags::{BodyId, LayerMask};

/// Designer-assigned marker on a terrain body ("Ladder", "Platform").
///
/// Cheap to clone; many bodies usually share the same few tags.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SurfaceTag(Arc<str>);

impl SurfaceTag {
    pub fn new(tag: &str) -> Self {
        Self(Arc::from(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SurfaceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceTag({:?})", &*self.0)
    }
}

impl From<&str> for SurfaceTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// A single ray or segment intersection.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainHit {
    /// World-space point of impact.
    pub point: Vec3,
    /// Surface normal at the impact, pointing away from the surface.
    pub normal: Vec3,
    /// Distance from the probe origin.
    pub distance: f32,
    /// Body that was hit.
    pub body: BodyId,
    /// Tag of the body, if it has one.
    pub tag: Option<SurfaceTag>,
    /// Layers of the body.
    pub layers: LayerMask,
}

impl TerrainHit {
    /// Angle between the surface normal and world up, in degrees.
    pub fn slope_angle(&self) -> f32 {
        slope_angle(self.normal)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag.as_ref().is_some_and(|t| t.as_str() == tag)
    }
}

/// Angle between `normal` and world up, in degrees.
pub fn slope_angle(normal: Vec3) -> f32 {
    normal.y.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Result of sweeping a collider from one position to another.
#[derive(Debug, Clone, PartialEq)]
pub struct Sweep {
    /// How far along the path the collider got: 1.0 is unobstructed.
    pub fraction: f32,
    /// Position the collider stopped at.
    pub end_position: Vec3,
    /// What stopped it, if anything.
    pub hit: Option<TerrainHit>,
    /// Whether the start position already overlapped geometry.
    pub started_in_solid: bool,
}

impl Sweep {
    /// An unobstructed sweep ending at `end`.
    pub fn clear(end: Vec3) -> Self {
        Self {
            fraction: 1.0,
            end_position: end,
            hit: None,
            started_in_solid: false,
        }
    }

    pub fn blocked(&self) -> bool {
        self.hit.is_some() && self.fraction < 1.0
    }
}

/// Which bodies a query may hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryFilter {
    pub layers: LayerMask,
    /// The querying body itself, when it is part of the terrain.
    pub exclude: Option<BodyId>,
}

impl QueryFilter {
    /// Everything solid, liquids and triggers excluded.
    pub fn ground(exclude: Option<BodyId>) -> Self {
        Self {
            layers: LayerMask::GROUND,
            exclude,
        }
    }

    /// Every layer except triggers.
    pub fn all(exclude: Option<BodyId>) -> Self {
        Self {
            layers: LayerMask::ALL.without(LayerMask::TRIGGER),
            exclude,
        }
    }

    /// Only liquid volumes.
    pub fn liquid(exclude: Option<BodyId>) -> Self {
        Self {
            layers: LayerMask::LIQUID,
            exclude,
        }
    }

    pub fn accepts(&self, body: BodyId, layers: LayerMask) -> bool {
        self.exclude != Some(body) && self.layers.intersects(layers)
    }
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self::ground(None)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_with_normal(normal: Vec3) -> TerrainHit {
        TerrainHit {
            point: Vec3::ZERO,
            normal,
            distance: 0.0,
            body: BodyId(0),
            tag: Some(SurfaceTag::new("Ladder")),
            layers: LayerMask::SOLID,
        }
    }

    #[test]
    fn test_slope_angle() {
        assert!(hit_with_normal(Vec3::Y).slope_angle().abs() < 0.01);
        assert!((hit_with_normal(Vec3::X).slope_angle() - 90.0).abs() < 0.01);

        let forty_five = Vec3::new(1.0, 1.0, 0.0).normalize();
        assert!((hit_with_normal(forty_five).slope_angle() - 45.0).abs() < 0.01);
    }

    #[test]
    fn test_slope_angle_clamps_denormalized_normal() {
        assert_eq!(slope_angle(Vec3::new(0.0, 1.0001, 0.0)), 0.0);
    }

    #[test]
    fn test_has_tag() {
        let hit = hit_with_normal(Vec3::Y);
        assert!(hit.has_tag("Ladder"));
        assert!(!hit.has_tag("Platform"));
    }

    #[test]
    fn test_filter_excludes_self_and_layers() {
        let filter = QueryFilter::ground(Some(BodyId(3)));
        assert!(filter.accepts(BodyId(1), LayerMask::SOLID));
        assert!(!filter.accepts(BodyId(3), LayerMask::SOLID));
        assert!(!filter.accepts(BodyId(1), LayerMask::LIQUID));
    }
}
