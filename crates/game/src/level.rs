//! Level geometry, spawn points and moving platforms.

use std::f32::consts::PI;

use clamber_locomotion::{BodyId, BodyPose, LayerMask, TerrainError, TerrainWorld};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A game level: terrain plus the things that move in it.
#[derive(Debug)]
pub struct Level {
    /// Level identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Everything the characters can stand on, climb or swim in.
    pub terrain: TerrainWorld,

    /// Player spawn points.
    pub spawn_points: Vec<SpawnPoint>,

    /// Platforms driven by the simulation clock.
    pub platforms: Vec<MovingPlatform>,
}

/// A spawn point for players.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    /// Position in world space.
    pub position: Vec3,

    /// Initial facing (yaw in radians).
    pub facing: f32,
}

impl SpawnPoint {
    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.facing)
    }
}

/// A platform that travels back and forth along a straight line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovingPlatform {
    pub body: BodyId,

    /// Position at time zero.
    pub origin: Vec3,

    /// Offset of the far end of the track.
    pub travel: Vec3,

    /// Time for a full there-and-back cycle.
    pub period_ms: u64,
}

impl MovingPlatform {
    /// Position along the track at `time_ms`.
    pub fn position_at(&self, time_ms: u64) -> Vec3 {
        if self.period_ms == 0 {
            return self.origin;
        }
        let phase = (time_ms % self.period_ms) as f32 / self.period_ms as f32;
        let t = if phase < 0.5 { phase * 2.0 } else { 2.0 - phase * 2.0 };
        self.origin + self.travel * t
    }
}

impl Level {
    /// Create an empty level.
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            terrain: TerrainWorld::new(),
            spawn_points: Vec::new(),
            platforms: Vec::new(),
        }
    }

    /// A course with one of everything the locomotion core handles.
    ///
    /// Layout, looking down with +Z north:
    /// - ladder north of the spawn, face at z = 7.5
    /// - crawlspace ceiling to the south, 1.5 above the floor
    /// - 20° ramp to the west, 35° slope to the east
    /// - pool in the south-west corner
    /// - platform far east, moving north and back every 4 s
    /// - mesh ramp in the north-west, solid wedge in the south-east
    pub fn test_course() -> Self {
        let mut level = Self::new("test_course", "Test Course");

        // Floor
        level
            .terrain
            .add_box(Vec3::new(0.0, -0.5, 0.0), Vec3::new(40.0, 0.5, 40.0));

        level
            .terrain
            .add_tagged_box(Vec3::new(0.0, 3.0, 8.0), Vec3::new(1.5, 3.0, 0.5), "Ladder");

        level
            .terrain
            .add_box(Vec3::new(0.0, 2.0, -8.0), Vec3::new(2.0, 0.5, 2.0));

        level.add_slope(Vec3::new(-10.0, 0.0, 0.0), 20.0);
        level.add_slope(Vec3::new(10.0, 0.0, 0.0), 35.0);

        level
            .terrain
            .add_liquid(Vec3::new(-10.0, 1.0, -10.0), Vec3::new(4.0, 1.0, 4.0));

        level.add_moving_platform(
            Vec3::new(20.0, 0.25, 0.0),
            Vec3::new(2.0, 0.25, 2.0),
            Vec3::new(0.0, 0.0, 6.0),
            4000,
        );

        let ramp = level.add_mesh_ramp(Vec3::new(-24.0, 0.0, 12.0), Vec3::new(-20.0, 0.0, 20.0), 2.0);
        let wedge = level.add_wedge(Vec3::new(16.0, 0.0, -14.0), Vec3::new(24.0, 0.0, -8.0), 1.5);
        for err in [ramp.err(), wedge.err()].into_iter().flatten() {
            log::warn!("test course geometry skipped: {err}");
        }

        level.spawn_points.push(SpawnPoint {
            position: Vec3::ZERO,
            facing: 0.0,
        });
        level.spawn_points.push(SpawnPoint {
            position: Vec3::new(5.0, 0.0, 0.0),
            facing: PI,
        });

        level
    }

    /// A slab centered at `center`, tilted about X by `degrees` and rising toward -Z.
    pub fn add_slope(&mut self, center: Vec3, degrees: f32) -> BodyId {
        let pose = BodyPose {
            rotation: Quat::from_rotation_x(degrees.to_radians()),
            ..BodyPose::at(center)
        };
        self.terrain
            .add_oriented_box(Vec3::new(3.0, 0.25, 6.0), pose, LayerMask::SOLID, None)
    }

    /// A single-sided triangle-mesh ramp over the floor rectangle `from`..`to`,
    /// rising by `rise` toward +Z.
    pub fn add_mesh_ramp(&mut self, from: Vec3, to: Vec3, rise: f32) -> Result<BodyId, TerrainError> {
        let top = from.y + rise;
        let vertices = [
            Vec3::new(from.x, from.y, from.z),
            Vec3::new(to.x, from.y, from.z),
            Vec3::new(from.x, top, to.z),
            Vec3::new(to.x, top, to.z),
        ];
        // Counter-clockwise seen from above
        let indices = [[0, 2, 1], [1, 2, 3]];
        self.terrain
            .add_triangle_mesh(&vertices, &indices, LayerMask::SOLID, None)
    }

    /// A solid wedge over the floor rectangle `from`..`to`, rising by `rise` toward +Z.
    pub fn add_wedge(&mut self, from: Vec3, to: Vec3, rise: f32) -> Result<BodyId, TerrainError> {
        let top = from.y + rise;
        let points = [
            Vec3::new(from.x, from.y, from.z),
            Vec3::new(to.x, from.y, from.z),
            Vec3::new(from.x, from.y, to.z),
            Vec3::new(to.x, from.y, to.z),
            Vec3::new(from.x, top, to.z),
            Vec3::new(to.x, top, to.z),
        ];
        self.terrain.add_convex_hull(&points, LayerMask::SOLID)
    }

    /// Add a box tagged as a moving platform and drive it along `travel`.
    pub fn add_moving_platform(
        &mut self,
        origin: Vec3,
        half_extents: Vec3,
        travel: Vec3,
        period_ms: u64,
    ) -> BodyId {
        let body = self.terrain.add_tagged_box(origin, half_extents, "Platform");
        self.platforms.push(MovingPlatform {
            body,
            origin,
            travel,
            period_ms,
        });
        body
    }

    /// Move every platform to where it is at `time_ms`.
    pub fn advance(&mut self, time_ms: u64) {
        for platform in &self.platforms {
            let position = platform.position_at(time_ms);
            if let Err(err) = self.terrain.set_translation(platform.body, position) {
                log::warn!("platform {:?} not moved: {err}", platform.body);
            }
        }
    }

    /// Get a player spawn point by index.
    pub fn get_player_spawn(&self, index: usize) -> Option<&SpawnPoint> {
        self.spawn_points.get(index)
    }

    /// Get the number of player spawn points.
    pub fn player_spawn_count(&self) -> usize {
        self.spawn_points.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
