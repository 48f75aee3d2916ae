//! Per-attachment climbing state.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::movement::{ClimbConfig, LocomotionMode};
use crate::terrain::BodyId;

use super::detect::WallScan;
use super::pull_up::PullUpState;
use super::rotation::RotationProgress;
use super::stuck::StuckMonitor;
use super::turn_back::TurnBackState;

/// Which part of the climb the body is in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClimbPhase {
    #[default]
    Climbing,
    TurningBack,
    PullingUp,
}

impl ClimbPhase {
    pub fn mode(self) -> LocomotionMode {
        match self {
            Self::Climbing => LocomotionMode::WallClimbing,
            Self::TurningBack => LocomotionMode::TurningBack,
            Self::PullingUp => LocomotionMode::PullingUp,
        }
    }
}

/// Directions in which the climbable surface has run out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeFlags {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

/// Pull toward the horizontal center of the climbable object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapState {
    /// Fraction of the remaining offset covered per second.
    pub rate: f32,
    pub elapsed_ms: u32,
    pub duration_ms: u32,
    pub active: bool,
}

impl SnapState {
    /// Grabbing on from the ground.
    pub fn from_ground() -> Self {
        Self {
            rate: 15.0,
            elapsed_ms: 0,
            duration_ms: 600,
            active: true,
        }
    }

    /// Grabbing on after turning back at a ledge.
    pub fn from_turn_back() -> Self {
        Self {
            rate: 13.0,
            elapsed_ms: 0,
            duration_ms: 300,
            active: true,
        }
    }

    /// Displacement toward the center for this tick.
    pub fn step(&mut self, offset: Vec3, dt: f32, delta_ms: u32) -> Vec3 {
        if !self.active {
            return Vec3::ZERO;
        }
        self.elapsed_ms = self.elapsed_ms.saturating_add(delta_ms);
        if self.elapsed_ms >= self.duration_ms {
            self.active = false;
        }
        offset * (self.rate * dt).min(1.0)
    }
}

/// Climb speed modulation for burst climbing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurstState {
    pub movement: f32,
    pub rising: bool,
}

impl Default for BurstState {
    fn default() -> Self {
        Self {
            movement: 0.0,
            rising: true,
        }
    }
}

impl BurstState {
    /// Advance one tick and return the current climb speed.
    pub fn update(&mut self, config: &ClimbConfig, dt: f32) -> f32 {
        let speed = config.climb_movement_speed;
        if !config.move_in_bursts {
            self.movement = speed;
            return speed;
        }

        let target = if self.rising { speed } else { 0.0 };
        let rate = ((2.0 + speed) * (self.movement / 2.0 + 1.0)) / config.burst_length * dt;
        self.movement += (target - self.movement) * rate.min(1.0);

        if self.rising && speed - self.movement < 0.1 {
            self.rising = false;
        } else if !self.rising && self.movement < 0.1 {
            self.rising = true;
        }
        self.movement
    }
}

/// Everything known about the current climb. Exists only while attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimbContext {
    pub phase: ClimbPhase,
    /// Tag of the surface being climbed.
    pub tag: String,
    pub body: Option<BodyId>,
    pub attach_point: Vec3,
    pub wall_normal: Vec3,
    /// Horizontal offset from the feet to the climbable object's center.
    pub center_offset: Vec3,
    pub edges: EdgeFlags,
    pub rotation: RotationProgress,
    pub snap: SnapState,
    pub burst: BurstState,
    pub stuck: StuckMonitor,
    /// Climb velocity in world space.
    pub direction: Vec3,
    /// Downward climbing allowed (locked after touching the floor).
    pub down_enabled: bool,
    pub climbed_up: bool,
    pub has_moved: bool,
    /// Height at the end of the last tick, for fall avoidance.
    pub last_height: Option<f32>,
    pub pull_up: Option<PullUpState>,
    pub turn_back: Option<TurnBackState>,
}

impl ClimbContext {
    /// Grab onto the surface found by `scan`.
    pub fn attach(scan: &WallScan, tag: &str, edges: EdgeFlags, snap: SnapState) -> Self {
        Self {
            phase: ClimbPhase::Climbing,
            tag: tag.to_string(),
            body: Some(scan.hit.body),
            attach_point: scan.hit.point,
            wall_normal: scan.hit.normal,
            center_offset: scan.center_offset,
            edges,
            rotation: RotationProgress::facing(scan.hit.normal),
            snap,
            burst: BurstState::default(),
            stuck: StuckMonitor::default(),
            direction: Vec3::ZERO,
            down_enabled: true,
            climbed_up: false,
            has_moved: false,
            last_height: None,
            pull_up: None,
            turn_back: None,
        }
    }

    /// Start turning back onto the wall below a ledge.
    pub fn turning_back(turn: TurnBackState, tag: &str) -> Self {
        Self {
            phase: ClimbPhase::TurningBack,
            tag: tag.to_string(),
            body: None,
            attach_point: turn.target_position,
            wall_normal: turn.normal,
            center_offset: Vec3::ZERO,
            edges: EdgeFlags::default(),
            rotation: RotationProgress::facing(turn.normal),
            snap: SnapState::default(),
            burst: BurstState::default(),
            stuck: StuckMonitor::default(),
            direction: Vec3::ZERO,
            down_enabled: true,
            climbed_up: false,
            has_moved: false,
            last_height: None,
            pull_up: None,
            turn_back: Some(turn),
        }
    }

    /// Animation climb state: 1 when still or climbing vertically, rising
    /// toward 2 with sideways speed.
    pub fn climb_state(&self, right: Vec3, climb_speed: f32) -> f32 {
        if climb_speed <= 0.0 {
            return 1.0;
        }
        (1.0 + self.direction.dot(right).abs() / climb_speed).clamp(1.0, 2.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
