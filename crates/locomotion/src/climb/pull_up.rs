//! Climbing over the top edge.
//!
//! Two kinematic phases: rise straight up to just above the ledge, then
//! move forward onto it. Each phase ends when the body is within
//! [`ARRIVE_DISTANCE`] of its target or after `|pull_up_speed / 4|` seconds.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::movement::ClimbConfig;
use crate::terrain::{QueryFilter, TerrainQuery};

use super::rotation::upright;

/// A phase is complete this close to its target.
pub const ARRIVE_DISTANCE: f32 = 0.2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PullUpPhase {
    /// Rising to ledge height.
    #[default]
    Rise,
    /// Moving onto the ledge.
    Forward,
}

/// An in-progress pull-up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PullUpState {
    /// Top of the ledge being climbed onto.
    pub ledge: Vec3,
    pub phase: PullUpPhase,
    pub elapsed_ms: u32,
}

impl PullUpState {
    pub fn new(ledge: Vec3) -> Self {
        Self {
            ledge,
            phase: PullUpPhase::Rise,
            elapsed_ms: 0,
        }
    }

    fn timed_out(&self, config: &ClimbConfig) -> bool {
        let limit_ms = (config.pull_up_speed / 4.0).abs() * 1000.0;
        self.elapsed_ms as f32 > limit_ms
    }

    /// Advance one tick. Returns true once the body is on the ledge.
    pub fn step(
        &mut self,
        config: &ClimbConfig,
        position: &mut Vec3,
        rotation: &mut Quat,
        dt: f32,
        delta_ms: u32,
    ) -> bool {
        self.elapsed_ms = self.elapsed_ms.saturating_add(delta_ms);
        let step = config.pull_up_speed.abs() * dt;

        match self.phase {
            PullUpPhase::Rise => {
                let target = Vec3::new(position.x, self.ledge.y + 0.1, position.z);
                *position = move_toward(*position, target, step);
                if position.distance(target) <= ARRIVE_DISTANCE || self.timed_out(config) {
                    log::debug!("pull-up: over the ledge at {:.2}", position.y);
                    self.phase = PullUpPhase::Forward;
                    self.elapsed_ms = 0;
                }
                false
            }
            PullUpPhase::Forward => {
                *rotation = upright(*rotation);
                let target = self.ledge + (*rotation * Vec3::Z) / 10.0;
                *position = move_toward(*position, target, step);
                if position.distance(target) <= ARRIVE_DISTANCE {
                    *position = target;
                    return true;
                }
                self.timed_out(config)
            }
        }
    }
}

/// Top of the ledge in front of a climbing body, if there is one.
pub fn find_ledge<T: TerrainQuery + ?Sized>(
    terrain: &T,
    filter: &QueryFilter,
    config: &ClimbConfig,
    position: Vec3,
    rotation: Quat,
) -> Option<Vec3> {
    let up = rotation * Vec3::Y;
    let forward = rotation * Vec3::Z;
    let reach = forward * config.pull_up_location_forward;
    let start = position + up * 2.5 + forward / 1.25 + reach;
    let end = position + up * 0.8 + forward / 1.75 + reach;
    terrain.probe(start, end, filter).map(|hit| hit.point)
}

fn move_toward(from: Vec3, to: Vec3, max_step: f32) -> Vec3 {
    let delta = to - from;
    let distance = delta.length();
    if distance <= max_step || distance <= f32::EPSILON {
        to
    } else {
        from + delta / distance * max_step
    }
}

// ============================================================================
// Tests
// ============================================================================
