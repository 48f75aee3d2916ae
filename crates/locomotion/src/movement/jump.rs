//! Multi-stage jumping, double jumps and landings.
//!
//! Jumps form a combo: each jump started within the time limit of the
//! previous landing uses the next height in `jump_heights`. The combo timer
//! is frozen while airborne from a jump, so the limit measures time spent on
//! the ground between jumps.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::combo::{ComboTracker, PressBuffer};
use super::config::{JumpConfig, MovementConfig};
use super::ground::GroundReport;
use super::state::MovementFlags;

/// A jump that has not left the ground after this long is treated as landed.
pub const LANDING_RECOVERY_MS: u32 = 100;

/// Falling double jumps need at least this much air below the feet.
pub const DOUBLE_JUMP_GROUND_CLEARANCE: f32 = 0.5;

/// Jump combo, press buffer and landing bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JumpState {
    combo: ComboTracker,
    buffer: PressBuffer,
    /// Time since the last jump started.
    performed_ms: u32,
}

/// What the jump logic sees this frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct JumpInput {
    /// Jump went down this frame.
    pub pressed: bool,
    pub grounded: bool,
    pub sliding: bool,
    pub on_wall: bool,
    /// The body was on a wall at the end of the previous tick.
    pub on_wall_last_update: bool,
    /// Ground lies within [`DOUBLE_JUMP_GROUND_CLEARANCE`] below the feet.
    pub ground_close_below: bool,
    pub head_hit: bool,
    pub delta_ms: u32,
}

/// Result of updating jump state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JumpUpdateResult {
    /// Stage of the jump started this frame.
    pub jumped: Option<usize>,
    pub double_jumped: bool,
    pub landed: bool,
}

impl JumpState {
    pub fn new(total_jumps: usize) -> Self {
        Self {
            combo: ComboTracker::new(total_jumps),
            buffer: PressBuffer::default(),
            performed_ms: 0,
        }
    }

    /// Stage of the last jump, 0..=total.
    pub fn current(&self) -> usize {
        self.combo.current()
    }

    /// Time since the last jump (or landing) on the ground.
    pub fn combo_timer_ms(&self) -> u32 {
        self.combo.timer_ms()
    }

    pub fn is_buffered(&self) -> bool {
        self.buffer.is_pressed()
    }

    /// Make the next jump start a fresh combo.
    pub fn restart_combo(&mut self, total_jumps: usize) {
        self.combo.expire(total_jumps);
    }

    /// Full reset: no buffered press, next jump is stage one.
    pub fn reset(&mut self, total_jumps: usize) {
        self.combo.expire(total_jumps);
        self.buffer.consume();
        self.performed_ms = 0;
    }

    /// Perform the next jump stage immediately.
    ///
    /// Sets the upward speed on `move_direction` and returns the stage.
    pub fn jump(
        &mut self,
        config: &JumpConfig,
        flags: &mut MovementFlags,
        sliding: bool,
        move_direction: &mut Vec3,
    ) -> usize {
        let window = config.window();
        let restart = config.do_not_increase_jump_number_when_sliding && sliding;
        let stage = self
            .combo
            .press(&window, false, restart)
            .unwrap_or_else(|| self.combo.current());

        move_direction.y = window.strength(stage).unwrap_or(0.0);
        flags.set(MovementFlags::MID_AIR_FROM_JUMP, true);
        flags.set(MovementFlags::JUMP_PERFORMED, true);
        flags.set(MovementFlags::CROUCHING, false);
        flags.set(MovementFlags::CROUCH_QUEUED, false);
        self.buffer.consume();
        self.performed_ms = 0;

        log::debug!("jump stage {stage} at {:.1} m/s", move_direction.y);
        stage
    }

    /// Per-frame jump logic: buffered jumps, double jumps, landings and the combo timer.
    pub fn update(
        &mut self,
        config: &MovementConfig,
        input: &JumpInput,
        flags: &mut MovementFlags,
        move_direction: &mut Vec3,
    ) -> JumpUpdateResult {
        let jumping = &config.jumping;
        let mut result = JumpUpdateResult::default();

        self.buffer.tick(input.delta_ms);
        if input.pressed {
            self.buffer.press();
        }
        self.performed_ms = self.performed_ms.saturating_add(input.delta_ms);

        if input.grounded && !input.on_wall {
            flags.set(MovementFlags::DOUBLE_JUMP_READY, true);
        }

        let can_act = flags.has(MovementFlags::CAN_CROUCH_TO_ACTION);

        if self.buffer.is_pressed()
            && input.grounded
            && flags.has(MovementFlags::JUMP_POSSIBLE)
            && !flags.has(MovementFlags::JUMP_PERFORMED)
            && config.total_jumps() > 0
            && !input.on_wall
            && !input.on_wall_last_update
            && can_act
        {
            result.jumped = Some(self.jump(jumping, flags, input.sliding, move_direction));
        } else if input.pressed
            && flags.has(MovementFlags::DOUBLE_JUMP_READY)
            && !input.grounded
            && jumping.allow_double_jump
            && (jumping.double_jump_performable_if_in_mid_air_in_general
                || flags.has(MovementFlags::MID_AIR_FROM_JUMP))
            && !input.on_wall
            && !input.on_wall_last_update
            && can_act
            && (move_direction.y >= 0.0 || !input.ground_close_below)
        {
            move_direction.y = jumping.double_jump_height;
            flags.set(MovementFlags::DOUBLE_JUMP_READY, false);
            flags.set(MovementFlags::MID_AIR_FROM_JUMP, true);
            self.buffer.consume();
            self.performed_ms = 0;
            result.double_jumped = true;
            log::debug!("double jump at {:.1} m/s", move_direction.y);
        }

        if flags.has(MovementFlags::MID_AIR_FROM_JUMP)
            && input.grounded
            && result.jumped.is_none()
            && (!flags.has(MovementFlags::JUMP_PERFORMED) || self.performed_ms > LANDING_RECOVERY_MS)
        {
            flags.set(MovementFlags::MID_AIR_FROM_JUMP, false);
            flags.set(MovementFlags::JUMP_PERFORMED, false);
            result.landed = true;
            log::debug!("landed after jump stage {}", self.combo.current());
        }

        if !flags.has(MovementFlags::MID_AIR_FROM_JUMP) {
            self.combo.tick(input.delta_ms, &jumping.window());
        }

        if !input.grounded || input.head_hit {
            flags.set(MovementFlags::JUMP_PERFORMED, false);
        }

        result
    }
}

/// Whether the surface under the body permits a jump.
///
/// Walkable slopes always do; steeper ones only when the facing matches the
/// configured uphill/downhill policy or the body is wedged between faces.
pub fn slope_allows_jump(config: &MovementConfig, ground: &GroundReport) -> bool {
    let jumping = &config.jumping;
    ground.slope_angle <= config.slope_limit
        || ground.between_slidable_surfaces
        || (ground.uphill && jumping.allow_jump_when_sliding_facing_uphill)
        || (!ground.uphill && jumping.allow_jump_when_sliding_facing_downhill)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_MS: u32 = 20;

    fn grounded() -> JumpInput {
        JumpInput {
            grounded: true,
            delta_ms: FRAME_MS,
            ..JumpInput::default()
        }
    }

    fn airborne() -> JumpInput {
        JumpInput {
            grounded: false,
            delta_ms: FRAME_MS,
            ..JumpInput::default()
        }
    }

    struct Harness {
        config: MovementConfig,
        jump: JumpState,
        flags: MovementFlags,
        velocity: Vec3,
    }

    impl Harness {
        fn new() -> Self {
            let config = MovementConfig::default();
            let jump = JumpState::new(config.total_jumps());
            Self {
                config,
                jump,
                flags: MovementFlags::SPAWN,
                velocity: Vec3::ZERO,
            }
        }

        fn step(&mut self, input: JumpInput) -> JumpUpdateResult {
            self.jump.update(&self.config, &input, &mut self.flags, &mut self.velocity)
        }

        /// Jump, spend one tick in the air, land.
        fn jump_and_land(&mut self) -> Option<usize> {
            let stage = self
                .step(JumpInput {
                    pressed: true,
                    ..grounded()
                })
                .jumped;
            self.step(airborne());
            self.velocity.y = -1.0;
            let landing = self.step(grounded());
            assert!(landing.landed);
            stage
        }
    }

    #[test]
    fn test_jump_heights_cycle() {
        let mut h = Harness::new();

        let mut heights = Vec::new();
        for _ in 0..4 {
            h.jump_and_land();
            heights.push(h.jump.current());
        }
        assert_eq!(heights, vec![1, 2, 3, 1]);
    }

    #[test]
    fn test_jump_sets_upward_speed() {
        let mut h = Harness::new();
        let result = h.step(JumpInput {
            pressed: true,
            ..grounded()
        });
        assert_eq!(result.jumped, Some(1));
        assert_eq!(h.velocity.y, 6.0);
        assert!(h.flags.has(MovementFlags::MID_AIR_FROM_JUMP));
        assert!(h.flags.has(MovementFlags::JUMP_PERFORMED));
    }

    #[test]
    fn test_combo_reset_boundary() {
        let mut h = Harness::new();
        h.jump_and_land();
        // The landing tick already counted one frame
        for _ in 0..49 {
            h.step(grounded());
        }
        assert_eq!(h.jump.combo_timer_ms(), 1000);
        assert_eq!(h.jump.current(), 1);

        h.step(grounded());
        assert_eq!(h.jump.current(), 3);
        assert_eq!(h.jump_and_land(), Some(1));
    }

    #[test]
    fn test_buffered_press_jumps_on_touchdown() {
        let mut h = Harness::new();
        // Without a double jump available the press waits in the buffer
        h.flags.set(MovementFlags::DOUBLE_JUMP_READY, false);
        h.step(JumpInput {
            pressed: true,
            ..airborne()
        });
        for _ in 0..5 {
            h.step(airborne());
        }
        let result = h.step(grounded());
        assert_eq!(result.jumped, Some(1));
    }

    #[test]
    fn test_buffered_press_expires() {
        let mut h = Harness::new();
        h.flags.set(MovementFlags::DOUBLE_JUMP_READY, false);
        h.step(JumpInput {
            pressed: true,
            ..airborne()
        });
        for _ in 0..11 {
            h.step(airborne());
        }
        assert_eq!(h.step(grounded()).jumped, None);
    }

    #[test]
    fn test_double_jump_once_per_excursion() {
        let mut h = Harness::new();
        h.step(JumpInput {
            pressed: true,
            ..grounded()
        });
        h.step(airborne());

        let first = h.step(JumpInput {
            pressed: true,
            ..airborne()
        });
        assert!(first.double_jumped);
        assert_eq!(h.velocity.y, 7.0);

        let second = h.step(JumpInput {
            pressed: true,
            ..airborne()
        });
        assert!(!second.double_jumped);

        // Touching the ground restores it
        h.velocity.y = -1.0;
        h.step(grounded());
        h.step(airborne());
        let third = h.step(JumpInput {
            pressed: true,
            ..airborne()
        });
        assert!(third.double_jumped);
    }

    #[test]
    fn test_falling_double_jump_needs_clearance() {
        let mut h = Harness::new();
        h.velocity.y = -5.0;
        let blocked = h.step(JumpInput {
            pressed: true,
            ground_close_below: true,
            ..airborne()
        });
        assert!(!blocked.double_jumped);

        let allowed = h.step(JumpInput {
            pressed: true,
            ..airborne()
        });
        assert!(allowed.double_jumped);
    }

    #[test]
    fn test_no_double_jump_from_fall_when_restricted() {
        let mut h = Harness::new();
        h.config.jumping.double_jump_performable_if_in_mid_air_in_general = false;
        let result = h.step(JumpInput {
            pressed: true,
            ..airborne()
        });
        assert!(!result.double_jumped);
    }

    #[test]
    fn test_sliding_restarts_combo() {
        let mut h = Harness::new();
        h.jump_and_land();
        let result = h.step(JumpInput {
            pressed: true,
            sliding: true,
            ..grounded()
        });
        assert_eq!(result.jumped, Some(1));
    }

    #[test]
    fn test_slope_policy() {
        let config = MovementConfig::default();
        let mut ground = GroundReport {
            slope_angle: 40.0,
            uphill: true,
            ..GroundReport::default()
        };
        assert!(!slope_allows_jump(&config, &ground));
        ground.uphill = false;
        assert!(slope_allows_jump(&config, &ground));
        ground.uphill = true;
        ground.between_slidable_surfaces = true;
        assert!(slope_allows_jump(&config, &ground));
        ground.slope_angle = 10.0;
        ground.between_slidable_surfaces = false;
        assert!(slope_allows_jump(&config, &ground));
    }
}
