//! Per-tick input.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Inputs below this magnitude count as released.
pub const AXIS_DEADZONE: f32 = 0.001;

/// Button state flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputButtons(pub u16);

impl InputButtons {
    pub const JUMP: u16 = 1 << 0;
    pub const ATTACK: u16 = 1 << 1;
    pub const CROUCH: u16 = 1 << 2;
    pub const RUN: u16 = 1 << 3;
    /// Toggle between first and third person.
    pub const FIRST_PERSON: u16 = 1 << 4;

    #[inline]
    pub fn pressed(self, button: u16) -> bool {
        (self.0 & button) != 0
    }

    #[inline]
    pub fn press(&mut self, button: u16) {
        self.0 |= button;
    }

    #[inline]
    pub fn release(&mut self, button: u16) {
        self.0 &= !button;
    }

    /// Held now but not on the previous tick.
    #[inline]
    pub fn just_pressed(self, previous: Self, button: u16) -> bool {
        self.pressed(button) && !previous.pressed(button)
    }
}

/// Everything the host tells the core about one tick of input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocomotionCommand {
    /// Left/right (-1 to 1). Positive is right.
    pub horizontal: f32,
    /// Back/forward (-1 to 1). Positive is forward (or up on a wall).
    pub vertical: f32,
    /// Camera yaw in radians. Movement input is relative to it.
    pub camera_yaw: f32,
    pub buttons: InputButtons,
    /// The host's attack animation is still playing.
    pub attack_animation_playing: bool,
}

impl LocomotionCommand {
    /// Stick input with no buttons.
    pub fn stick(horizontal: f32, vertical: f32) -> Self {
        Self {
            horizontal,
            vertical,
            ..Self::default()
        }
    }

    pub fn with_button(mut self, button: u16) -> Self {
        self.buttons.press(button);
        self
    }

    #[inline]
    pub fn has_movement_input(&self) -> bool {
        self.horizontal.abs() > AXIS_DEADZONE || self.vertical.abs() > AXIS_DEADZONE
    }

    /// Length of the stick vector, capped at 1.
    pub fn magnitude(&self) -> f32 {
        Vec3::new(self.horizontal, 0.0, self.vertical).length().min(1.0)
    }

    /// World-space unit direction of the stick input, zero without input.
    pub fn world_direction(&self) -> Vec3 {
        if !self.has_movement_input() {
            return Vec3::ZERO;
        }
        let local = Vec3::new(self.horizontal, 0.0, self.vertical).normalize_or_zero();
        Quat::from_rotation_y(self.camera_yaw) * local
    }

    #[inline]
    pub fn wants_jump(&self) -> bool {
        self.buttons.pressed(InputButtons::JUMP)
    }

    #[inline]
    pub fn wants_attack(&self) -> bool {
        self.buttons.pressed(InputButtons::ATTACK)
    }

    #[inline]
    pub fn wants_run(&self) -> bool {
        self.buttons.pressed(InputButtons::RUN)
    }
}

/// Buttons that went down this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonEdges(InputButtons);

impl ButtonEdges {
    pub fn between(current: InputButtons, previous: InputButtons) -> Self {
        Self(InputButtons(current.0 & !previous.0))
    }

    #[inline]
    pub fn pressed(self, button: u16) -> bool {
        self.0.pressed(button)
    }
}

// ============================================================================
// Tests
// ============================================================================
