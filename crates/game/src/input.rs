//! Player input handling.
//!
//! This module converts raw input (keys, analog stick, camera) into
//! commands for the locomotion core.

use clamber_locomotion::movement::{InputButtons, LocomotionCommand};
use serde::{Deserialize, Serialize};

/// Raw player input for a single tick.
///
/// It gets converted to a [`LocomotionCommand`] for the locomotion core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Movement keys pressed.
    pub movement: MovementInput,

    /// Analog stick (horizontal, vertical), each -1 to 1. Added to the keys.
    pub stick: (f32, f32),

    /// Camera yaw in radians.
    pub camera_yaw: f32,

    /// Action buttons held.
    pub actions: ActionInput,

    /// The attack animation is still playing on the host.
    pub attack_animation_playing: bool,
}

/// Movement key states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

/// Action button states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionInput {
    pub jump: bool,
    pub attack: bool,
    pub crouch: bool,
    pub run: bool,
    /// Switch between first and third person.
    pub toggle_view: bool,
}

impl PlayerInput {
    /// Only forward held.
    pub fn forward() -> Self {
        Self {
            movement: MovementInput {
                forward: true,
                ..MovementInput::default()
            },
            ..Self::default()
        }
    }

    pub fn with_jump(mut self) -> Self {
        self.actions.jump = true;
        self
    }

    /// Convert to a locomotion command.
    pub fn to_command(&self) -> LocomotionCommand {
        let mut horizontal = self.stick.0;
        let mut vertical = self.stick.1;

        if self.movement.forward {
            vertical += 1.0;
        }
        if self.movement.backward {
            vertical -= 1.0;
        }
        if self.movement.right {
            horizontal += 1.0;
        }
        if self.movement.left {
            horizontal -= 1.0;
        }
        let horizontal = horizontal.clamp(-1.0, 1.0);
        let vertical = vertical.clamp(-1.0, 1.0);

        // Normalize diagonal movement
        let magnitude = (horizontal * horizontal + vertical * vertical).sqrt();
        let (horizontal, vertical) = if magnitude > 1.0 {
            (horizontal / magnitude, vertical / magnitude)
        } else {
            (horizontal, vertical)
        };

        let mut command = LocomotionCommand {
            horizontal,
            vertical,
            camera_yaw: self.camera_yaw,
            attack_animation_playing: self.attack_animation_playing,
            ..LocomotionCommand::default()
        };

        let buttons = [
            (self.actions.jump, InputButtons::JUMP),
            (self.actions.attack, InputButtons::ATTACK),
            (self.actions.crouch, InputButtons::CROUCH),
            (self.actions.run, InputButtons::RUN),
            (self.actions.toggle_view, InputButtons::FIRST_PERSON),
        ];
        for (held, button) in buttons {
            if held {
                command.buttons.press(button);
            }
        }

        command
    }

    /// Check if any movement input is active.
    pub fn has_movement(&self) -> bool {
        self.movement.forward
            || self.movement.backward
            || self.movement.left
            || self.movement.right
            || self.stick != (0.0, 0.0)
    }
}
