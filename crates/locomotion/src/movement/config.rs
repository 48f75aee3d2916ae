//! Locomotion tuning.
//!
//! Every parameter lives here, grouped in sections that mirror how a
//! designer thinks about the character. Distances are meters, speeds are
//! meters/second, angles are degrees, timers are milliseconds.
//!
//! Each section is `#[serde(default)]`, so a JSON file only needs to list
//! the values it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::terrain::ColliderShape;

use super::capability::{CapabilityId, ToggleLists};
use super::combo::ComboWindow;

/// Complete locomotion configuration for one body.
///
/// Immutable once the controller is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    // ========================================================================
    // World
    // ========================================================================
    /// Downward acceleration (meters/second²).
    pub gravity: f32,

    /// Steepest surface (degrees from horizontal) that can be stood on without sliding.
    pub slope_limit: f32,

    /// Standing collider.
    pub collider: ColliderShape,

    // ========================================================================
    // Sections
    // ========================================================================
    pub grounded: GroundedConfig,
    pub movement: MovementSpeeds,
    pub running: RunningConfig,
    pub crouching: CrouchConfig,
    pub side_scrolling: SideScrollConfig,
    pub first_person: FirstPersonConfig,
    pub jumping: JumpConfig,
    pub attacking: AttackConfig,
    pub climbing: ClimbConfig,
    pub moving_platforms: PlatformConfig,
    pub capabilities: CapabilityConfig,
}

/// Ground probe cluster dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundedConfig {
    /// How far above the probe origin ground may be and still count.
    pub max_grounded_height: f32,
    /// Radius of the outer probe ring.
    pub max_grounded_radius: f32,
    /// How far below the probe origin ground may be and still count.
    pub max_grounded_distance: f32,
}

impl Default for GroundedConfig {
    fn default() -> Self {
        Self {
            max_grounded_height: 0.2,
            max_grounded_radius: 0.2,
            max_grounded_distance: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSpeeds {
    pub forward_speed: f32,
    pub side_speed: f32,
    pub back_speed: f32,
    /// Multiplier on move speed while airborne.
    pub mid_air_movement_speed_multiple: f32,
    /// How fast the body reaches full speed.
    pub acceleration: f32,
    /// Smoothing on the applied speed. 0 applies speed immediately.
    pub movement_friction: f32,
    pub rotation_speed: f32,
    pub mid_air_rotation_speed_multiple: f32,
    pub slope_slide_speed: f32,
    /// Slide speed stops growing here.
    pub terminal_slide_speed: f32,
    /// Decay of slide momentum once off the slope. 0 drops it instantly.
    pub slide_friction: f32,
    /// Snap the feet onto the ground hit every tick while grounded.
    pub hard_stick_to_ground: bool,
}

impl Default for MovementSpeeds {
    fn default() -> Self {
        Self {
            forward_speed: 6.0,
            side_speed: 4.0,
            back_speed: 5.0,
            mid_air_movement_speed_multiple: 1.1,
            acceleration: 50.0,
            movement_friction: 0.0,
            rotation_speed: 8.0,
            mid_air_rotation_speed_multiple: 1.0,
            slope_slide_speed: 1.0,
            terminal_slide_speed: 24.0,
            slide_friction: 4.0,
            hard_stick_to_ground: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunningConfig {
    pub use_running_button: bool,
    pub run_speed_multiple: f32,
}

impl Default for RunningConfig {
    fn default() -> Self {
        Self {
            use_running_button: false,
            run_speed_multiple: 1.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrouchConfig {
    pub allow_crouching: bool,
    pub crouch_movement_speed_multiple: f32,
    /// Collider height while crouched, as a fraction of standing height.
    pub crouch_collider_height_multiple: f32,
}

impl Default for CrouchConfig {
    fn default() -> Self {
        Self {
            allow_crouching: true,
            crouch_movement_speed_multiple: 0.4,
            crouch_collider_height_multiple: 0.7,
        }
    }
}

/// 2.5D movement: lock one horizontal axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideScrollConfig {
    pub movement_speed_if_axis_locked: f32,
    pub lock_movement_on_z_axis: bool,
    pub z_value: f32,
    pub lock_movement_on_x_axis: bool,
    pub x_value: f32,
    /// Add 180° to the facing on the free axis.
    pub flip_axis_rotation: bool,
    /// Turn through the camera-facing side when reversing.
    pub rotate_inwards: bool,
}

impl Default for SideScrollConfig {
    fn default() -> Self {
        Self {
            movement_speed_if_axis_locked: 6.0,
            lock_movement_on_z_axis: false,
            z_value: 0.0,
            lock_movement_on_x_axis: false,
            x_value: 0.0,
            flip_axis_rotation: false,
            rotate_inwards: true,
        }
    }
}

impl SideScrollConfig {
    pub fn axis_locked(&self) -> bool {
        self.lock_movement_on_x_axis || self.lock_movement_on_z_axis
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirstPersonConfig {
    pub always_use_first_person: bool,
    pub switch_to_first_person_if_input_button_pressed: bool,
    pub start_off_in_first_person_mode_for_switching: bool,
    /// Walk backwards on down input instead of turning around.
    pub walk_backwards_when_down_key_is_pressed: bool,
    /// Facing follows the camera only, never the movement input.
    pub only_rotate_with_camera: bool,
}

impl Default for FirstPersonConfig {
    fn default() -> Self {
        Self {
            always_use_first_person: false,
            switch_to_first_person_if_input_button_pressed: false,
            start_off_in_first_person_mode_for_switching: false,
            walk_backwards_when_down_key_is_pressed: true,
            only_rotate_with_camera: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpConfig {
    /// One entry per jump stage: the upward speed of that jump.
    pub jump_heights: Vec<f32>,
    /// Time on the ground after which the jump combo restarts. 0 disables expiry.
    pub time_limit_between_jumps_ms: u32,
    pub allow_jump_when_sliding_facing_uphill: bool,
    pub allow_jump_when_sliding_facing_downhill: bool,
    /// While sliding, every jump is the first stage.
    pub do_not_increase_jump_number_when_sliding: bool,
    pub landing_effect: bool,
    pub allow_double_jump: bool,
    pub double_jump_performable_out_of_wall_jump: bool,
    /// Double jump after walking off a ledge, not only after jumping.
    pub double_jump_performable_if_in_mid_air_in_general: bool,
    pub double_jump_height: f32,
    pub double_jump_effect: bool,
    pub max_falling_speed: f32,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            jump_heights: vec![6.0, 8.0, 12.0],
            time_limit_between_jumps_ms: 1000,
            allow_jump_when_sliding_facing_uphill: false,
            allow_jump_when_sliding_facing_downhill: true,
            do_not_increase_jump_number_when_sliding: true,
            landing_effect: true,
            allow_double_jump: true,
            double_jump_performable_out_of_wall_jump: true,
            double_jump_performable_if_in_mid_air_in_general: true,
            double_jump_height: 7.0,
            double_jump_effect: true,
            max_falling_speed: 90.0,
        }
    }
}

impl JumpConfig {
    /// The jump heights as a combo: each stage is one jump.
    pub fn window(&self) -> ComboWindow {
        ComboWindow {
            strengths: self.jump_heights.clone(),
            time_limit_ms: self.time_limit_between_jumps_ms,
            remember_presses: false,
            wait_ms: 0,
            wait_for_animation: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackConfig {
    pub ground: ComboWindow,
    pub air: AirAttackConfig,
    pub crouch: CrouchAttackConfig,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            ground: ComboWindow {
                strengths: vec![1.0, 1.0, 2.0],
                ..ComboWindow::default()
            },
            air: AirAttackConfig::default(),
            crouch: CrouchAttackConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirAttackConfig {
    pub window: ComboWindow,
    pub only_allow_attack_once_in_mid_air: bool,
}

impl Default for AirAttackConfig {
    fn default() -> Self {
        Self {
            window: ComboWindow {
                strengths: vec![1.0],
                ..ComboWindow::default()
            },
            only_allow_attack_once_in_mid_air: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrouchAttackConfig {
    pub allow_crouch_attack: bool,
    pub crouch_attack_strength: f32,
    pub time_limit_between_crouch_attacks_ms: u32,
}

impl Default for CrouchAttackConfig {
    fn default() -> Self {
        Self {
            allow_crouch_attack: true,
            crouch_attack_strength: 1.0,
            time_limit_between_crouch_attacks_ms: 500,
        }
    }
}

impl CrouchAttackConfig {
    /// The crouch attack as a single-stage combo.
    pub fn window(&self) -> ComboWindow {
        ComboWindow {
            strengths: vec![self.crouch_attack_strength],
            time_limit_ms: self.time_limit_between_crouch_attacks_ms,
            remember_presses: false,
            wait_ms: self.time_limit_between_crouch_attacks_ms,
            wait_for_animation: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimbConfig {
    /// Tag marking climbable terrain.
    pub climbable_tag: String,
    pub climb_vertically: bool,
    pub climb_horizontally: bool,
    pub climb_movement_speed: f32,
    pub climb_rotation_speed: f32,
    /// Pull toward the middle of the climbable object after grabbing on.
    pub snap_to_center_of_object: bool,
    pub move_in_bursts: bool,
    /// Length of one burst cycle (seconds).
    pub burst_length: f32,
    /// Never pitch or roll with the wall.
    pub stay_upright: bool,
    pub distance_to_push_off_after_letting_go: f32,
    pub rotation_to_climbable_object_speed: f32,
    pub surface_detectors_up_amount: f32,
    pub surface_detectors_height: f32,
    pub surface_detectors_length: f32,
    pub top_no_surface_detector_height: f32,
    pub bottom_no_surface_detector_height: f32,
    pub side_no_surface_detectors_height: f32,
    pub side_no_surface_detectors_width: f32,
    pub stop_at_sides: bool,
    pub drop_off_at_bottom: bool,
    pub drop_off_at_floor: bool,
    pub pull_up_at_top: bool,
    pub pull_up_speed: f32,
    pub pull_up_location_forward: f32,
    pub walking_off_ledge: WalkOffLedgeConfig,
    /// Push away from the wall when the body stops making progress.
    pub push_against_wall_if_player_is_stuck: bool,
}

impl Default for ClimbConfig {
    fn default() -> Self {
        Self {
            climbable_tag: "Ladder".to_string(),
            climb_vertically: true,
            climb_horizontally: false,
            climb_movement_speed: 4.0,
            climb_rotation_speed: 10.0,
            snap_to_center_of_object: true,
            move_in_bursts: true,
            burst_length: 1.0,
            stay_upright: false,
            distance_to_push_off_after_letting_go: 0.5,
            rotation_to_climbable_object_speed: 6.0,
            surface_detectors_up_amount: 0.0,
            surface_detectors_height: 0.0,
            surface_detectors_length: 0.0,
            top_no_surface_detector_height: 0.0,
            bottom_no_surface_detector_height: 0.0,
            side_no_surface_detectors_height: 0.0,
            side_no_surface_detectors_width: 0.0,
            stop_at_sides: true,
            drop_off_at_bottom: false,
            drop_off_at_floor: true,
            pull_up_at_top: true,
            pull_up_speed: 4.0,
            pull_up_location_forward: 0.0,
            walking_off_ledge: WalkOffLedgeConfig::default(),
            push_against_wall_if_player_is_stuck: true,
        }
    }
}

/// Grabbing a climbable surface below a ledge the body walks off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkOffLedgeConfig {
    pub allow_grabbing_on_after_walking_off_ledge: bool,
    pub space_in_front_needed_to_grab_back_on: f32,
    pub grab_back_on_location_height: f32,
    pub grab_back_on_location_forward: f32,
}

impl Default for WalkOffLedgeConfig {
    fn default() -> Self {
        Self {
            allow_grabbing_on_after_walking_off_ledge: true,
            space_in_front_needed_to_grab_back_on: 0.0,
            grab_back_on_location_height: 0.0,
            grab_back_on_location_forward: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub allow_moving_platform_support: bool,
    pub moving_platform_tag: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            allow_moving_platform_support: true,
            moving_platform_tag: "Platform".to_string(),
        }
    }
}

/// External capabilities toggled while on a wall or in water.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    pub on_wall: ToggleLists,
    pub in_water: ToggleLists,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            on_wall: ToggleLists {
                enable: Vec::new(),
                disable: vec![CapabilityId::LEDGE_CLIMB],
            },
            in_water: ToggleLists::default(),
        }
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            gravity: 20.0,
            slope_limit: 25.0,
            collider: ColliderShape::CHARACTER,
            grounded: GroundedConfig::default(),
            movement: MovementSpeeds::default(),
            running: RunningConfig::default(),
            crouching: CrouchConfig::default(),
            side_scrolling: SideScrollConfig::default(),
            first_person: FirstPersonConfig::default(),
            jumping: JumpConfig::default(),
            attacking: AttackConfig::default(),
            climbing: ClimbConfig::default(),
            moving_platforms: PlatformConfig::default(),
            capabilities: CapabilityConfig::default(),
        }
    }
}

impl MovementConfig {
    /// 2.5D tuning: movement locked to the X axis at depth `z`.
    pub fn side_scroller(z: f32) -> Self {
        Self {
            side_scrolling: SideScrollConfig {
                lock_movement_on_z_axis: true,
                z_value: z,
                ..SideScrollConfig::default()
            },
            climbing: ClimbConfig {
                climb_horizontally: false,
                ..ClimbConfig::default()
            },
            ..Self::default()
        }
    }

    /// Always first person, facing follows the camera.
    pub fn first_person() -> Self {
        Self {
            first_person: FirstPersonConfig {
                always_use_first_person: true,
                ..FirstPersonConfig::default()
            },
            ..Self::default()
        }
    }

    /// Parse a (possibly partial) JSON config and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject values the simulation cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gravity <= 0.0 {
            return Err(ConfigError::invalid("gravity", "must be positive"));
        }
        if !(self.slope_limit > 0.0 && self.slope_limit < 90.0) {
            return Err(ConfigError::invalid("slope_limit", "must be between 0 and 90 degrees"));
        }
        if self.collider.height() <= 0.0 || self.collider.radius() <= 0.0 {
            return Err(ConfigError::invalid("collider", "must have positive size"));
        }
        let speeds = [
            ("movement.forward_speed", self.movement.forward_speed),
            ("movement.side_speed", self.movement.side_speed),
            ("movement.back_speed", self.movement.back_speed),
            ("movement.acceleration", self.movement.acceleration),
            ("movement.movement_friction", self.movement.movement_friction),
            ("movement.slide_friction", self.movement.slide_friction),
            ("movement.terminal_slide_speed", self.movement.terminal_slide_speed),
            ("climbing.climb_movement_speed", self.climbing.climb_movement_speed),
            ("jumping.max_falling_speed", self.jumping.max_falling_speed),
        ];
        for (field, value) in speeds {
            if value < 0.0 {
                return Err(ConfigError::invalid(field, format!("{value} is negative")));
            }
        }
        let crouch = self.crouching.crouch_collider_height_multiple;
        if !(crouch > 0.0 && crouch <= 1.0) {
            return Err(ConfigError::invalid(
                "crouching.crouch_collider_height_multiple",
                "must be in (0, 1]",
            ));
        }
        if self.climbing.climbable_tag.is_empty() {
            return Err(ConfigError::invalid("climbing.climbable_tag", "must not be empty"));
        }
        if self.climbing.move_in_bursts && self.climbing.burst_length <= 0.0 {
            return Err(ConfigError::invalid("climbing.burst_length", "must be positive"));
        }
        Ok(())
    }

    /// Number of jump stages.
    pub fn total_jumps(&self) -> usize {
        self.jumping.jump_heights.len()
    }

    /// Collider for the given crouch state.
    pub fn collider_for(&self, crouching: bool) -> ColliderShape {
        if crouching {
            self.collider
                .with_height_scale(self.crouching.crouch_collider_height_multiple)
        } else {
            self.collider
        }
    }

    pub fn is_climbable(&self, tag: &str) -> bool {
        tag == self.climbing.climbable_tag
    }

    pub fn is_platform(&self, tag: &str) -> bool {
        self.moving_platforms.allow_moving_platform_support
            && tag == self.moving_platforms.moving_platform_tag
    }
}

// ============================================================================
// Tests
// ============================================================================
