//! Character movement.
//!
//! This module implements kinematic platformer movement with:
//!
//! - Ground classification from a cluster of downward probes
//! - Camera-relative acceleration, rotation and friction
//! - Slope sliding above the slope limit
//! - Multi-stage jump combos, double jumps and landings
//! - Crouching with headroom checks
//! - Ground, air and crouch attack combos
//! - Riding moving platforms
//! - Capability toggles while on a wall or in water
//!
//! # Design
//!
//! Movement is driven by the [`LocomotionController`], which takes a
//! [`LocomotionCommand`] per tick and updates the body's [`MovementState`]
//! against any [`TerrainQuery`](crate::terrain::TerrainQuery). Climbing lives
//! in [`crate::climb`] and is invoked from the controller's frame step.
//!
//! Timers count whole milliseconds and all state is plain data, so the same
//! inputs always produce the same outputs and a state can be snapshotted and
//! restored at any tick.

mod attack;
mod capability;
mod combo;
mod config;
mod controller;
mod crouch;
mod ground;
mod input;
mod jump;
mod platform;
mod signals;
mod slide_move;
mod state;

pub use attack::{AttackContext, AttackEvent, AttackInput, AttackState};
pub use capability::{
    Capability, CapabilityId, CapabilityRegistry, CapabilityWarning, ContextToggles, ToggleContext, ToggleLists,
};
pub use combo::{ComboTracker, ComboWindow, PressBuffer, PRESS_BUFFER_MS};
pub use config::{
    AirAttackConfig, AttackConfig, CapabilityConfig, ClimbConfig, CrouchAttackConfig, CrouchConfig,
    FirstPersonConfig, GroundedConfig, JumpConfig, MovementConfig, MovementSpeeds, PlatformConfig, RunningConfig,
    SideScrollConfig, WalkOffLedgeConfig,
};
pub use controller::{LocomotionContext, LocomotionController, StepReport};
pub use crouch::{has_headroom, update_crouch, CrouchInput};
pub use ground::{flat, GroundProbe, GroundReport, PROBE_LIFT};
pub use input::{ButtonEdges, InputButtons, LocomotionCommand, AXIS_DEADZONE};
pub use jump::{
    slope_allows_jump, JumpInput, JumpState, JumpUpdateResult, DOUBLE_JUMP_GROUND_CLEARANCE, LANDING_RECOVERY_MS,
};
pub use platform::{Connector, PlatformAttachment, PlatformRegistry, RideEvent, DETACH_GRACE_TICKS};
pub use signals::{AnimationSink, Effect, NullSink, Signal, SignalFrame};
pub use slide_move::{clip_velocity, slide_move, SlideMoveResult};
pub use state::{Contact, LocomotionMode, MovementFlags, MovementState, PushOff, SlideState, SpeedState};
